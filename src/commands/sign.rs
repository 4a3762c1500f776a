use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::builder::ValueParser;
use tracing::debug;

use crate::config::{
    BackendConfig, Expiration, SignConfig, DEFAULT_KEY_VALIDITY, DEFAULT_RRSIG_VALIDITY,
};
use crate::context::sign_zone_file;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::keys::SignAlgorithm;
use crate::parse::{parse_date, parse_name, Span};
use crate::record::Name;
use crate::util;

#[derive(Clone, Debug, clap::Args)]
#[clap(after_help = "Dates are given as YYYYMMDD and taken as midnight UTC. Durations are \
written like '1 year 6 months', '90d' or '2w 3d'. A duration takes precedence over a date \
for the same expiration.")]
pub struct Sign {
    /// The zone file to sign
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    file: Option<PathBuf>,

    /// The name of the zone
    #[arg(
        short = 'z',
        long = "zone",
        value_name = "NAME",
        value_parser = ValueParser::new(parse_name)
    )]
    zone: Option<Name>,

    /// Where to write the signed zone [default: <name>-signed<.ext>]
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Create new keys, replacing the current ones
    #[arg(short = 'c', long = "create-keys")]
    create_keys: bool,

    /// The signing algorithm: rsa, ecdsa or ed25519
    #[arg(
        short = 'a',
        long = "sign-algorithm",
        value_name = "ALGORITHM",
        default_value = "ecdsa"
    )]
    algorithm: String,

    /// Use NSEC3 instead of NSEC
    #[arg(short = '3', long = "nsec3")]
    nsec3: bool,

    /// Leave unsigned delegations out of the NSEC3 chain
    #[arg(short = 'x', long = "opt-out")]
    opt_out: bool,

    /// Add a ZONEMD digest of the zone
    #[arg(short = 'd', long = "digest")]
    digest: bool,

    /// Add a TXT record describing how the zone was signed
    #[arg(short = 'i', long = "info")]
    info: bool,

    /// The number of NSEC3 hash iterations
    #[arg(
        help_heading = Some("NSEC3 (when using '--nsec3')"),
        long = "nsec3-iterations",
        value_name = "NUMBER",
        default_value_t = 0
    )]
    nsec3_iterations: u16,

    /// The length of the random NSEC3 salt in octets
    #[arg(
        help_heading = Some("NSEC3 (when using '--nsec3')"),
        long = "nsec3-salt-length",
        value_name = "OCTETS",
        default_value_t = 8
    )]
    nsec3_salt_length: u8,

    /// Keep the SOA serial as it is
    #[arg(long = "no-serial-update")]
    no_serial_update: bool,

    /// Expiration date of new zone signing keys
    #[arg(
        help_heading = Some("Expiration"),
        long = "zsk-expiration-date",
        value_name = "YYYYMMDD",
        value_parser = ValueParser::new(parse_date)
    )]
    zsk_expiration_date: Option<DateTime<Utc>>,

    /// Expiration date of new key signing keys
    #[arg(
        help_heading = Some("Expiration"),
        long = "ksk-expiration-date",
        value_name = "YYYYMMDD",
        value_parser = ValueParser::new(parse_date)
    )]
    ksk_expiration_date: Option<DateTime<Utc>>,

    /// Expiration date of the signatures
    #[arg(
        help_heading = Some("Expiration"),
        long = "rrsig-expiration-date",
        value_name = "YYYYMMDD",
        value_parser = ValueParser::new(parse_date)
    )]
    rrsig_expiration_date: Option<DateTime<Utc>>,

    /// Validity of new zone signing keys [default: 1 year]
    #[arg(
        help_heading = Some("Expiration"),
        long = "zsk-duration",
        value_name = "DURATION",
        value_parser = ValueParser::new(Span::from_str)
    )]
    zsk_duration: Option<Span>,

    /// Validity of new key signing keys [default: 1 year]
    #[arg(
        help_heading = Some("Expiration"),
        long = "ksk-duration",
        value_name = "DURATION",
        value_parser = ValueParser::new(Span::from_str)
    )]
    ksk_duration: Option<Span>,

    /// Validity of the signatures [default: 3 months]
    #[arg(
        help_heading = Some("Expiration"),
        long = "rrsig-duration",
        value_name = "DURATION",
        value_parser = ValueParser::new(Span::from_str)
    )]
    rrsig_duration: Option<Span>,

    /// Where the keys are kept [default: file]
    #[command(subcommand)]
    backend: Option<Backend>,
}

#[derive(Clone, Debug, clap::Subcommand)]
pub enum Backend {
    /// Keys in PKCS#8 PEM files
    File {
        /// The zone signing key file
        #[arg(long = "zsk-keyfile", value_name = "PATH", default_value = "zsk.pem")]
        zsk_keyfile: PathBuf,

        /// The key signing key file
        #[arg(long = "ksk-keyfile", value_name = "PATH", default_value = "ksk.pem")]
        ksk_keyfile: PathBuf,
    },

    /// Keys in a PKCS#11 module, such as an HSM
    Pkcs11 {
        /// The PKCS#11 module to load
        #[arg(long = "p11lib", value_name = "PATH")]
        p11lib: PathBuf,

        /// The user PIN
        #[arg(long = "user-key", value_name = "PIN", default_value = "1234")]
        user_key: String,

        /// The label of the keys on the token
        #[arg(long = "key-label", value_name = "LABEL", default_value = "dnssign")]
        key_label: String,
    },
}

impl Backend {
    fn config(&self) -> BackendConfig {
        match self {
            Backend::File {
                zsk_keyfile,
                ksk_keyfile,
            } => BackendConfig::File {
                zsk_path: zsk_keyfile.clone(),
                ksk_path: ksk_keyfile.clone(),
            },
            Backend::Pkcs11 {
                p11lib,
                user_key,
                key_label,
            } => BackendConfig::Pkcs11 {
                module_path: p11lib.clone(),
                user_pin: user_key.clone(),
                key_label: key_label.clone(),
            },
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Backend::File {
            zsk_keyfile: "zsk.pem".into(),
            ksk_keyfile: "ksk.pem".into(),
        }
    }
}

impl Sign {
    pub fn execute(self, env: impl Env) -> Result<()> {
        let config = self.config(&env)?;
        debug!("{config:?}");
        sign_zone_file(&env, &config)
    }

    /// Build the configuration of the signing run.
    ///
    /// All expirations are resolved against the invocation time of `env`.
    pub fn config(&self, env: &impl Env) -> Result<SignConfig> {
        let zone = self
            .zone
            .clone()
            .ok_or_else(|| Error::config("no zone name given, use '--zone'"))?;
        let file_path = self
            .file
            .clone()
            .ok_or_else(|| Error::config("no zone file given, use '--file'"))?;
        let output_path = self
            .output
            .clone()
            .unwrap_or_else(|| util::signed_path(&file_path));

        let now = env.now();
        let resolve = |duration, date, default| {
            Expiration { duration, date }.resolve(now, default)
        };

        let config = SignConfig {
            zone,
            file_path,
            output_path,
            create_keys: self.create_keys,
            nsec3: self.nsec3,
            opt_out: self.opt_out,
            nsec3_iterations: self.nsec3_iterations,
            nsec3_salt_length: self.nsec3_salt_length,
            digest: self.digest,
            info: self.info,
            update_serial: !self.no_serial_update,
            algorithm: SignAlgorithm::from_str(&self.algorithm)?,
            inception: now,
            zsk_expiration: resolve(
                self.zsk_duration,
                self.zsk_expiration_date,
                DEFAULT_KEY_VALIDITY,
            )?,
            ksk_expiration: resolve(
                self.ksk_duration,
                self.ksk_expiration_date,
                DEFAULT_KEY_VALIDITY,
            )?,
            rrsig_expiration: resolve(
                self.rrsig_duration,
                self.rrsig_expiration_date,
                DEFAULT_RRSIG_VALIDITY,
            )?,
            backend: self.backend.clone().unwrap_or_default().config(),
        };
        config.validate()?;
        Ok(config)
    }
}

//============ Tests =========================================================
