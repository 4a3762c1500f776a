//! The configuration of a signing run.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::chain::{Denial, Nsec3Config};
use crate::error::{Error, Result};
use crate::keys::SignAlgorithm;
use crate::parse::Span;
use crate::record::Name;

/// How long keys are valid unless configured otherwise.
pub const DEFAULT_KEY_VALIDITY: Span = Span::months(12);

/// How long signatures are valid unless configured otherwise.
pub const DEFAULT_RRSIG_VALIDITY: Span = Span::months(3);

//------------ Expiration ----------------------------------------------------

/// A configured expiration, given relative, absolute or not at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Expiration {
    pub duration: Option<Span>,
    pub date: Option<DateTime<Utc>>,
}

impl Expiration {
    /// The expiration instant.
    ///
    /// A duration takes precedence over a date. Without either, `default`
    /// counted from `now` applies.
    pub fn resolve(&self, now: DateTime<Utc>, default: Span) -> Result<DateTime<Utc>> {
        let span = match (self.duration, self.date) {
            (Some(duration), _) => duration,
            (None, Some(date)) => return Ok(date),
            (None, None) => default,
        };
        span.after(now)
            .ok_or_else(|| Error::config("expiration lies too far in the future"))
    }
}

//------------ BackendConfig -------------------------------------------------

/// Where the keys live.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendConfig {
    File {
        zsk_path: PathBuf,
        ksk_path: PathBuf,
    },
    Pkcs11 {
        module_path: PathBuf,
        user_pin: String,
        key_label: String,
    },
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::File { .. } => "file",
            BackendConfig::Pkcs11 { .. } => "pkcs11",
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendConfig::File { zsk_path, ksk_path } => f
                .debug_struct("File")
                .field("zsk_path", zsk_path)
                .field("ksk_path", ksk_path)
                .finish(),
            BackendConfig::Pkcs11 {
                module_path,
                key_label,
                ..
            } => f
                .debug_struct("Pkcs11")
                .field("module_path", module_path)
                .field("user_pin", &"<redacted>")
                .field("key_label", key_label)
                .finish(),
        }
    }
}

//------------ SignConfig ----------------------------------------------------

/// Everything a signing run needs to know, fixed before it starts.
#[derive(Clone, Debug)]
pub struct SignConfig {
    pub zone: Name,
    pub file_path: PathBuf,
    pub output_path: PathBuf,
    pub create_keys: bool,
    pub nsec3: bool,
    pub opt_out: bool,
    pub nsec3_iterations: u16,
    pub nsec3_salt_length: u8,
    pub digest: bool,
    pub info: bool,
    pub update_serial: bool,
    pub algorithm: SignAlgorithm,

    /// The invocation time, used as signature inception.
    pub inception: DateTime<Utc>,
    pub zsk_expiration: DateTime<Utc>,
    pub ksk_expiration: DateTime<Utc>,
    pub rrsig_expiration: DateTime<Utc>,

    pub backend: BackendConfig,
}

impl SignConfig {
    /// The denial of existence to generate.
    pub fn denial(&self) -> Denial {
        if self.nsec3 {
            Denial::Nsec3(Nsec3Config {
                iterations: self.nsec3_iterations,
                salt_length: self.nsec3_salt_length,
                opt_out: self.opt_out,
            })
        } else {
            Denial::Nsec
        }
    }

    /// Check the combinations of options.
    pub fn validate(&self) -> Result<()> {
        crate::ensure!(
            self.nsec3 || !self.opt_out,
            Config,
            "opt-out requires NSEC3"
        );
        for (what, expiration) in [
            ("ZSK", self.zsk_expiration),
            ("KSK", self.ksk_expiration),
            ("RRSIG", self.rrsig_expiration),
        ] {
            crate::ensure!(
                expiration > self.inception,
                Config,
                "{what} expiration {expiration} is not in the future"
            );
            crate::ensure!(
                u32::try_from(expiration.timestamp()).is_ok(),
                Config,
                "{what} expiration {expiration} cannot be expressed in a signature"
            );
        }
        for (what, expiration) in [("ZSK", self.zsk_expiration), ("KSK", self.ksk_expiration)] {
            crate::ensure!(
                self.rrsig_expiration <= expiration,
                Config,
                "RRSIG expiration {} is later than the {what} expiration {expiration}",
                self.rrsig_expiration
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::error::ErrorKind;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn duration_beats_date_beats_default() {
        let date = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let duration: Span = "10 days".parse().unwrap();

        let both = Expiration {
            duration: Some(duration),
            date: Some(date),
        };
        assert_eq!(
            both.resolve(now(), DEFAULT_RRSIG_VALIDITY).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 0).unwrap()
        );

        let only_date = Expiration {
            duration: None,
            date: Some(date),
        };
        assert_eq!(only_date.resolve(now(), DEFAULT_RRSIG_VALIDITY).unwrap(), date);

        let neither = Expiration::default();
        assert_eq!(
            neither.resolve(now(), DEFAULT_RRSIG_VALIDITY).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(
            neither.resolve(now(), DEFAULT_KEY_VALIDITY).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
        );
    }

    fn sign_config() -> SignConfig {
        SignConfig {
            zone: "example.com.".parse().unwrap(),
            file_path: "example.com.zone".into(),
            output_path: "example.com-signed.zone".into(),
            create_keys: false,
            nsec3: false,
            opt_out: false,
            nsec3_iterations: 0,
            nsec3_salt_length: 8,
            digest: false,
            info: false,
            update_serial: true,
            algorithm: SignAlgorithm::EcdsaP256Sha256,
            inception: now(),
            zsk_expiration: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            ksk_expiration: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            rrsig_expiration: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            backend: BackendConfig::File {
                zsk_path: "zsk.pem".into(),
                ksk_path: "ksk.pem".into(),
            },
        }
    }

    #[test]
    fn signatures_must_not_outlive_keys() {
        let config = sign_config();
        assert!(config.validate().is_ok());

        let mut config = sign_config();
        config.rrsig_expiration = config.ksk_expiration;
        assert!(config.validate().is_ok());

        let mut config = sign_config();
        config.zsk_expiration = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("later than the ZSK expiration"), "{err}");

        let mut config = sign_config();
        config.ksk_expiration = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("later than the KSK expiration"), "{err}");
    }

    #[test]
    fn pin_is_redacted() {
        let backend = BackendConfig::Pkcs11 {
            module_path: "/usr/lib/softhsm/libsofthsm2.so".into(),
            user_pin: "s3cr3t".into(),
            key_label: "dnssign".into(),
        };
        let debug = format!("{backend:?}");
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("<redacted>"));
    }
}
