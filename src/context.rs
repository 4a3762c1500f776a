//! Running one signing job from start to finish.

use std::fs::File;
use std::io::BufWriter;

use tracing::{debug, info, warn};

use crate::chain::{add_chain, Denial};
use crate::config::SignConfig;
use crate::env::Env;
use crate::error::{Context as _, Result};
use crate::keys::{open_session, KeySession, SigningKey};
use crate::record::OrderedZone;
use crate::signer::{self, Signer};
use crate::util;
use crate::zonefile::{ParsedZone, ZoneReader};

//------------ SigningContext ------------------------------------------------

/// Everything a signing run works with.
///
/// The key session is ended when the context is finished or dropped,
/// whichever comes first.
pub struct SigningContext<'a, E: Env> {
    env: E,
    config: &'a SignConfig,
    zone: OrderedZone,
    min_ttl: u32,
    session: Box<dyn KeySession>,
}

impl<'a, E: Env> SigningContext<'a, E> {
    /// Read the zone and open the key session.
    pub fn open(env: E, config: &'a SignConfig) -> Result<Self> {
        let ParsedZone { mut zone, min_ttl } = read_zone(&env, config)?;
        info!("read {} records of zone {}", zone.len(), zone.apex());
        signer::strip_dnssec(&mut zone, config.digest);

        let session = open_session(&env, config)
            .with_context(|| format!("opening the {} key backend", config.backend.name()))?;
        Ok(Self {
            env,
            config,
            zone,
            min_ttl,
            session,
        })
    }

    /// Add keys and denial of existence and sign the zone.
    pub fn sign(&mut self) -> Result<()> {
        let create = self.config.create_keys;
        let zsk = self
            .session
            .retrieve_or_create_zsk(create)
            .context("retrieving the zone signing key")?;
        let ksk = self
            .session
            .retrieve_or_create_ksk(create)
            .context("retrieving the key signing key")?;
        debug!("ZSK {} and KSK {}", zsk.key_tag(), ksk.key_tag());
        for key in [&zsk, &ksk] {
            if key.expiration < self.config.rrsig_expiration {
                warn!(
                    "the stored {} expires at {}, before the signatures do",
                    key.role, key.expiration
                );
            }
        }

        signer::add_dnskeys(&mut self.zone, self.min_ttl, &[&zsk, &ksk])?;
        if self.config.digest {
            signer::add_zonemd(&mut self.zone)?;
        }
        if self.config.info {
            let text = self.info_text(&zsk);
            signer::add_info(&mut self.zone, self.min_ttl, &text)?;
        }
        add_chain(&mut self.zone, &self.config.denial())?;

        let apex = self.zone.apex().clone();
        let signer = Signer::new(
            &*self.session,
            &zsk,
            &ksk,
            &apex,
            self.config.inception,
            self.config.rrsig_expiration,
        );
        signer::sign_zone(&mut self.zone, &signer, self.config.digest)?;
        Ok(())
    }

    /// Write the signed zone.
    ///
    /// The zone goes to a temporary file next to the output first, which is
    /// renamed once complete.
    pub fn write(&self) -> Result<()> {
        let output = &self.config.output_path;
        let part = util::with_suffix(output, ".part");
        let written = util::create_file(&self.env, &part).and_then(|file| {
            write_to(&self.zone, file)
                .with_context(|| format!("writing '{}'", part.display()))
        });
        if let Err(err) = written {
            util::remove_quietly(&self.env, &part);
            return Err(err);
        }
        util::rename_path(&self.env, &part, output)?;
        info!("wrote {} records to '{}'", self.zone.len(), output.display());
        Ok(())
    }

    /// End the key session.
    pub fn finish(mut self) -> Result<()> {
        self.session.end()
    }

    pub fn zone(&self) -> &OrderedZone {
        &self.zone
    }

    fn info_text(&self, key: &SigningKey) -> String {
        let denial = match self.config.denial() {
            Denial::Nsec => "NSEC".to_string(),
            Denial::Nsec3(params) => format!(
                "NSEC3 with {} iterations{}",
                params.iterations,
                if params.opt_out { " and opt-out" } else { "" }
            ),
        };
        format!(
            "signed by dnssign {} with {} keys from the {} backend using {}",
            clap::crate_version!(),
            key.algorithm,
            self.config.backend.name(),
            denial
        )
    }
}

/// Sign a zone file as configured.
///
/// The key session is ended on every path. A failure to end it is only
/// reported if everything else succeeded.
pub fn sign_zone_file(env: impl Env, config: &SignConfig) -> Result<()> {
    let mut context = SigningContext::open(env, config)?;
    let result = context.sign().and_then(|()| context.write());
    let ended = context.finish();
    result?;
    ended?;
    info!("zone signed successfully");
    Ok(())
}

fn read_zone(env: &impl Env, config: &SignConfig) -> Result<ParsedZone> {
    let path = &config.file_path;
    let file = File::open(env.in_cwd(path))
        .map_err(|err| crate::error::Error::io(format!("cannot open zone file: {err}")))
        .with_context(|| format!("reading zone file '{}'", path.display()))?;
    ZoneReader::new()
        .zone(config.zone.clone())
        .input(file)
        .bump_serial(config.update_serial)
        .read()
        .with_context(|| format!("reading zone file '{}'", path.display()))
}

fn write_to(zone: &OrderedZone, file: File) -> Result<()> {
    let mut writer = BufWriter::new(file);
    signer::write_zone(zone, &mut writer)?;
    writer.into_inner().map_err(|err| err.into_error())?.sync_all()?;
    Ok(())
}
