//! Signing a single RRset.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::keys::{KeySession, SigningKey};
use crate::record::rdata::Rrsig;
use crate::record::{Name, Record, RecordData, RecordSet, Rtype};

/// The RRSIG record data for `rrset` without the signature.
pub fn rrsig_template(
    rrset: &RecordSet<'_>,
    signer: &Name,
    key: &SigningKey,
    inception: u32,
    expiration: u32,
) -> Rrsig {
    Rrsig {
        type_covered: rrset.rtype(),
        algorithm: key.algorithm.number(),
        labels: rrset.owner().rrsig_label_count(),
        original_ttl: rrset.ttl(),
        expiration,
        inception,
        key_tag: key.key_tag(),
        signer: signer.clone(),
        signature: Default::default(),
    }
}

/// The data covered by a signature, RFC 4034, section 3.1.8.1.
///
/// The RRSIG fields up to the signer name, followed by every member of the
/// RRset in canonical form with the original TTL. The members of a
/// [`RecordSet`] already are in canonical order.
pub fn signed_data(rrsig: &Rrsig, rrset: &RecordSet<'_>) -> Vec<u8> {
    let mut data = Vec::new();
    rrsig.compose_without_signature(true, &mut data);
    for record in rrset.iter() {
        record.compose_canonical(rrsig.original_ttl, &mut data);
    }
    data
}

/// A point in time as an RRSIG timestamp.
pub fn rrsig_time(time: DateTime<Utc>) -> Result<u32> {
    u32::try_from(time.timestamp())
        .map_err(|_| Error::config(format!("{time} cannot be expressed in a signature")))
}

//------------ Signer --------------------------------------------------------

/// Produces RRSIG records through a [`KeySession`].
pub struct Signer<'a> {
    session: &'a dyn KeySession,
    zsk: &'a SigningKey,
    ksk: &'a SigningKey,
    apex: &'a Name,
    inception: DateTime<Utc>,
    expiration: DateTime<Utc>,
}

impl<'a> Signer<'a> {
    pub fn new(
        session: &'a dyn KeySession,
        zsk: &'a SigningKey,
        ksk: &'a SigningKey,
        apex: &'a Name,
        inception: DateTime<Utc>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            session,
            zsk,
            ksk,
            apex,
            inception,
            expiration,
        }
    }

    /// The key signing RRsets of the given type.
    ///
    /// The key signing key covers the key RRsets, everything else is
    /// signed with the zone signing key.
    pub fn key_for(&self, rtype: Rtype) -> &'a SigningKey {
        match rtype {
            Rtype::DNSKEY | Rtype::CDS | Rtype::CDNSKEY => self.ksk,
            _ => self.zsk,
        }
    }

    /// Sign one RRset.
    pub fn sign(&self, rrset: &RecordSet<'_>) -> Result<Record> {
        let key = self.key_for(rrset.rtype());
        let expiration = rrsig_time(self.expiration)?;
        let inception = rrsig_time(self.inception)?;

        let mut rrsig = rrsig_template(rrset, self.apex, key, inception, expiration);
        let data = signed_data(&rrsig, rrset);
        rrsig.signature = self.session.sign(&data, key).map_err(|err| {
            err.context(&format!(
                "signing {} {} with the {}",
                rrset.owner(),
                rrset.rtype(),
                key.role
            ))
        })?;

        Ok(Record::new(
            rrset.owner().clone(),
            rrset.ttl(),
            rrset.class(),
            Rtype::RRSIG,
            RecordData::Rrsig(rrsig),
        ))
    }
}

//============ Tests =========================================================

#[cfg(test)]
pub(crate) mod tests {
    use std::str::FromStr;

    use bytes::Bytes;
    use chrono::TimeZone;
    use ring::digest;

    use super::*;
    use crate::keys::{KeyHandle, KeyRole, SignAlgorithm};
    use crate::record::OrderedZone;
    use crate::zonefile::read_zone;

    /// A session whose signatures are the SHA-256 digest of the data.
    pub struct DigestSession;

    impl KeySession for DigestSession {
        fn retrieve_or_create_zsk(&mut self, _: bool) -> Result<SigningKey> {
            Ok(test_key(KeyRole::Zsk, 2025))
        }

        fn retrieve_or_create_ksk(&mut self, _: bool) -> Result<SigningKey> {
            Ok(test_key(KeyRole::Ksk, 2025))
        }

        fn sign(&self, data: &[u8], _: &SigningKey) -> Result<Bytes> {
            Ok(Bytes::copy_from_slice(
                digest::digest(&digest::SHA256, data).as_ref(),
            ))
        }

        fn end(&mut self) -> Result<()> {
            Ok(())
        }
    }

    pub fn test_key(role: KeyRole, expires: i32) -> SigningKey {
        SigningKey::new(
            role,
            SignAlgorithm::EcdsaP256Sha256,
            Bytes::from(vec![role.flags() as u8; 64]),
            Utc.with_ymd_and_hms(expires, 1, 1, 0, 0, 0).unwrap(),
            KeyHandle(0),
        )
    }

    fn zone() -> OrderedZone {
        read_zone(
            Name::from_str("example.").unwrap(),
            b"@ 3600 IN SOA ns hostmaster 1 7200 3600 1209600 300\n\
              Example. 3600 IN A 192.0.2.2\n\
              @ 3600 IN A 192.0.2.1\n",
            false,
        )
        .unwrap()
        .zone
    }

    #[test]
    fn signed_data_is_rfc4034_canonical() {
        let zone = zone();
        let rrsets = zone.rrsets();
        let a = rrsets.iter().find(|set| set.rtype() == Rtype::A).unwrap();
        let rrsig = Rrsig {
            type_covered: Rtype::A,
            algorithm: 13,
            labels: 1,
            original_ttl: 3600,
            expiration: 0x6650_0000,
            inception: 0x65e0_0000,
            key_tag: 12345,
            signer: Name::from_str("EXAMPLE.").unwrap(),
            signature: Bytes::new(),
        };

        let expected = hex::decode(concat!(
            // type covered, algorithm, labels, original TTL
            "0001", "0d", "01", "00000e10",
            // expiration, inception, key tag
            "66500000", "65e00000", "3039",
            // signer, lowercased
            "076578616d706c6500",
            // both A records, lowercased and in rdata order
            "076578616d706c6500", "0001", "0001", "00000e10", "0004", "c0000201",
            "076578616d706c6500", "0001", "0001", "00000e10", "0004", "c0000202",
        ))
        .unwrap();
        assert_eq!(signed_data(&rrsig, a), expected);
    }

    #[test]
    fn key_choice_and_expiration() {
        let zone = zone();
        let zsk = test_key(KeyRole::Zsk, 2030);
        let ksk = test_key(KeyRole::Ksk, 2024);
        let inception = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let expiration = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let signer = Signer::new(
            &DigestSession,
            &zsk,
            &ksk,
            zone.apex(),
            inception,
            expiration,
        );

        assert_eq!(signer.key_for(Rtype::DNSKEY).role, KeyRole::Ksk);
        assert_eq!(signer.key_for(Rtype::CDS).role, KeyRole::Ksk);
        assert_eq!(signer.key_for(Rtype::SOA).role, KeyRole::Zsk);
        assert_eq!(signer.key_for(Rtype::NSEC3).role, KeyRole::Zsk);

        let rrsets = zone.rrsets();
        let soa = rrsets.iter().find(|set| set.rtype() == Rtype::SOA).unwrap();
        let record = signer.sign(soa).unwrap();
        let rrsig = record.data.as_rrsig().unwrap();
        assert_eq!(record.owner, *zone.apex());
        assert_eq!(record.ttl, 3600);
        assert_eq!(rrsig.key_tag, zsk.key_tag());
        assert_eq!(rrsig.labels, 1);
        assert_eq!(i64::from(rrsig.inception), inception.timestamp());
        assert_eq!(i64::from(rrsig.expiration), expiration.timestamp());
        assert_eq!(
            rrsig.signature.as_ref(),
            digest::digest(&digest::SHA256, &signed_data(rrsig, soa)).as_ref()
        );

        // Signatures carry the configured expiration, whatever the key says.
        let dnskey_owner = zone.soa().unwrap();
        let fake = Record::new(
            dnskey_owner.owner.clone(),
            300,
            dnskey_owner.class,
            Rtype::DNSKEY,
            RecordData::Dnskey(ksk.dnskey()),
        );
        let keys = OrderedZone::new(zone.apex().clone(), vec![fake]);
        let record = signer.sign(&keys.rrsets()[0]).unwrap();
        let rrsig = record.data.as_rrsig().unwrap();
        assert_eq!(rrsig.key_tag, ksk.key_tag());
        assert_eq!(i64::from(rrsig.expiration), expiration.timestamp());
        assert_ne!(rrsig.expiration, rrsig_time(ksk.expiration).unwrap());
    }

    #[test]
    fn wildcard_labels() {
        let zone = read_zone(
            Name::from_str("example.").unwrap(),
            b"@ 3600 IN SOA ns hostmaster 1 7200 3600 1209600 300\n\
              *.a 3600 IN TXT \"w\"\n",
            false,
        )
        .unwrap()
        .zone;
        let rrsets = zone.rrsets();
        let txt = rrsets.iter().find(|set| set.rtype() == Rtype::TXT).unwrap();
        let key = test_key(KeyRole::Zsk, 2030);
        assert_eq!(rrsig_template(txt, zone.apex(), &key, 0, 1).labels, 2);
    }
}
