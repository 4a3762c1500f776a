mod common;

use std::fs;
use std::path::Path;

use common::{dnssign, verify_signed_zone};
use regex::Regex;
use tempfile::tempdir;

const ZONE: &str = "\
$ORIGIN example.org.
$TTL 3600
@       IN SOA  ns1.example.org. hostmaster.example.org. (
                2024030100 ; serial
                7200       ; refresh
                3600       ; retry
                1209600    ; expire
                300 )      ; minimum
        IN NS   ns1
        IN MX   10 mail
ns1     IN A    192.0.2.53
mail    IN A    192.0.2.25
        IN AAAA 2001:db8::25
www     IN CNAME @
sub     IN NS   ns.sub
        IN DS   12345 13 2 ( 49FD46E6C4B45C55D4AC69CBD3CD34AC
                             1AFE51DE6E4F4EC6F3C9D8B2E1D0C0A1 )
ns.sub  IN A    192.0.2.99
a.b     IN TXT  \"empty non-terminal above\"
";

fn write_zone(dir: &Path) {
    fs::write(dir.join("example.org.zone"), ZONE).unwrap();
}

fn lines_of(path: &Path, rtype: &str) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| line.split('\t').nth(3) == Some(rtype))
        .map(str::to_string)
        .collect()
}

#[test]
fn sign_with_nsec3_and_opt_out() {
    let dir = tempdir().unwrap();
    write_zone(dir.path());

    let out = dnssign(
        dir.path(),
        &["sign", "-c", "-3", "-x", "-z", "example.org", "-f", "example.org.zone"],
    );
    assert!(
        out.status.success(),
        "{}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(String::from_utf8_lossy(&out.stderr).contains("zone signed successfully"));

    let signed = dir.path().join("example.org-signed.zone");
    let text = fs::read_to_string(&signed).unwrap();
    assert!(text.starts_with("example.org.\t3600\tIN\tSOA\t"));

    // The delegation has a DS so it stays in the opt-out chain. The empty
    // non-terminal b gets its own NSEC3.
    let nsec3 = lines_of(&signed, "NSEC3");
    assert_eq!(nsec3.len(), 7);
    let hashed = Regex::new(r"^[0-9a-v]{32}\.example\.org\.\t300\tIN\tNSEC3\t1 1 0 [0-9A-F]{16} [0-9a-v]{32}").unwrap();
    assert!(nsec3.iter().all(|line| hashed.is_match(line)), "{nsec3:#?}");

    let rrsig = Regex::new(r"^\S+\t\d+\tIN\tRRSIG\t[A-Z0-9]+ 13 \d+ \d+ \d{14} \d{14} \d+ example\.org\. \S+$").unwrap();
    let rrsigs = lines_of(&signed, "RRSIG");
    assert!(rrsigs.iter().all(|line| rrsig.is_match(line)), "{rrsigs:#?}");

    // Glue and the delegation NS are not signed.
    assert!(!rrsigs.iter().any(|line| line.starts_with("ns.sub.example.org.")));
    assert!(!rrsigs
        .iter()
        .any(|line| line.starts_with("sub.example.org.\t3600\tIN\tRRSIG\tNS ")));
    assert!(rrsigs
        .iter()
        .any(|line| line.starts_with("sub.example.org.\t3600\tIN\tRRSIG\tDS ")));

    assert_eq!(lines_of(&signed, "DNSKEY").len(), 2);
    assert_eq!(lines_of(&signed, "NSEC3PARAM").len(), 1);
}

#[test]
fn sign_twice_keeps_keys() {
    let dir = tempdir().unwrap();
    write_zone(dir.path());
    let args = ["sign", "-z", "example.org", "-f", "example.org.zone", "-o", "out.zone"];

    let mut create = vec!["-q"];
    create.extend(args);
    create.push("--create-keys");
    let out = dnssign(dir.path(), &create);
    assert!(out.status.success());
    assert!(out.stderr.is_empty(), "{}", String::from_utf8_lossy(&out.stderr));
    let first = lines_of(&dir.path().join("out.zone"), "DNSKEY");

    let out = dnssign(dir.path(), &args);
    assert!(out.status.success());
    assert_eq!(lines_of(&dir.path().join("out.zone"), "DNSKEY"), first);
    assert_eq!(lines_of(&dir.path().join("out.zone"), "NSEC").len(), 6);
}

#[test]
fn missing_zone_name_fails() {
    let dir = tempdir().unwrap();
    write_zone(dir.path());
    let out = dnssign(dir.path(), &["sign", "-f", "example.org.zone"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no zone name given"));
    assert!(!dir.path().join("example.org-signed.zone").exists());
}

#[ignore = "should only be run if ldns command line tools are installed"]
#[test]
fn signed_zones_verify() {
    let dir = tempdir().unwrap();
    write_zone(dir.path());
    for (extra, output) in [
        (&[][..], "nsec.zone"),
        (&["-3"][..], "nsec3.zone"),
        (&["-3", "-x", "--nsec3-iterations", "5"][..], "optout.zone"),
        (&["-d", "-i"][..], "digest.zone"),
        (&["-a", "ed25519"][..], "ed25519.zone"),
    ] {
        let mut args = vec!["sign", "-c", "-z", "example.org", "-f", "example.org.zone"];
        args.extend(["-o", output]);
        args.extend(extra);
        let out = dnssign(dir.path(), &args);
        assert!(
            out.status.success(),
            "{}",
            String::from_utf8_lossy(&out.stderr)
        );
        verify_signed_zone(&dir.path().join(output));
    }
}
