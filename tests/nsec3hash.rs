mod common;

use common::assert_ldns_cmd_eq_dnssign_cmd;

const LDNS_NSEC3_CMD: &str = "ldns-nsec3-hash";
const DNSSIGN_NSEC3_SUBCMD: &str = "nsec3-hash";
const TEST_ZONE_NAME: &str = "nlnetlabs.nl";

#[ignore = "should only be run if ldns command line tools are installed"]
#[test]
fn nsec3_hash() {
    // ldns-nsec3-hash defaults to 1 iteration, dnssign to 0.
    assert_ldns_cmd_eq_dnssign_cmd(
        &[LDNS_NSEC3_CMD, TEST_ZONE_NAME],
        &[DNSSIGN_NSEC3_SUBCMD, "--iterations", "1", TEST_ZONE_NAME],
    );
    assert_ldns_cmd_eq_dnssign_cmd(
        &[LDNS_NSEC3_CMD, "-t", "0", TEST_ZONE_NAME],
        &[DNSSIGN_NSEC3_SUBCMD, TEST_ZONE_NAME],
    );
    assert_ldns_cmd_eq_dnssign_cmd(
        &[LDNS_NSEC3_CMD, "-a", "1", "-t", "5", TEST_ZONE_NAME],
        &[DNSSIGN_NSEC3_SUBCMD, "-a", "1", "-t", "5", TEST_ZONE_NAME],
    );
    assert_ldns_cmd_eq_dnssign_cmd(
        &[LDNS_NSEC3_CMD, "-s", "DEADBEEF", "-t", "3", TEST_ZONE_NAME],
        &[DNSSIGN_NSEC3_SUBCMD, "--salt", "DEADBEEF", "-i", "3", TEST_ZONE_NAME],
    );
}

#[test]
fn nsec3_hash_binary() {
    let out = test_bin::get_test_bin("dnssign")
        .args(["nsec3-hash", "-i", "12", "-s", "aabbccdd", "example"])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "0p9mhaveqvm6t7vbl5lop2u3t2rp3tom.\n"
    );
}
