use std::path::Path;
use std::process::{Command, Output};

/// Run the dnssign binary in `dir`.
#[track_caller]
pub fn dnssign(dir: &Path, args: &[&str]) -> Output {
    test_bin::get_test_bin("dnssign")
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

/// Run an ldns command and dnssign and compare their output.
#[track_caller]
pub fn assert_ldns_cmd_eq_dnssign_cmd(ldns_cmd: &[&str], dnssign_cmd: &[&str]) {
    let ldns_out = Command::new(ldns_cmd[0])
        .args(&ldns_cmd[1..])
        .output()
        .unwrap();

    let dnssign_out = test_bin::get_test_bin("dnssign")
        .args(dnssign_cmd)
        .output()
        .unwrap();

    assert_eq!(
        std::str::from_utf8(&ldns_out.stderr),
        Ok(""),
        "Unexpected stderr content for ldns command: {}",
        ldns_cmd.join(" ")
    );
    assert_eq!(
        std::str::from_utf8(&dnssign_out.stderr),
        Ok(""),
        "Unexpected stderr content for dnssign command: {}",
        dnssign_cmd.join(" ")
    );
    assert!(
        !ldns_out.stdout.is_empty(),
        "Expected stdout content for ldns command: {}",
        ldns_cmd.join(" ")
    );
    assert_eq!(
        ldns_out.status.code(),
        dnssign_out.status.code(),
        "Exit code mismatch for ldns command: {}",
        ldns_cmd.join(" ")
    );
    assert_eq!(
        std::str::from_utf8(&ldns_out.stdout),
        std::str::from_utf8(&dnssign_out.stdout),
        "Stdout content mismatch for ldns command: {}, compared to dnssign command: {}",
        ldns_cmd.join(" "),
        dnssign_cmd.join(" ")
    );
}

/// Check a signed zone with `ldns-verify-zone`.
#[track_caller]
pub fn verify_signed_zone(path: &Path) {
    let verify_output = Command::new("ldns-verify-zone")
        .arg(path)
        .output()
        .unwrap();

    if !verify_output.status.success() {
        eprintln!(
            "ldns-verify-zone failed with exit code {:?} and stderr output:\n{}",
            verify_output.status.code(),
            String::from_utf8_lossy(&verify_output.stderr)
        );
    }

    assert!(
        verify_output.status.success(),
        "Expected zone verification to succeed"
    );
}
