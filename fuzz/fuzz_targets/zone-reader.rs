#![no_main]

use std::str::FromStr;

use libfuzzer_sys::fuzz_target;

use dnssign::record::Name;
use dnssign::zonefile::read_zone;

fuzz_target!(|data: &[u8]| {
    let Ok(apex) = Name::from_str("example.com.") else {
        return;
    };
    let _ = read_zone(apex, data, false);
});
