use std::process::ExitCode;

use dnssign::env::RealEnv;

fn main() -> ExitCode {
    ExitCode::from(dnssign::run(RealEnv::default()))
}
