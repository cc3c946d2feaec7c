use std::env;
use std::process::ExitCode;

use immutability_engine::dispatcher::{self, Args};
use immutability_engine::logger;

fn main() -> ExitCode {
    logger::install();

    let argv: Vec<String> = env::args().skip(1).collect();

    let args = match Args::parse(&argv) {
        Ok(args) => args,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match dispatcher::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
