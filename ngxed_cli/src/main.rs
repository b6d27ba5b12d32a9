#![cfg_attr(feature = "strict", deny(warnings))]

use std::process::ExitCode;

use clap::Parser;
use cli::CLI;
use crates_tracing::TracingOptions;
use ngxed_file::Error;
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;

fn main() -> ExitCode {
    let cli = CLI::parse();

    let _guard = crates_tracing::init(TracingOptions {
        app_name: "ngxed".to_string(),
        level: level(cli.verbose),
        log_file: cli.log_file,
    });

    match commands::run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(exit_code(&error))
        }
    }
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Exit status for a failed run, following the sysexits conventions.
fn exit_code(error: &Error) -> u8 {
    match error {
        Error::MalformedDirective { .. } | Error::UnexpectedStructure { .. } => 65,
        Error::ResourceUnavailable { .. } => 66,
        Error::WriteFailed { .. } => 73,
        Error::InvalidValue { .. } => 2,
        Error::NotFound { .. } | Error::AlreadyExists { .. } => 1,
    }
}
