//! segsig CLI: print a signature for every fixed-size segment of a file.

use anyhow::Result;
use clap::Parser;
use segsig::engine::arg_parser::Cli;
use segsig::engine::handle_run;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> Result<ExitCode> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let succeeded = handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
