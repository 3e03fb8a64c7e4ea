use std::process::ExitCode;

use clap::Parser;

use colorslate::{cli, logger};

fn main() -> ExitCode {
    // Session log first so every subsequent step can report into it
    logger::init();

    let args = cli::CliArgs::parse();
    cli::run(args)
}
