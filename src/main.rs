use clap::Parser;
use color_eyre::eyre::{Report, Result};
use subtyper::{cli, cli::Cli};

fn main() -> Result<(), Report> {
    // ------------------------------------------------------------------------
    // CLI Setup

    // Parse CLI parameters
    let args = Cli::parse();

    // initialize color_eyre crate for colorized logs
    color_eyre::install()?;

    // Set logging/verbosity level via RUST_LOG
    std::env::set_var("RUST_LOG", args.verbosity.to_string());

    // initialize env_logger crate for logging/verbosity level
    env_logger::init();

    // check which CLI command we're running (run, verify, list)
    match args.command {
        cli::Command::Run(args) => subtyper::run::run(&args)?,
        cli::Command::Verify(args) => subtyper::verify::verify(&args)?,
        cli::Command::List(args) => println!("{}", subtyper::tool::list(&args)?),
    }

    Ok(())
}
