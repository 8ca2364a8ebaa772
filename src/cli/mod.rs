//! [Command-line interface](Cli) (CLI) of the main binary.

use crate::run::RunArgs;
use crate::tool::ListArgs;
use crate::verify::VerifyArgs;
use crate::Verbosity;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// The command-line interface (CLI).
/// ---
/// The CLI is intended for parsing user input from the command-line in the main function.
/// ```no_run
/// use clap::Parser;
/// let args = subtyper::Cli::parse();
/// ```
/// A manual example of setting the command-line input:
/// ```rust
/// use clap::Parser;
/// use subtyper::cli::{Cli, Command};
///
/// let input = ["subtyper", "run", "--definitions", "tools/hiv-1", "--input", "input.fasta", "--output-dir", "output", "--window", "400"];
/// let args = Cli::parse_from(input);
/// match args.command {
///     Command::Run(args) => {
///         assert_eq!(args.window.as_deref(), Some("400"));
///         assert_eq!(args.threads, 1);
///     }
///     _ => unreachable!(),
/// }
///
/// let args = Cli::parse_from(["subtyper", "verify", "-d", "tools/hiv-1", "-o", "self-scan", "--step", "50"]);
/// assert!(matches!(&args.command, Command::Verify(verify) if verify.step.as_deref() == Some("50")));
///
/// let args = Cli::parse_from(["subtyper", "list", "--virus", "hcv", "--verbosity", "debug"]);
/// assert_eq!(args.verbosity.to_string(), "debug");
/// serde_json::to_string_pretty(&args)?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(name = "subtyper", author, version)]
#[clap(about = "subtyper assigns virus sequences to subtypes, genotypes and recombinant forms.")]
pub struct Cli {
    #[clap(subcommand)]
    /// Pass CLI arguments to a particular [Command].
    #[clap(help = "Set the command.")]
    pub command: Command,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,
}

/// CLI [commands](#variants). Used to decide which runtime [Command](#variants) the CLI arguments should be passed to.
#[derive(Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    /// Type aligned sequences with a tool directory.
    #[clap(about = "Type aligned sequences with a tool directory.")]
    Run(RunArgs),

    /// Self-scan the references of a tool directory.
    #[clap(about = "Self-scan the references of a tool directory.")]
    Verify(VerifyArgs),

    /// List supported viruses, or the analyses of a tool directory.
    #[clap(about = "List supported viruses, or the analyses of a tool directory.")]
    List(ListArgs),
}
