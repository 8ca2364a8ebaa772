//! Type the input sequences with a tool directory, and write the results.


use crate::config::{Config, Limits};
use crate::export::{self, Document, SequenceEntry};
use crate::runner::{Collaborator, ExternalTools};
use crate::sequence::{self, Record};
use crate::tool::Tool;
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use indicatif::{style::ProgressStyle, ParallelProgressIterator, ProgressBar};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

pub const RESULTS_FILE: &str = "results.json";
pub const LINELIST_FILE: &str = "linelist.tsv";
pub const RUN_ARGS_FILE: &str = "run_args.json";
pub const CONFIG_FILE: &str = "config.json";

/// Type the input sequences with a tool directory, and write the results.
pub fn run(args: &RunArgs) -> Result<(), Report> {
    // check output directory, create it if it doesn't exist
    let output_dir = &args.output_dir;
    if !output_dir.exists() {
        info!("Creating output directory: {output_dir:?}");
        std::fs::create_dir_all(output_dir)
            .wrap_err_with(|| format!("Failed to create output directory: {output_dir:?}"))?;
    }

    // configuration, with scan overrides from the command line
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration: {path:?}");
            Config::read(path)?
        }
        None => Config::new(),
    };
    config.override_scan(args.window.as_deref(), args.step.as_deref());

    let tool = Tool::<ExternalTools>::load(&args.definitions, &config)?;

    info!("Loading input sequences: {:?}", args.input);
    let records = sequence::read(&args.input)?;

    info!("Analyzing {} sequences with {} threads.", records.len(), args.threads);
    let sequences = assess(&tool, &records, &config.limits, args.threads)?;
    let failed = sequences.iter().filter(|s| s.conclusion().is_some_and(|c| c.error.is_some())).count();
    if failed > 0 {
        warn!("{failed} sequences could not be analyzed, see the error column of the linelist.");
    }

    let document = Document::new(tool.virus, sequences);

    let path = output_dir.join(RESULTS_FILE);
    info!("Exporting results: {path:?}");
    document.write(&path)?;

    let path = output_dir.join(LINELIST_FILE);
    info!("Exporting linelist: {path:?}");
    export::linelist(&document, &path)?;

    args.write(&output_dir.join(RUN_ARGS_FILE))?;
    config.write(&output_dir.join(CONFIG_FILE))?;

    info!("Done.");
    Ok(())
}

/// Analyze sequences in parallel, each worker with its own clone of the tool.
///
/// Entries are returned in input order. A sequence whose analyses fail, or that is longer
/// than the limit, gets a failed entry; the other sequences are not affected.
///
/// ## Examples
///
/// ```rust
/// use subtyper::config::Limits;
/// use subtyper::run::assess;
/// use subtyper::tool::{toy, Virus};
///
/// let tool = toy::tool(Virus::Hcv)?;
/// let entries = assess(&tool, &toy::queries(Virus::Hcv), &Limits::default(), 2)?;
/// let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
/// assert_eq!(names, ["genotype-1a", "genotype-2", "short"]);
///
/// let limits = Limits { max_sequences: 2, ..Default::default() };
/// assert!(assess(&tool, &toy::queries(Virus::Hcv), &limits, 2).is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn assess<C>(
    tool: &Tool<C>,
    records: &[Record],
    limits: &Limits,
    threads: usize,
) -> Result<Vec<SequenceEntry>, Report>
where
    C: Collaborator + Clone + Send + Sync,
{
    if records.len() > limits.max_sequences {
        Err(eyre!("{} input sequences exceed the limit of {}.", records.len(), limits.max_sequences))
            .suggestion("Split the input, or raise limits.max_sequences in the configuration.")?
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .wrap_err("Failed to build thread pool.")?;

    let progress_bar_style = ProgressStyle::with_template(
        "{bar:40} {pos}/{len} ({percent}%) | Sequences / Second: {per_sec} | Elapsed: {elapsed_precise}",
    )
    .wrap_err("Failed to create progress bar from template.")?;
    let progress_bar = ProgressBar::new(records.len() as u64).with_style(progress_bar_style);

    let sequences = pool.install(|| {
        records
            .par_iter()
            .progress_with(progress_bar)
            .map_init(
                || tool.clone(),
                |tool, query| match analyze(tool, query, limits) {
                    Ok(entry) => entry,
                    Err(report) => {
                        warn!("{report:#}");
                        SequenceEntry::failed(query, &report)
                    }
                },
            )
            .collect::<Vec<_>>()
    });

    Ok(sequences)
}

fn analyze<C>(tool: &mut Tool<C>, query: &Record, limits: &Limits) -> Result<SequenceEntry, Report>
where
    C: Collaborator,
{
    let length = query.length();
    if length > limits.max_length {
        Err(eyre!("Sequence {} is {length} bases long, the limit is {}.", query.id, limits.max_length))?
    }
    let assessment =
        tool.analyze(query).wrap_err_with(|| format!("Failed to analyze sequence {}", query.id))?;
    Ok(SequenceEntry::assessed(query, &assessment))
}

// ----------------------------------------------------------------------------
// RunArgs
// ----------------------------------------------------------------------------

/// Type aligned sequences with a tool directory.
#[derive(Clone, Debug, Deserialize, Parser, PartialEq, Serialize)]
pub struct RunArgs {
    /// Tool directory, with definitions.json and the reference alignments.
    #[clap(short = 'd', long, required = true)]
    pub definitions: PathBuf,

    /// Input fasta, aligned to the reference alignments.
    #[clap(short = 'i', long, required = true)]
    pub input: PathBuf,

    /// Output directory.
    ///
    /// If the directory does not exist, it will be created.
    #[clap(short = 'o', long, required = true)]
    #[serde(skip_serializing_if = "RunArgs::is_default_output_dir", skip_deserializing)]
    pub output_dir: PathBuf,

    /// Configuration file (JSON), missing keys take their defaults.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Bootscan window size, overriding the configuration.
    #[clap(short = 'w', long)]
    pub window: Option<String>,

    /// Bootscan step size, overriding the configuration.
    #[clap(short = 's', long)]
    pub step: Option<String>,

    /// Number of CPU threads to use.
    #[clap(short = 't', long, default_value_t = RunArgs::default().threads)]
    #[serde(skip)]
    pub threads: usize,
}

impl Default for RunArgs {
    fn default() -> Self {
        RunArgs {
            definitions: PathBuf::new(),
            input: PathBuf::new(),
            output_dir: PathBuf::new(),
            config: None,
            window: None,
            step: None,
            threads: 1,
        }
    }
}

impl RunArgs {
    /// Check if output directory is default.
    pub fn is_default_output_dir(path: &Path) -> bool {
        path == RunArgs::default().output_dir
    }

    /// Reads [`RunArgs`] from a JSON file.
    pub fn read<P>(path: &P) -> Result<RunArgs, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let input = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read run arguments: {path:?}."))?;
        let run_args = serde_json::from_str(&input)
            .wrap_err_with(|| format!("Failed to deserialize run arguments: {input}"))?;
        Ok(run_args)
    }

    /// Write [`RunArgs`] to a JSON file.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        crate::utils::create_parent_dir(path)?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err(format!("Failed to serialize run arguments: {self:?}"))?;
        std::fs::write(path, output)
            .wrap_err(format!("Failed to write run arguments: {path:?}"))?;
        Ok(())
    }
}
