//! Self-scan of a tool directory, to check that the reference clusters hold up in a bootscan.
//!
//! Every reference of the clusters of a self-scan analysis is scanned as a query, against
//! the references of the tool with itself left out.

#[cfg(test)]
mod tests;

use crate::analysis::{Analyses, AnalysisDefinition, Kind};
use crate::cluster::Cluster;
use crate::config::Config;
use crate::error::Error;
use crate::export::{Document, ResultEntry, SequenceEntry};
use crate::result::{AnalysisResult, ScanResult};
use crate::run::CONFIG_FILE;
use crate::runner::{Collaborator, ExternalTools, Runner};
use crate::sequence::Record;
use crate::tool::Tool;
use clap::Parser;
use color_eyre::eyre::{Report, Result, WrapErr};
use color_eyre::Help;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SELF_SCAN_FILE: &str = "self-scan.json";

/// Returns true for scan analyses that scan the references themselves (ex. `scan-pure-self`).
pub fn is_self_scan(definition: &AnalysisDefinition) -> bool {
    definition.kind == Kind::Scan && (definition.id.ends_with("-self") || definition.id.ends_with("self-scan"))
}

/// The bootscan of one reference, left out of its own cluster.
#[derive(Clone, Debug, PartialEq)]
pub struct SelfScan {
    pub reference: Record,
    /// Cluster the reference belongs to.
    pub cluster: Cluster,
    pub scan: ScanResult,
}

impl SelfScan {
    /// Returns true if the reference's own cluster is best supported in its bootscan.
    pub fn is_consistent(&self) -> bool {
        self.scan.best().is_some_and(|c| c.id == self.cluster.id)
    }
}

/// Bootscan every reference of the inner analysis of scan `id`, in alignment order.
///
/// ## Examples
///
/// ```rust
/// use subtyper::tool::{toy, Virus};
/// use subtyper::verify::self_scan;
///
/// let tool = toy::tool(Virus::Hiv1)?;
/// let scans = self_scan(&tool.runner, &tool.analyses, "scan-pure-self")?;
/// let references: Vec<_> = scans.iter().map(|s| s.reference.id.as_str()).collect();
/// assert_eq!(references, ["A.1", "A.2", "B.1", "B.2", "C.1", "C.2"]);
/// assert!(scans.iter().all(|s| s.is_consistent()));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn self_scan<C>(runner: &Runner<C>, analyses: &Analyses, id: &str) -> Result<Vec<SelfScan>, Report>
where
    C: Collaborator,
{
    let inner = analyses
        .get(id)?
        .analysis
        .as_deref()
        .ok_or_else(|| Error::analysis(id, "No inner phylo-cluster analysis is defined."))?;
    let clusters = analyses.clusters(inner)?;
    let reference = &analyses.get(inner)?.reference;
    if reference.is_empty() {
        Err(Error::analysis(inner, "No reference alignment is loaded."))?
    }

    reference
        .iter()
        .filter_map(|record| clusters.iter().find(|c| c.contains(&record.id)).map(|c| (record, *c)))
        .map(|(record, cluster)| {
            debug!("{id}: scanning reference {} of cluster {}", record.id, cluster.id);
            let others = analyses.without_taxon(&record.id)?;
            let scan = runner
                .scan(&others, id, record)
                .wrap_err_with(|| format!("Failed to scan reference {}", record.id))?;
            Ok::<_, Report>(SelfScan { reference: record.clone(), cluster: cluster.clone(), scan })
        })
        .collect()
}

/// Self-scan every self-scan analysis of a tool, one sequence entry per reference.
pub fn assess<C>(tool: &Tool<C>) -> Result<Document, Report>
where
    C: Collaborator,
{
    let ids: Vec<&str> = tool.analyses.iter().filter(|d| is_self_scan(d)).map(|d| d.id.as_str()).collect();
    if ids.is_empty() {
        Err(Error::definition(format!("Definitions for {} have no self-scan analysis.", tool.virus)))
            .suggestion("Add a scan analysis with an id ending in -self or self-scan.")?
    }

    let mut sequences: Vec<SequenceEntry> = Vec::new();
    for id in ids {
        let scans = self_scan(&tool.runner, &tool.analyses, id)?;
        info!("{id}: scanned {} references.", scans.len());

        for scan in scans {
            if !scan.is_consistent() {
                warn!(
                    "{id}: reference {} is not best supported by its cluster {}, but by {:?}.",
                    scan.reference.id,
                    scan.cluster.id,
                    scan.scan.best().map(|c| &c.id)
                );
            }
            let entry = ResultEntry::from(&AnalysisResult::from(scan.scan));
            match sequences.iter_mut().find(|s| s.name == scan.reference.id) {
                Some(sequence) => sequence.results.push(entry),
                None => sequences.push(SequenceEntry {
                    name: scan.reference.id.clone(),
                    length: scan.reference.length(),
                    results: vec![entry],
                }),
            }
        }
    }

    Ok(Document::new(tool.virus, sequences))
}

/// Self-scan a tool directory, and write the scans.
pub fn verify(args: &VerifyArgs) -> Result<(), Report> {
    let output_dir = &args.output_dir;
    if !output_dir.exists() {
        info!("Creating output directory: {output_dir:?}");
        std::fs::create_dir_all(output_dir)
            .wrap_err_with(|| format!("Failed to create output directory: {output_dir:?}"))?;
    }

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration: {path:?}");
            Config::read(path)?
        }
        None => Config::new(),
    };
    config.override_scan(args.window.as_deref(), args.step.as_deref());
    info!("Self-scan with window {} and step {}.", config.scan.window, config.scan.step);

    let tool = Tool::<ExternalTools>::load(&args.definitions, &config)?;
    let document = assess(&tool)?;

    let path = output_dir.join(SELF_SCAN_FILE);
    info!("Exporting self-scan: {path:?}");
    document.write(&path)?;
    config.write(&output_dir.join(CONFIG_FILE))?;

    info!("Done.");
    Ok(())
}

/// Self-scan the references of a tool directory.
#[derive(Clone, Debug, Default, Deserialize, Parser, PartialEq, Serialize)]
pub struct VerifyArgs {
    /// Tool directory, with definitions.json and the reference alignments.
    #[clap(short = 'd', long, required = true)]
    pub definitions: PathBuf,

    /// Output directory.
    ///
    /// If the directory does not exist, it will be created.
    #[clap(short = 'o', long, required = true)]
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
}
