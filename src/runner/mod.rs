//! Run one analysis for one query sequence, producing a typed [`AnalysisResult`].
//!
//! Tree building and similarity search are delegated to a [`Collaborator`], whose raw text
//! output is parsed here. [`ExternalTools`] is the collaborator that runs configured programs.

pub mod external;
pub mod phylo;
pub mod scan;
pub mod similarity;

pub use external::ExternalTools;

use crate::analysis::{Analyses, AnalysisDefinition, Kind};
use crate::cascade::CascadeConfig;
use crate::config::ScanConfig;
use crate::error::Error;
use crate::result::AnalysisResult;
use crate::sequence::Record;
use color_eyre::eyre::{Report, Result};
use std::path::Path;

/// Label of the query sequence in alignments handed to the tree builder.
pub const QUERY: &str = "QUERY";

// ----------------------------------------------------------------------------
// Collaborator
// ----------------------------------------------------------------------------

/// External programs the runners delegate to.
pub trait Collaborator {
    /// Search `query` against a reference database, returning tabular hits
    /// (BLAST `-outfmt 6`: 12 tab separated columns, bit score last).
    fn search(&self, query: &Record, database: &Path) -> Result<String, Report>;

    /// Build bootstrap replicate trees of an alignment, returning them as Newick text.
    fn bootstrap(&self, alignment: &[Record]) -> Result<String, Report>;
}

// ----------------------------------------------------------------------------
// Runner
// ----------------------------------------------------------------------------

/// Executes analyses against a [`Collaborator`], with default cutoffs from the configuration.
#[derive(Clone, Debug)]
pub struct Runner<C> {
    pub collaborator: C,
    pub cascade: CascadeConfig,
    pub scan: ScanConfig,
}

impl<C> Runner<C>
where
    C: Collaborator,
{
    pub fn new(collaborator: C, cascade: CascadeConfig, scan: ScanConfig) -> Self {
        Runner { collaborator, cascade, scan }
    }

    /// Run analysis `id` for the query, whatever its kind.
    pub fn run(
        &self,
        analyses: &Analyses,
        id: &str,
        query: &Record,
    ) -> Result<AnalysisResult, Report> {
        let result = match analyses.get(id)?.kind {
            Kind::SimilaritySearch => self.similarity(analyses, id, query)?.into(),
            Kind::PhyloCluster => self.phylo(analyses, id, query)?.into(),
            Kind::Scan => self.scan(analyses, id, query)?.into(),
        };
        Ok(result)
    }
}

/// Returns the analysis `id`, checking that it is of the expected kind.
fn definition<'a>(
    analyses: &'a Analyses,
    id: &str,
    kind: Kind,
) -> Result<&'a AnalysisDefinition, Report> {
    let definition = analyses.get(id)?;
    if definition.kind != kind {
        Err(Error::analysis(id, format!("Expected a {kind} analysis, found {}.", definition.kind)))?
    }
    Ok(definition)
}
