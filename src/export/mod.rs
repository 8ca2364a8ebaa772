//! Result documents (JSON) and linelists (TSV/CSV) of a run.

#[cfg(test)]
mod tests;

use crate::analysis::Kind;
use crate::cascade::{Assessment, Conclusion, Rule, UNASSIGNED};
use crate::result::AnalysisResult;
use crate::sequence::Record;
use crate::tool::Virus;
use crate::utils;
use chrono::{DateTime, Utc};
use color_eyre::eyre::{Report, Result, WrapErr};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;

/// Id of the result entry holding the conclusion of a sequence.
pub const CONCLUSION: &str = "conclusion";
/// Concluded name of a sequence whose analyses failed.
pub const FAILED: &str = "Failed";

// ----------------------------------------------------------------------------
// Result Entry
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concluded_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concluded_name: Option<String>,
}

/// Bootstrap support of the best cluster of a phylo-cluster analysis, in percent.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BestEntry {
    pub support: f64,
    pub inner: f64,
    pub outer: f64,
}

/// One analysis result of a sequence, or its conclusion.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResultEntry {
    /// Analysis id, or [`CONCLUSION`]. Re-runs with a candidate cluster are `<analysis>+<candidate>`.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    /// Candidate cluster that was temporarily part of the analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best: Option<BestEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Bootscan: fraction of windows supporting each cluster.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub support: BTreeMap<String, f64>,
    /// Bootscan: fraction of windows where each cluster was best without support.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nosupport: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&AnalysisResult> for ResultEntry {
    fn from(result: &AnalysisResult) -> Self {
        let candidate = result.candidate().map(String::from);
        let id = match &candidate {
            Some(candidate) => format!("{}+{candidate}", result.analysis()),
            None => result.analysis().to_string(),
        };
        let mut entry = ResultEntry { id, kind: Some(result.kind()), candidate, ..Default::default() };
        entry.cluster = result.best().map(|cluster| ClusterEntry {
            id: Some(cluster.id.clone()),
            name: Some(cluster.name.clone()),
            ..Default::default()
        });

        match result {
            AnalysisResult::Similarity(similarity) => entry.score = Some(similarity.score),
            AnalysisResult::Phylo(phylo) => {
                entry.best = phylo.best.as_ref().map(|_| BestEntry {
                    support: phylo.support,
                    inner: phylo.inner,
                    outer: phylo.outer,
                })
            }
            AnalysisResult::Scan(scan) => {
                for profile in &scan.profile {
                    let id = &profile.cluster.id;
                    entry.support.insert(id.clone(), scan.bootscan_support(id));
                    entry.nosupport.insert(id.clone(), scan.bootscan_nosupport(id));
                }
            }
        }

        entry
    }
}

impl From<&Conclusion> for ResultEntry {
    fn from(conclusion: &Conclusion) -> Self {
        ResultEntry {
            id: CONCLUSION.to_string(),
            cluster: Some(ClusterEntry {
                concluded_id: Some(conclusion.assignment.id_or_unassigned().to_string()),
                concluded_name: Some(conclusion.assignment.name.clone()),
                ..Default::default()
            }),
            rule: Some(conclusion.rule),
            via: conclusion.via,
            motivation: Some(conclusion.justification.clone()),
            ..Default::default()
        }
    }
}

impl ResultEntry {
    /// The conclusion entry of a sequence whose analyses failed, with the error chain.
    pub fn failed(report: &Report) -> Self {
        ResultEntry {
            id: CONCLUSION.to_string(),
            cluster: Some(ClusterEntry {
                concluded_id: Some(UNASSIGNED.to_string()),
                concluded_name: Some(FAILED.to_string()),
                ..Default::default()
            }),
            error: Some(report.chain().map(|e| e.to_string()).join(": ")),
            ..Default::default()
        }
    }
}

// ----------------------------------------------------------------------------
// Document
// ----------------------------------------------------------------------------

/// Every result of one input sequence, its conclusion last.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SequenceEntry {
    pub name: String,
    /// Number of bases, gaps excluded.
    pub length: usize,
    pub results: Vec<ResultEntry>,
}

impl SequenceEntry {
    pub fn assessed(query: &Record, assessment: &Assessment) -> Self {
        let mut results: Vec<ResultEntry> = assessment.results.iter().map(ResultEntry::from).collect();
        results.push(ResultEntry::from(&assessment.conclusion));
        SequenceEntry { name: query.id.clone(), length: query.length(), results }
    }

    pub fn failed(query: &Record, report: &Report) -> Self {
        SequenceEntry { name: query.id.clone(), length: query.length(), results: vec![ResultEntry::failed(report)] }
    }

    /// Returns the conclusion entry.
    pub fn conclusion(&self) -> Option<&ResultEntry> {
        self.results.iter().find(|r| r.id == CONCLUSION)
    }
}

/// The results of a run.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Document {
    /// Version of the program that wrote the document.
    pub version: String,
    pub created: DateTime<Utc>,
    pub virus: Virus,
    pub sequences: Vec<SequenceEntry>,
}

impl Document {
    pub fn new(virus: Virus, sequences: Vec<SequenceEntry>) -> Self {
        Document { version: env!("CARGO_PKG_VERSION").to_string(), created: Utc::now(), virus, sequences }
    }

    /// Reads a [`Document`] from a JSON file.
    pub fn read<P>(path: &P) -> Result<Document, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let input = std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read results: {path:?}."))?;
        let document =
            serde_json::from_str(&input).wrap_err_with(|| format!("Failed to deserialize results: {path:?}"))?;
        Ok(document)
    }

    /// Write a [`Document`] to a JSON file.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        utils::create_parent_dir(path)?;
        let output = serde_json::to_string_pretty(self).wrap_err(format!("Failed to serialize results: {path:?}"))?;
        std::fs::write(path, output).wrap_err(format!("Failed to write results: {path:?}"))?;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Linelist
// ----------------------------------------------------------------------------

/// One row of the linelist, summarizing the conclusion of a sequence.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct LinelistRow {
    pub sequence: String,
    pub length: usize,
    pub concluded_id: String,
    pub concluded_name: String,
    pub rule: String,
    pub via: String,
    pub motivation: String,
    pub error: String,
}

impl From<&SequenceEntry> for LinelistRow {
    fn from(entry: &SequenceEntry) -> Self {
        let conclusion = entry.conclusion().cloned().unwrap_or_default();
        let cluster = conclusion.cluster.unwrap_or_default();
        LinelistRow {
            sequence: entry.name.clone(),
            length: entry.length,
            concluded_id: cluster.concluded_id.unwrap_or_else(|| UNASSIGNED.to_string()),
            concluded_name: cluster.concluded_name.unwrap_or_default(),
            rule: conclusion.rule.map(|r| r.to_string()).unwrap_or_default(),
            via: conclusion.via.map(|r| r.to_string()).unwrap_or_default(),
            motivation: conclusion.motivation.unwrap_or_default(),
            error: conclusion.error.unwrap_or_default(),
        }
    }
}

/// Write one row per sequence, tab or comma delimited by the file extension.
///
/// ## Examples
///
/// ```rust
/// use subtyper::export::{linelist, Document, SequenceEntry};
/// use subtyper::tool::Virus;
///
/// let dir = tempfile::tempdir()?;
/// let document = Document::new(Virus::Hcv, vec![SequenceEntry { name: "query".to_string(), ..Default::default() }]);
///
/// linelist(&document, &dir.path().join("linelist.csv"))?;
/// let output = std::fs::read_to_string(dir.path().join("linelist.csv"))?;
/// assert!(output.starts_with("sequence,length,concluded_id,"));
///
/// assert!(linelist(&document, &dir.path().join("linelist.xlsx")).is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn linelist<P>(document: &Document, path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    let delimiter = utils::get_delimiter(path)?;
    utils::create_parent_dir(path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .from_path(path)
        .wrap_err_with(|| format!("Failed to create linelist: {path:?}"))?;
    for entry in &document.sequences {
        writer
            .serialize(LinelistRow::from(entry))
            .wrap_err_with(|| format!("Failed to write linelist row for sequence {}", entry.name))?;
    }
    writer.flush().wrap_err_with(|| format!("Failed to write linelist: {path:?}"))?;
    Ok(())
}
