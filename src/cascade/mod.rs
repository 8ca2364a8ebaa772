//! Per-virus decision cascades, turning analysis results into one [`Conclusion`].
//!
//! Each cascade is split in two halves:
//!
//! - `analyze` runs the analyses a sequence needs, including re-runs with a temporary
//!   candidate cluster, and gathers them as evidence.
//! - `decide` is a pure, total function from that evidence to a [`Conclusion`].
//!
//! Only `analyze` can fail, and only because an analysis failed.

pub mod hcv;
pub mod hiv;
#[cfg(test)]
mod tests;

use crate::cluster::Cluster;
use crate::result::{AnalysisResult, SupportedType};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Assignment name and id sentinel of sequences without a cluster.
pub const UNASSIGNED: &str = "Unassigned";

// ----------------------------------------------------------------------------
// Cascade Config
// ----------------------------------------------------------------------------

/// Fractions of bootscan windows that decide between recombinant outcomes.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Bands {
    /// A single supported type at or above this fraction is treated as non-recombinant.
    pub confirmed: f64,
    /// A single supported type at or above this fraction is a potential recombinant.
    pub potential: f64,
    /// CRF bootscan support above this fraction, with other supported types, is a recombinant.
    pub minimum: f64,
}

impl Default for Bands {
    fn default() -> Self {
        Bands { confirmed: 0.7, potential: 0.5, minimum: 0.1 }
    }
}

/// Decision boundaries shared by the cascades.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Sequences longer than this (in bases) take the full HIV-1 cascade.
    pub length_gate: usize,
    /// Bootstrap support (%) of phylo-cluster analyses without their own cutoff.
    pub support_threshold: f64,
    /// How far inner support may trail outer support for a "-like" assignment.
    pub inner_outer_margin: f64,
    /// How far inner support may trail outer support for short sequences.
    pub short_inner_outer_margin: f64,
    /// Bit score a similarity search without its own cutoff must exceed.
    pub similarity_score_threshold: f64,
    pub bands: Bands,
    /// HCV genotype that is further assigned to a subtype.
    pub subtyping_cluster: String,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        CascadeConfig {
            length_gate: 800,
            support_threshold: 70.0,
            inner_outer_margin: 30.0,
            short_inner_outer_margin: 50.0,
            similarity_score_threshold: 200.0,
            bands: Bands::default(),
            subtyping_cluster: "1".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Rule
// ----------------------------------------------------------------------------

/// The terminal rule of a cascade, kept for audit.
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
pub enum Rule {
    #[serde(rename = "1A")]
    #[strum(serialize = "1A")]
    Rule1A,
    #[serde(rename = "1B")]
    #[strum(serialize = "1B")]
    Rule1B,
    #[serde(rename = "1C")]
    #[strum(serialize = "1C")]
    Rule1C,
    /// Unassigned inside the pure rules, distinct from [`Rule::Rule5`].
    #[serde(rename = "1c")]
    #[strum(serialize = "1c")]
    Rule1c,
    #[serde(rename = "2A")]
    #[strum(serialize = "2A")]
    Rule2A,
    #[serde(rename = "2B")]
    #[strum(serialize = "2B")]
    Rule2B,
    #[serde(rename = "2C")]
    #[strum(serialize = "2C")]
    Rule2C,
    #[serde(rename = "2D")]
    #[strum(serialize = "2D")]
    Rule2D,
    #[serde(rename = "3A")]
    #[strum(serialize = "3A")]
    Rule3A,
    #[serde(rename = "3B")]
    #[strum(serialize = "3B")]
    Rule3B,
    #[serde(rename = "3C")]
    #[strum(serialize = "3C")]
    Rule3C,
    #[serde(rename = "3D")]
    #[strum(serialize = "3D")]
    Rule3D,
    #[serde(rename = "4-8")]
    #[strum(serialize = "4-8")]
    Rule4To8,
    #[serde(rename = "5")]
    #[strum(serialize = "5")]
    Rule5,
    #[serde(rename = "9")]
    #[strum(serialize = "9")]
    Rule9,
    #[serde(rename = "10")]
    #[strum(serialize = "10")]
    Rule10,
    #[serde(rename = "11")]
    #[strum(serialize = "11")]
    Rule11,
    /// The CRF analysis is supported by a cluster without the CRF tag.
    #[serde(rename = "crf-untagged")]
    #[strum(serialize = "crf-untagged")]
    CrfUntagged,
    #[serde(rename = "genotype")]
    #[strum(serialize = "genotype")]
    Genotype,
    #[serde(rename = "subtype")]
    #[strum(serialize = "subtype")]
    Subtype,
    #[serde(rename = "subtype-unassigned")]
    #[strum(serialize = "subtype-unassigned")]
    SubtypeUnassigned,
    #[serde(rename = "unassigned")]
    #[strum(serialize = "unassigned")]
    Unassigned,
}

// ----------------------------------------------------------------------------
// Conclusion
// ----------------------------------------------------------------------------

/// The cluster a sequence is assigned to.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Assignment {
    /// Cluster id, [`None`] if unassigned.
    pub id: Option<String>,
    /// Display name (ex. `HIV-1 Subtype B`, `Check the bootscan`).
    pub name: String,
}

impl Assignment {
    pub fn cluster(cluster: &Cluster) -> Self {
        Assignment { id: Some(cluster.id.clone()), name: cluster.name.clone() }
    }

    pub fn unassigned(name: impl Into<String>) -> Self {
        Assignment { id: None, name: name.into() }
    }

    /// Cluster id, or the [`UNASSIGNED`] sentinel.
    pub fn id_or_unassigned(&self) -> &str {
        self.id.as_deref().unwrap_or(UNASSIGNED)
    }
}

/// The final, justified outcome of a cascade for one sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Conclusion {
    pub assignment: Assignment,
    pub rule: Rule,
    /// Rule that passed the decision on to [`Conclusion::rule`] (ex. 2B into the 1-series).
    pub via: Option<Rule>,
    pub justification: String,
    /// The results the conclusion is based on.
    pub results: Vec<AnalysisResult>,
}

impl Conclusion {
    pub fn new(assignment: Assignment, rule: Rule, justification: impl Into<String>) -> Self {
        Conclusion { assignment, rule, via: None, justification: justification.into(), results: Vec::new() }
    }

    pub fn citing<I, R>(mut self, results: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<AnalysisResult>,
    {
        self.results = results.into_iter().map(Into::into).collect();
        self
    }

    pub fn via(mut self, rule: Rule) -> Self {
        self.via = Some(rule);
        self
    }
}

/// Every result gathered for one sequence, and the conclusion drawn from them.
#[derive(Clone, Debug, PartialEq)]
pub struct Assessment {
    pub results: Vec<AnalysisResult>,
    pub conclusion: Conclusion,
}

/// Join supported types as `name (percent%)`.
///
/// ## Examples
///
/// ```rust
/// use subtyper::cascade::recombinant_name;
/// use subtyper::cluster::Cluster;
/// use subtyper::result::SupportedType;
///
/// let (a, c) = (Cluster::new("A", "HIV-1 Subtype A"), Cluster::new("C", "HIV-1 Subtype C"));
/// let types = [
///     SupportedType { cluster: &a, supported: 11, window_count: 20 },
///     SupportedType { cluster: &c, supported: 7, window_count: 20 },
/// ];
/// assert_eq!(recombinant_name(&types), "Recombinant HIV-1 Subtype A (55%), HIV-1 Subtype C (35%)");
/// ```
pub fn recombinant_name(types: &[SupportedType<'_>]) -> String {
    let types = types.iter().map(|t| format!("{} ({}%)", t.cluster.name, t.percent())).join(", ");
    format!("Recombinant {types}")
}
