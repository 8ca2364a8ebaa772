//! Typed outcomes of the analyses, read-only views over what the collaborators produced.

#[cfg(test)]
mod tests;

use crate::analysis::Kind;
use crate::cluster::Cluster;
use itertools::Itertools;

// ----------------------------------------------------------------------------
// Analysis Result
// ----------------------------------------------------------------------------

/// The result of one analysis, by kind.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisResult {
    Similarity(SimilarityResult),
    Phylo(PhyloResult),
    Scan(ScanResult),
}

impl AnalysisResult {
    /// Returns true if the result is usable on its own.
    pub fn have_support(&self) -> bool {
        match self {
            AnalysisResult::Similarity(result) => result.have_support(),
            AnalysisResult::Phylo(result) => result.have_support(),
            AnalysisResult::Scan(result) => result.have_support(),
        }
    }

    /// Id of the analysis that produced the result.
    pub fn analysis(&self) -> &str {
        match self {
            AnalysisResult::Similarity(result) => &result.analysis,
            AnalysisResult::Phylo(result) => &result.analysis,
            AnalysisResult::Scan(result) => &result.analysis,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            AnalysisResult::Similarity(_) => Kind::SimilaritySearch,
            AnalysisResult::Phylo(_) => Kind::PhyloCluster,
            AnalysisResult::Scan(_) => Kind::Scan,
        }
    }

    /// The best cluster, if the analysis produced one.
    pub fn best(&self) -> Option<&Cluster> {
        match self {
            AnalysisResult::Similarity(result) => result.cluster(),
            AnalysisResult::Phylo(result) => result.best(),
            AnalysisResult::Scan(result) => result.best(),
        }
    }

    /// Candidate cluster that was temporarily part of the analysis.
    pub fn candidate(&self) -> Option<&str> {
        match self {
            AnalysisResult::Similarity(_) => None,
            AnalysisResult::Phylo(result) => result.candidate.as_deref(),
            AnalysisResult::Scan(result) => result.candidate.as_deref(),
        }
    }
}

impl From<SimilarityResult> for AnalysisResult {
    fn from(result: SimilarityResult) -> Self {
        AnalysisResult::Similarity(result)
    }
}

impl From<PhyloResult> for AnalysisResult {
    fn from(result: PhyloResult) -> Self {
        AnalysisResult::Phylo(result)
    }
}

impl From<ScanResult> for AnalysisResult {
    fn from(result: ScanResult) -> Self {
        AnalysisResult::Scan(result)
    }
}

// ----------------------------------------------------------------------------
// Similarity Result
// ----------------------------------------------------------------------------

/// Top hit of a similarity search.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityResult {
    pub analysis: String,
    /// Cluster of the top hit, [`None`] if there were no hits.
    pub cluster: Option<Cluster>,
    /// Bit score of the top hit.
    pub score: f64,
    /// Score that must be exceeded for support.
    pub cutoff: f64,
    /// Reference sequence of the top hit.
    pub hit: Option<String>,
}

impl SimilarityResult {
    /// Returns true if a cluster was hit with a score above the cutoff.
    ///
    /// ```rust
    /// use subtyper::cluster::Cluster;
    /// use subtyper::result::SimilarityResult;
    ///
    /// let mut result = SimilarityResult {
    ///     analysis: "blast".to_string(),
    ///     cluster: Some(Cluster::new("3", "HCV Genotype 3")),
    ///     score: 200.0,
    ///     cutoff: 200.0,
    ///     hit: Some("3a.NZL1".to_string()),
    /// };
    /// assert!(!result.have_support());
    /// result.score = 200.5;
    /// assert!(result.have_support());
    /// ```
    pub fn have_support(&self) -> bool {
        self.cluster.is_some() && self.score > self.cutoff
    }

    pub fn cluster(&self) -> Option<&Cluster> {
        self.cluster.as_ref()
    }
}

// ----------------------------------------------------------------------------
// Phylo Result
// ----------------------------------------------------------------------------

/// Bootstrap placement of the query relative to the clusters of a phylo-cluster analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct PhyloResult {
    pub analysis: String,
    /// Cluster with the highest bootstrap support, [`None`] if no replicate supported any.
    pub best: Option<Cluster>,
    /// Percentage of replicates in which the query clusters with the best cluster.
    pub support: f64,
    /// Percentage of replicates in which the query is nested inside the best cluster.
    pub inner: f64,
    /// Percentage of replicates in which the query is the sister of the best cluster.
    pub outer: f64,
    /// Support (percentage) required for the result to be usable.
    pub cutoff: f64,
    /// Number of bootstrap replicates parsed.
    pub replicates: usize,
    /// Candidate cluster that was temporarily part of the analysis.
    pub candidate: Option<String>,
}

impl PhyloResult {
    /// Returns true if there is a best cluster with support at or above the cutoff.
    pub fn have_support(&self) -> bool {
        self.best.is_some() && self.support >= self.cutoff
    }

    pub fn best(&self) -> Option<&Cluster> {
        self.best.as_ref()
    }
}

// ----------------------------------------------------------------------------
// Scan Result
// ----------------------------------------------------------------------------

/// Window counts of one cluster in a bootscan.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowProfile {
    pub cluster: Cluster,
    /// Windows where the cluster was best with bootstrap support.
    pub supported: usize,
    /// Windows where the cluster was best without bootstrap support.
    pub unsupported: usize,
}

/// A cluster supported in a share of the bootscan windows.
#[derive(Clone, Debug, PartialEq)]
pub struct SupportedType<'r> {
    pub cluster: &'r Cluster,
    pub supported: usize,
    pub window_count: usize,
}

impl SupportedType<'_> {
    /// Fraction of windows supporting the cluster.
    pub fn fraction(&self) -> f64 {
        fraction(self.supported, self.window_count)
    }

    /// Percentage of windows supporting the cluster, rounded down.
    pub fn percent(&self) -> usize {
        match self.window_count {
            0 => 0,
            n => self.supported * 100 / n,
        }
    }
}

/// Sliding window profile of a query along the alignment.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanResult {
    pub analysis: String,
    /// Window counts for every cluster of the inner analysis, in definition order.
    pub profile: Vec<WindowProfile>,
    /// Number of windows analyzed.
    pub window_count: usize,
    /// Candidate cluster that was temporarily part of the scan.
    pub candidate: Option<String>,
    /// Fraction of windows at which a cluster counts as a supported type.
    pub type_threshold: f64,
    /// Fraction of windows the single supported type needs for overall support.
    pub cutoff: f64,
}

fn fraction(count: usize, total: usize) -> f64 {
    match total {
        0 => 0.0,
        total => count as f64 / total as f64,
    }
}

impl ScanResult {
    /// Fraction of windows in which cluster `id` was best with bootstrap support.
    pub fn bootscan_support(&self, id: &str) -> f64 {
        self.profile
            .iter()
            .find(|p| p.cluster.id == id)
            .map(|p| fraction(p.supported, self.window_count))
            .unwrap_or_default()
    }

    /// Fraction of windows in which cluster `id` was best without bootstrap support.
    pub fn bootscan_nosupport(&self, id: &str) -> f64 {
        self.profile
            .iter()
            .find(|p| p.cluster.id == id)
            .map(|p| fraction(p.unsupported, self.window_count))
            .unwrap_or_default()
    }

    /// Clusters, other than the candidate, supported in at least `type_threshold` of the windows.
    ///
    /// Ordered by descending support, ties in definition order.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper::cluster::Cluster;
    /// use subtyper::result::{ScanResult, WindowProfile};
    ///
    /// let profile = |id: &str, supported| WindowProfile { cluster: Cluster::new(id, id), supported, unsupported: 0 };
    /// let scan = ScanResult {
    ///     analysis: "scan".to_string(),
    ///     profile: vec![profile("A", 3), profile("B", 6), profile("C", 1), profile("D", 0)],
    ///     window_count: 10,
    ///     candidate: None,
    ///     type_threshold: 0.1,
    ///     cutoff: 0.9,
    /// };
    /// let types: Vec<_> = scan.supported_types().iter().map(|t| (t.cluster.id.as_str(), t.percent())).collect();
    /// assert_eq!(types, [("B", 60), ("A", 30), ("C", 10)]);
    /// assert!(!scan.have_support());
    /// ```
    pub fn supported_types(&self) -> Vec<SupportedType<'_>> {
        self.types(|p| self.candidate.as_deref() != Some(p.cluster.id.as_str()))
    }

    /// Clusters supported in at least `type_threshold` of the windows, the candidate included.
    ///
    /// ```rust
    /// use subtyper::cluster::Cluster;
    /// use subtyper::result::{ScanResult, WindowProfile};
    ///
    /// let profile = |id: &str, supported| WindowProfile { cluster: Cluster::new(id, id), supported, unsupported: 0 };
    /// let scan = ScanResult {
    ///     analysis: "crfscan".to_string(),
    ///     profile: vec![profile("B", 3), profile("AE", 7)],
    ///     window_count: 10,
    ///     candidate: Some("AE".to_string()),
    ///     type_threshold: 0.1,
    ///     cutoff: 0.9,
    /// };
    /// assert_eq!(scan.supported_types().len(), 1);
    /// let ids: Vec<_> = scan.reached_types().iter().map(|t| t.cluster.id.as_str()).collect();
    /// assert_eq!(ids, ["AE", "B"]);
    /// assert_eq!(scan.best().map(|c| c.id.as_str()), Some("AE"));
    /// ```
    pub fn reached_types(&self) -> Vec<SupportedType<'_>> {
        self.types(|_| true)
    }

    /// The cluster supported in most windows, the candidate included.
    pub fn best(&self) -> Option<&Cluster> {
        self.reached_types().first().map(|t| t.cluster)
    }

    fn types<F>(&self, keep: F) -> Vec<SupportedType<'_>>
    where
        F: Fn(&WindowProfile) -> bool,
    {
        self.profile
            .iter()
            .filter(|p| keep(p))
            .filter(|p| self.reaches_threshold(p))
            .map(|p| SupportedType {
                cluster: &p.cluster,
                supported: p.supported,
                window_count: self.window_count,
            })
            // stable sort, ties keep definition order
            .sorted_by(|a, b| b.supported.cmp(&a.supported))
            .collect()
    }

    /// Returns true if exactly one cluster reaches the type threshold, and it is supported in at
    /// least `cutoff` of the windows. While a candidate is active, that cluster must be the candidate.
    pub fn have_support(&self) -> bool {
        let reached = self.profile.iter().filter(|p| self.reaches_threshold(p)).collect_vec();
        match reached.as_slice() {
            [single] => {
                fraction(single.supported, self.window_count) >= self.cutoff
                    && self.candidate.as_ref().map_or(true, |c| *c == single.cluster.id)
            }
            _ => false,
        }
    }

    fn reaches_threshold(&self, profile: &WindowProfile) -> bool {
        profile.supported > 0 && fraction(profile.supported, self.window_count) >= self.type_threshold
    }
}
