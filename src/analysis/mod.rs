//! Declarative analysis definitions, loaded once per tool directory.
//!
//! A `definitions.json` file lists the [clusters](crate::cluster::Cluster) of a virus and the
//! analyses that score a query against them:
//!
//! - `similarity-search`: one search against a reference database.
//! - `phylo-cluster`: bootstrap placement of the query in a reference alignment.
//! - `scan`: a sliding window bootscan, wrapping a `phylo-cluster` analysis.


use crate::cluster::{Cluster, ClusterCatalogue};
use crate::error::Error;
use crate::sequence::{self, Record};
use crate::tool::Virus;
use color_eyre::eyre::{Report, Result, WrapErr};
use color_eyre::Help;
use log::debug;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the definitions file inside a tool directory.
pub const DEFINITIONS_FILE: &str = "definitions.json";

// ----------------------------------------------------------------------------
// Kind
// ----------------------------------------------------------------------------

/// The kind of an analysis, which decides the runner and the result type.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    SimilaritySearch,
    PhyloCluster,
    Scan,
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Kind::SimilaritySearch => "similarity-search",
            Kind::PhyloCluster => "phylo-cluster",
            Kind::Scan => "scan",
        };
        write!(f, "{kind}")
    }
}

// ----------------------------------------------------------------------------
// Analysis Definition
// ----------------------------------------------------------------------------

/// One named analysis.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AnalysisDefinition {
    pub id: String,
    pub kind: Kind,
    /// Ids of the clusters the analysis scores against, in order.
    #[serde(default)]
    pub clusters: Vec<String>,
    /// Inner `phylo-cluster` analysis of a `scan`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    /// Reference alignment (fasta) of a `phylo-cluster` analysis, relative to the tool directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<PathBuf>,
    /// Reference database of a `similarity-search` analysis, relative to the tool directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Support cutoff, overriding the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<f64>,
    /// Scan window size in alignment columns, overriding the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
    /// Scan step size in alignment columns, overriding the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    /// Reference taxa that are always included in the written alignment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outgroup: Vec<String>,
    /// Temporary candidate cluster, see [`with_candidate_cluster`].
    #[serde(skip)]
    pub candidate: Option<String>,
    /// Records of the reference alignment, loaded once and shared between clones.
    #[serde(skip)]
    pub reference: Arc<Vec<Record>>,
}

impl AnalysisDefinition {
    /// Create a definition with no clusters, references, or overrides.
    pub fn new(id: &str, kind: Kind) -> Self {
        AnalysisDefinition {
            id: id.to_string(),
            kind,
            clusters: Vec::new(),
            analysis: None,
            alignment: None,
            database: None,
            cutoff: None,
            window: None,
            step: None,
            outgroup: Vec::new(),
            candidate: None,
            reference: Arc::new(Vec::new()),
        }
    }

    pub fn with_clusters<I, S>(mut self, clusters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.clusters = clusters.into_iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_reference(mut self, reference: Vec<Record>) -> Self {
        self.reference = Arc::new(reference);
        self
    }

    /// Number of columns in the reference alignment.
    pub fn columns(&self) -> usize {
        self.reference.first().map(|r| r.aligned_length()).unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------
// Analyses
// ----------------------------------------------------------------------------

/// Registry of named analyses and the cluster catalogue they refer to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Analyses {
    catalogue: ClusterCatalogue,
    definitions: Vec<AnalysisDefinition>,
}

impl Analyses {
    /// Create a validated registry.
    ///
    /// - Analysis ids are unique.
    /// - Every cluster an analysis refers to exists in the catalogue.
    /// - A `scan` wraps an existing `phylo-cluster` analysis.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper::analysis::{Analyses, AnalysisDefinition, Kind};
    /// use subtyper::cluster::{Cluster, ClusterCatalogue};
    ///
    /// let catalogue = ClusterCatalogue::new(vec![Cluster::new("A", "A"), Cluster::new("B", "B")])?;
    /// let pure = AnalysisDefinition::new("pure", Kind::PhyloCluster).with_clusters(["A", "B"]);
    /// let mut scan = AnalysisDefinition::new("scan", Kind::Scan);
    /// scan.analysis = Some("pure".to_string());
    ///
    /// let analyses = Analyses::new(catalogue.clone(), vec![pure.clone(), scan.clone()])?;
    /// assert_eq!(analyses.cluster_ids("pure")?, ["A", "B"]);
    ///
    /// // unknown cluster
    /// let bad = AnalysisDefinition::new("bad", Kind::PhyloCluster).with_clusters(["C"]);
    /// assert!(Analyses::new(catalogue.clone(), vec![bad]).is_err());
    /// // scan without its inner analysis
    /// assert!(Analyses::new(catalogue, vec![scan]).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new(
        catalogue: ClusterCatalogue,
        definitions: Vec<AnalysisDefinition>,
    ) -> Result<Self, Report> {
        let mut seen = HashSet::new();
        for definition in &definitions {
            if !seen.insert(definition.id.as_str()) {
                Err(Error::definition(format!(
                    "Analysis id {:?} is used more than once.",
                    definition.id
                )))?
            }
            if let Some(missing) = definition.clusters.iter().find(|c| catalogue.get(c).is_none()) {
                Err(Error::definition(format!(
                    "Analysis {:?} refers to unknown cluster {missing:?}.",
                    definition.id
                )))?
            }
            if let Some(missing) = definition.outgroup.iter().find(|t| {
                !definition.reference.is_empty() && !definition.reference.iter().any(|r| &r.id == *t)
            }) {
                Err(Error::definition(format!(
                    "Outgroup taxon {missing:?} of analysis {:?} is not in its alignment.",
                    definition.id
                )))?
            }
        }

        // scans must wrap a phylo-cluster analysis
        for definition in definitions.iter().filter(|d| d.kind == Kind::Scan) {
            let inner = definition.analysis.as_deref().unwrap_or_default();
            let inner_kind = definitions.iter().find(|d| d.id == inner).map(|d| d.kind);
            if inner_kind != Some(Kind::PhyloCluster) {
                Err(Error::definition(format!(
                    "Scan {:?} must wrap a phylo-cluster analysis, found {inner:?}.",
                    definition.id
                )))?
            }
        }

        Ok(Analyses { catalogue, definitions })
    }

    pub fn catalogue(&self) -> &ClusterCatalogue {
        &self.catalogue
    }

    /// Returns the analysis with this id.
    pub fn get(&self, id: &str) -> Result<&AnalysisDefinition, Report> {
        self.definitions
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::analysis(id, "No analysis with this id is defined."))
            .with_suggestion(|| format!("Available analyses: {}", self.ids().join(", ")))
    }

    /// Returns the analysis ids, in definition order.
    pub fn ids(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.id.as_str()).collect()
    }

    /// Returns the cluster ids of an analysis, including any active candidate.
    pub fn cluster_ids(&self, id: &str) -> Result<Vec<&str>, Report> {
        Ok(self.get(id)?.clusters.iter().map(String::as_str).collect())
    }

    /// Returns the clusters of an analysis, in order, including any active candidate.
    pub fn clusters(&self, id: &str) -> Result<Vec<&Cluster>, Report> {
        self.get(id)?
            .clusters
            .iter()
            .map(|c| {
                self.catalogue.get(c).ok_or_else(|| {
                    Error::definition(format!("Analysis {id:?} refers to unknown cluster {c:?}."))
                        .into()
                })
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisDefinition> {
        self.definitions.iter()
    }

    /// A copy of the registry with a reference taxon removed from every cluster and outgroup.
    ///
    /// Used to scan a reference against the other references.
    pub fn without_taxon(&self, taxon: &str) -> Result<Analyses, Report> {
        let clusters = self
            .catalogue
            .iter()
            .cloned()
            .map(|mut cluster| {
                cluster.taxa.retain(|t| t != taxon);
                cluster
            })
            .collect();
        let definitions = self
            .definitions
            .iter()
            .cloned()
            .map(|mut definition| {
                definition.outgroup.retain(|t| t != taxon);
                definition
            })
            .collect();
        Analyses::new(ClusterCatalogue::new(clusters)?, definitions)
    }

    fn position(&self, id: &str) -> Result<usize, Report> {
        self.definitions
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::analysis(id, "No analysis with this id is defined.").into())
    }
}

// ----------------------------------------------------------------------------
// Candidate Cluster
// ----------------------------------------------------------------------------

/// Restores the cluster lists and candidate markers of a set of analyses when dropped.
struct CandidateGuard<'a> {
    analyses: &'a mut Analyses,
    snapshot: Vec<(usize, Vec<String>, Option<String>)>,
}

impl Drop for CandidateGuard<'_> {
    fn drop(&mut self) {
        for (i, clusters, candidate) in self.snapshot.drain(..) {
            let definition = &mut self.analyses.definitions[i];
            definition.clusters = clusters;
            definition.candidate = candidate;
        }
    }
}

/// Run `f` with `cluster` temporarily added to the analyses named by `ids`.
///
/// The cluster is appended to each cluster list (unless already present) and marked as the
/// analysis candidate. Every cluster list and candidate marker is restored before returning,
/// whether `f` returns normally, returns an error, or panics.
///
/// Fails without running `f` if an analysis or the cluster is unknown.
///
/// ## Examples
///
/// ```rust
/// use subtyper::analysis::{with_candidate_cluster, Analyses, AnalysisDefinition, Kind};
/// use subtyper::cluster::{Cluster, ClusterCatalogue};
///
/// let catalogue = ClusterCatalogue::new(vec![Cluster::new("B", "B"), Cluster::new("CRF01_AE", "CRF01_AE")])?;
/// let pure = AnalysisDefinition::new("pure", Kind::PhyloCluster).with_clusters(["B"]);
/// let mut analyses = Analyses::new(catalogue, vec![pure])?;
///
/// let during = with_candidate_cluster(&mut analyses, &["pure"], "CRF01_AE", |analyses| {
///     analyses.cluster_ids("pure").map(|ids| ids.join(","))
/// })??;
/// assert_eq!(during, "B,CRF01_AE");
/// assert_eq!(analyses.cluster_ids("pure")?, ["B"]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn with_candidate_cluster<T, F>(
    analyses: &mut Analyses,
    ids: &[&str],
    cluster: &str,
    f: F,
) -> Result<T, Report>
where
    F: FnOnce(&Analyses) -> T,
{
    if analyses.catalogue.get(cluster).is_none() {
        Err(Error::definition(format!("Candidate cluster {cluster:?} is not defined.")))?
    }
    let positions = ids.iter().map(|id| analyses.position(id)).collect::<Result<Vec<_>, _>>()?;

    let mut guard = CandidateGuard { analyses, snapshot: Vec::new() };
    for i in positions {
        let definition = &mut guard.analyses.definitions[i];
        // the same analysis may be named twice, keep the first snapshot
        if !guard.snapshot.iter().any(|(j, _, _)| *j == i) {
            guard.snapshot.push((i, definition.clusters.clone(), definition.candidate.clone()));
        }
        if !definition.clusters.iter().any(|c| c == cluster) {
            definition.clusters.push(cluster.to_string());
        }
        definition.candidate = Some(cluster.to_string());
        debug!("Added candidate cluster {cluster} to analysis {}", definition.id);
    }

    Ok(f(&*guard.analyses))
}

// ----------------------------------------------------------------------------
// Definitions File
// ----------------------------------------------------------------------------

/// Contents of a `definitions.json` file.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Definitions {
    pub virus: Virus,
    /// Requirement on the version of this crate (ex. `>=0.1.0`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub clusters: Vec<Cluster>,
    pub analyses: Vec<AnalysisDefinition>,
}

impl Definitions {
    /// Reads [`Definitions`] from a JSON file.
    pub fn read<P>(path: &P) -> Result<Definitions, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let input = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read definitions: {path:?}."))?;
        let definitions = serde_json::from_str(&input)
            .map_err(|e| Error::definition(e.to_string()))
            .wrap_err_with(|| format!("Failed to deserialize definitions: {path:?}"))?;
        Ok(definitions)
    }

    /// Write [`Definitions`] to a JSON file.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        crate::utils::create_parent_dir(path)?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err(format!("Failed to serialize definitions: {path:?}"))?;
        std::fs::write(path, output).wrap_err(format!("Failed to write definitions: {path:?}"))?;
        Ok(())
    }

    /// Check the version requirement against the version of this crate.
    pub fn check_version(&self) -> Result<(), Report> {
        let Some(requirement) = &self.version else { return Ok(()) };
        let requirement = VersionReq::parse(requirement)
            .map_err(|e| Error::definition(format!("Invalid version requirement {requirement:?}: {e}")))?;
        let current = Version::parse(env!("CARGO_PKG_VERSION"))?;
        if !requirement.matches(&current) {
            Err(Error::definition(format!(
                "Definitions require version {requirement}, but this is version {current}."
            )))
            .suggestion("Use definitions that are compatible with this version.")?
        }
        Ok(())
    }

    /// Load the definitions of a tool directory, and the reference alignments they refer to.
    ///
    /// Alignment and database paths are resolved relative to the directory.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper::analysis::Definitions;
    ///
    /// let dir = tempfile::tempdir()?;
    /// std::fs::write(dir.path().join("pure.fasta"), ">A1\nAAAA\n>B1\nCCCC\n")?;
    /// std::fs::write(dir.path().join("definitions.json"), r#"{
    ///   "virus": "hiv-1",
    ///   "clusters": [
    ///     { "id": "A", "name": "HIV-1 Subtype A", "taxa": ["A1"] },
    ///     { "id": "B", "name": "HIV-1 Subtype B", "taxa": ["B1"] }
    ///   ],
    ///   "analyses": [
    ///     { "id": "pure", "kind": "phylo-cluster", "clusters": ["A", "B"], "alignment": "pure.fasta" }
    ///   ]
    /// }"#)?;
    ///
    /// let (virus, analyses) = Definitions::load(&dir.path())?;
    /// assert_eq!(virus.to_string(), "hiv-1");
    /// assert_eq!(analyses.get("pure")?.columns(), 4);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn load<P>(dir: &P) -> Result<(Virus, Analyses), Report>
    where
        P: AsRef<Path> + Debug,
    {
        let dir = dir.as_ref();
        let definitions = Definitions::read(&dir.join(DEFINITIONS_FILE))?;
        definitions.check_version()?;

        let mut analyses = definitions.analyses;
        for analysis in analyses.iter_mut() {
            analysis.database = analysis.database.as_ref().map(|p| dir.join(p));
            match (analysis.kind, analysis.alignment.clone()) {
                (Kind::PhyloCluster, Some(alignment)) => {
                    let path = dir.join(alignment);
                    let reference = load_alignment(&analysis.id, &path)?;
                    analysis.alignment = Some(path);
                    analysis.reference = Arc::new(reference);
                }
                (Kind::PhyloCluster, None) => Err(Error::definition(format!(
                    "Phylo-cluster analysis {:?} has no alignment.",
                    analysis.id
                )))?,
                (Kind::SimilaritySearch, _) if analysis.database.is_none() => {
                    Err(Error::definition(format!(
                        "Similarity-search analysis {:?} has no database.",
                        analysis.id
                    )))?
                }
                _ => (),
            }
        }

        let catalogue = ClusterCatalogue::new(definitions.clusters)?;
        let analyses = Analyses::new(catalogue, analyses)?;
        Ok((definitions.virus, analyses))
    }
}

/// Read a reference alignment, checking that every record has the same number of columns.
fn load_alignment(id: &str, path: &Path) -> Result<Vec<Record>, Report> {
    let reference = sequence::read(&path)
        .map_err(|e| Error::definition(format!("Failed to read alignment of {id:?}: {e}")))?;
    let columns = reference.first().map(|r| r.aligned_length()).unwrap_or_default();
    if reference.is_empty() || columns == 0 {
        Err(Error::definition(format!("Alignment of {id:?} is empty: {path:?}")))?
    }
    if let Some(record) = reference.iter().find(|r| r.aligned_length() != columns) {
        Err(Error::definition(format!(
            "Alignment of {id:?} is not aligned, {} has {} columns instead of {columns}.",
            record.id,
            record.aligned_length()
        )))?
    }
    debug!("Loaded {} reference sequences for analysis {id}: {path:?}", reference.len());
    Ok(reference)
}
