//! Named reference clusters (subtypes, genotypes, recombinant forms) that analyses score against.

#[cfg(test)]
mod tests;

use crate::error::Error;
use color_eyre::eyre::{Report, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// Tag for clusters that are circulating recombinant forms.
pub const CRF: &str = "CRF";

// ----------------------------------------------------------------------------
// Cluster
// ----------------------------------------------------------------------------

/// A named group of reference sequences, representing a subtype or lineage.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Cluster {
    /// Identifier, unique within one set of definitions (ex. `B`, `CRF01_AE`).
    pub id: String,
    /// Display name (ex. `HIV-1 Subtype B`).
    pub name: String,
    /// Free-form tags (ex. [`CRF`]).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Identifiers of the reference sequences that belong to this cluster.
    #[serde(default)]
    pub taxa: Vec<String>,
}

impl Display for Cluster {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Cluster {
    /// Create a new [`Cluster`] without tags or taxa.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper::cluster::{Cluster, CRF};
    ///
    /// let cluster = Cluster::new("B", "HIV-1 Subtype B").with_taxa(["B.FR.83", "B.US.86"]);
    /// assert_eq!(cluster.taxa.len(), 2);
    /// assert!(!cluster.is_crf());
    ///
    /// let crf = Cluster::new("CRF01_AE", "HIV-1 CRF 01_AE").with_tags([CRF]);
    /// assert!(crf.is_crf());
    /// ```
    pub fn new(id: &str, name: &str) -> Self {
        Cluster { id: id.to_string(), name: name.to_string(), ..Default::default() }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.tags = tags.into_iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_taxa<I, S>(mut self, taxa: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.taxa = taxa.into_iter().map(|t| t.to_string()).collect();
        self
    }

    /// Returns true if the cluster carries the tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns true if the cluster is a circulating recombinant form.
    pub fn is_crf(&self) -> bool {
        self.has_tag(CRF)
    }

    /// Returns true if the reference sequence `taxon` belongs to this cluster.
    pub fn contains(&self, taxon: &str) -> bool {
        self.taxa.iter().any(|t| t == taxon)
    }
}

// ----------------------------------------------------------------------------
// Cluster Catalogue
// ----------------------------------------------------------------------------

/// All clusters of one set of definitions, in definition order, with unique ids.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClusterCatalogue {
    clusters: Vec<Cluster>,
}

impl ClusterCatalogue {
    /// Create a catalogue, rejecting duplicated or empty cluster ids.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper::cluster::{Cluster, ClusterCatalogue};
    ///
    /// let catalogue = ClusterCatalogue::new(vec![Cluster::new("A", "A"), Cluster::new("B", "B")])?;
    /// assert_eq!(catalogue.ids(), ["A", "B"]);
    /// assert!(ClusterCatalogue::new(vec![Cluster::new("A", "A"), Cluster::new("A", "A2")]).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new(clusters: Vec<Cluster>) -> Result<Self, Report> {
        let mut seen = HashSet::new();
        for cluster in &clusters {
            if cluster.id.is_empty() {
                Err(Error::definition(format!("Cluster {:?} has an empty id.", cluster.name)))?
            }
            if !seen.insert(cluster.id.as_str()) {
                Err(Error::definition(format!("Cluster id {:?} is used more than once.", cluster.id)))?
            }
        }
        Ok(ClusterCatalogue { clusters })
    }

    /// Returns the cluster with this id.
    pub fn get(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// Returns the cluster ids, in definition order.
    pub fn ids(&self) -> Vec<&str> {
        self.clusters.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}
