use crate::analysis::{Analyses, Kind};
use crate::cluster::Cluster;
use crate::error::Error;
use crate::result::PhyloResult;
use crate::runner::{definition, Collaborator, Runner, QUERY};
use crate::sequence::Record;
use color_eyre::eyre::{Report, Result, WrapErr};
use color_eyre::Help;
use log::{debug, warn};
use std::collections::HashSet;
use std::ops::Range;
use subtyper_phylo::{newick, Branch, FromNewick, Phylogeny, Placement};

/// Placement counts of the query relative to one cluster, over all replicates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementCounts {
    pub inside: usize,
    pub sister: usize,
}

/// Count the placement of `query` relative to each cluster, over every replicate tree.
///
/// ## Examples
///
/// ```rust
/// use subtyper::cluster::Cluster;
/// use subtyper::runner::phylo::count_placements;
///
/// let clusters = [
///     Cluster::new("A", "A").with_taxa(["A1", "A2"]),
///     Cluster::new("B", "B").with_taxa(["B1", "B2"]),
/// ];
/// let trees = "((A1,A2),(B1,(B2,QUERY)));\n(((A1,A2),(C1,C2)),((B1,B2),QUERY));\n((A1,QUERY),(A2,(B1,B2)));";
/// let (replicates, counts) = count_placements(trees, "QUERY", &clusters.iter().collect::<Vec<_>>())?;
/// assert_eq!(replicates, 3);
/// assert_eq!((counts[1].inside, counts[1].sister), (1, 1));
/// assert_eq!((counts[0].inside, counts[0].sister), (1, 0));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn count_placements(
    trees: &str,
    query: &str,
    clusters: &[&Cluster],
) -> Result<(usize, Vec<PlacementCounts>), Report> {
    let query = query.to_string();
    let mut counts = vec![PlacementCounts::default(); clusters.len()];
    let trees = newick::split_trees(trees);

    for (i, tree) in trees.iter().enumerate() {
        let phylogeny: Phylogeny<String, Branch> = Phylogeny::from_newick(tree)
            .wrap_err_with(|| format!("Failed to parse bootstrap replicate {}.", i + 1))?;
        let splits = phylogeny.splits()?;
        for (cluster, count) in clusters.iter().zip(counts.iter_mut()) {
            match splits.placement(&query, &cluster.taxa)? {
                Placement::Inside => count.inside += 1,
                Placement::Sister => count.sister += 1,
                Placement::Outside => (),
            }
        }
    }

    Ok((trees.len(), counts))
}

/// Convert a count of replicates to a percentage.
fn percent(count: usize, replicates: usize) -> f64 {
    match replicates {
        0 => 0.0,
        n => 100.0 * count as f64 / n as f64,
    }
}

impl<C> Runner<C>
where
    C: Collaborator,
{
    /// Place the query in the reference alignment of a phylo-cluster analysis.
    pub fn phylo(
        &self,
        analyses: &Analyses,
        id: &str,
        query: &Record,
    ) -> Result<PhyloResult, Report> {
        self.phylo_columns(analyses, id, query, None)
    }

    /// Place the query in the reference alignment of a phylo-cluster analysis, optionally
    /// restricted to a range of alignment columns.
    ///
    /// The alignment handed to the tree builder holds the members of the analysis clusters
    /// (candidate included), the outgroup, and the query labelled [`QUERY`].
    pub fn phylo_columns(
        &self,
        analyses: &Analyses,
        id: &str,
        query: &Record,
        columns: Option<Range<usize>>,
    ) -> Result<PhyloResult, Report> {
        let definition = definition(analyses, id, Kind::PhyloCluster)?;
        let cutoff = definition.cutoff.unwrap_or(self.cascade.support_threshold);
        let clusters = analyses.clusters(id)?;

        if definition.reference.is_empty() {
            Err(Error::analysis(id, "No reference alignment is loaded."))?
        }
        if query.aligned_length() != definition.columns() {
            Err(Error::analysis(
                id,
                format!(
                    "Query {} has {} columns, the reference alignment has {}.",
                    query.id,
                    query.aligned_length(),
                    definition.columns()
                ),
            ))
            .suggestion("Is the query aligned to the reference alignment?")?
        }

        // reference taxa, in alignment order
        let taxa: HashSet<&str> = clusters
            .iter()
            .flat_map(|c| c.taxa.iter())
            .chain(definition.outgroup.iter())
            .map(String::as_str)
            .collect();
        let mut alignment: Vec<Record> =
            definition.reference.iter().filter(|r| taxa.contains(r.id.as_str())).cloned().collect();
        if alignment.len() < taxa.len() {
            warn!("Analysis {id}: {} cluster taxa are missing from the alignment", taxa.len() - alignment.len());
        }
        alignment.push(query.renamed(QUERY));
        if let Some(columns) = &columns {
            alignment = alignment.iter().map(|r| r.columns(columns.clone())).collect();
        }

        let output = self
            .collaborator
            .bootstrap(&alignment)
            .wrap_err_with(|| Error::analysis(id, "Tree building failed."))?;
        let (replicates, counts) = count_placements(&output, QUERY, &clusters)
            .wrap_err_with(|| Error::analysis(id, "Unparsable bootstrap trees."))?;
        if replicates == 0 {
            Err(Error::analysis(id, "The tree builder returned no bootstrap trees."))?
        }

        // highest support, first cluster on ties
        let best = counts
            .iter()
            .enumerate()
            .filter(|(_, c)| c.inside + c.sister > 0)
            .fold(None, |best: Option<(usize, &PlacementCounts)>, (i, c)| match best {
                Some((_, b)) if b.inside + b.sister >= c.inside + c.sister => best,
                _ => Some((i, c)),
            });

        let result = match best {
            Some((i, c)) => PhyloResult {
                analysis: id.to_string(),
                best: Some(clusters[i].clone()),
                support: percent(c.inside + c.sister, replicates),
                inner: percent(c.inside, replicates),
                outer: percent(c.sister, replicates),
                cutoff,
                replicates,
                candidate: definition.candidate.clone(),
            },
            None => PhyloResult {
                analysis: id.to_string(),
                best: None,
                support: 0.0,
                inner: 0.0,
                outer: 0.0,
                cutoff,
                replicates,
                candidate: definition.candidate.clone(),
            },
        };
        debug!(
            "{}: analysis {id} best {:?} support {} inner {} outer {}",
            query.id,
            result.best.as_ref().map(|c| &c.id),
            result.support,
            result.inner,
            result.outer
        );

        Ok(result)
    }
}
