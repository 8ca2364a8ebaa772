//! Toy HIV-1 and HCV tools, with a [`Collaborator`] that needs no external programs.
//!
//! Reference sequences are 1000 columns of a single base per cluster, which makes the
//! distance between a query and every reference easy to reason about:
//!
//! | Virus | Cluster    | Reference taxa                                            |
//! |-------|------------|-----------------------------------------------------------|
//! | hiv-1 | `A`        | `A.1` all `A`, `A.2` with a leading `T`                    |
//! | hiv-1 | `B`        | `B.1` all `C`, `B.2` with a leading `T`                    |
//! | hiv-1 | `C`        | `C.1` all `G`, `C.2` with a leading `T`                    |
//! | hiv-1 | `CRF01_AE` | `AE.1` `A` then `C` halves with a `T` every 10 columns      |
//! | hcv   | `1` / `1a` | `1a.1` all `A`                                            |
//! | hcv   | `1` / `1b` | `1b.1` `A` then `T` halves                                 |
//! | hcv   | `2`, `3`   | `2a.1` all `C`, `3a.1` all `G`                             |

use crate::analysis::{Analyses, AnalysisDefinition, Definitions, Kind};
use crate::cascade::CascadeConfig;
use crate::cluster::{Cluster, ClusterCatalogue, CRF};
use crate::config::ScanConfig;
use crate::runner::{Collaborator, Runner, QUERY};
use crate::sequence::{self, Alphabet, Record};
use crate::tool::{Tool, Virus};
use color_eyre::eyre::{eyre, Report, Result};
use itertools::Itertools;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of alignment columns of the toy references.
pub const COLUMNS: usize = 1000;
/// Number of bootstrap replicates the toy tree builder returns.
pub const REPLICATES: usize = 10;

type Search = dyn Fn(&Record, &Path) -> Result<String, Report> + Send + Sync;
type Bootstrap = dyn Fn(&[Record]) -> Result<String, Report> + Send + Sync;

// ----------------------------------------------------------------------------
// Scripted Collaborator
// ----------------------------------------------------------------------------

/// A [`Collaborator`] backed by closures.
#[derive(Clone)]
pub struct Scripted {
    search: Arc<Search>,
    bootstrap: Arc<Bootstrap>,
}

impl Debug for Scripted {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Scripted")
    }
}

impl Scripted {
    pub fn new<S, B>(search: S, bootstrap: B) -> Self
    where
        S: Fn(&Record, &Path) -> Result<String, Report> + Send + Sync + 'static,
        B: Fn(&[Record]) -> Result<String, Report> + Send + Sync + 'static,
    {
        Scripted { search: Arc::new(search), bootstrap: Arc::new(bootstrap) }
    }

    /// Searches `database`, and builds trees that join the query to its nearest reference.
    ///
    /// References are grouped into clades by the prefix of their id before the first `.`.
    pub fn nearest_neighbour(database: Vec<Record>) -> Self {
        Scripted::new(
            move |query, _| Ok(search_hits(query, &database)),
            |alignment| nearest_neighbour_trees(alignment, REPLICATES),
        )
    }
}

impl Collaborator for Scripted {
    fn search(&self, query: &Record, database: &Path) -> Result<String, Report> {
        (self.search)(query, database)
    }

    fn bootstrap(&self, alignment: &[Record]) -> Result<String, Report> {
        (self.bootstrap)(alignment)
    }
}

/// Count the columns in which the query has a base, and the reference differs.
fn distance(query: &Record, reference: &Record) -> usize {
    query
        .sequence
        .iter()
        .zip(reference.sequence.iter())
        .filter(|(q, _)| !Alphabet::Deletion.contains(**q) && !Alphabet::Missing.contains(**q))
        .filter(|(q, r)| !q.eq_ignore_ascii_case(r))
        .count()
}

/// Tabular hits, scoring one bit per identical base.
fn search_hits(query: &Record, database: &[Record]) -> String {
    database
        .iter()
        .map(|reference| {
            let reference = reference.ungapped();
            let score = query.sequence.iter().zip(reference.sequence.iter()).filter(|(q, r)| q == r).count();
            (reference.id, score)
        })
        .filter(|(_, score)| *score > 0)
        .map(|(subject, score)| {
            format!("{}\t{subject}\t100.0\t{score}\t0\t0\t1\t{score}\t1\t{score}\t0.0\t{score}\n", query.id)
        })
        .join("")
}

/// Newick replicates with the query paired to its nearest reference, the first one on ties.
///
/// ## Examples
///
/// ```rust
/// use subtyper::sequence::Record;
/// use subtyper::tool::toy::nearest_neighbour_trees;
///
/// let alignment = [
///     Record::new("A.1", "AAAA"),
///     Record::new("A.2", "AAAT"),
///     Record::new("B.1", "CCCC"),
///     Record::new("C.1", "GGGG"),
///     Record::new("QUERY", "AATT"),
/// ];
/// assert_eq!(nearest_neighbour_trees(&alignment, 2)?, "((A.1,(A.2,QUERY)),B.1,C.1);\n((A.1,(A.2,QUERY)),B.1,C.1);");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn nearest_neighbour_trees(alignment: &[Record], replicates: usize) -> Result<String, Report> {
    let query = alignment
        .iter()
        .find(|r| r.id == QUERY)
        .ok_or_else(|| eyre!("The alignment has no {QUERY} sequence."))?;
    let references = alignment.iter().filter(|r| r.id != QUERY).collect_vec();
    let nearest = references
        .iter()
        .min_by_key(|r| distance(query, r))
        .ok_or_else(|| eyre!("The alignment has no reference sequences."))?;

    let clades = references
        .iter()
        .chunk_by(|r| r.id.split('.').next().unwrap_or_default().to_string())
        .into_iter()
        .map(|(_, members)| {
            let members = members.map(|r| r.id.as_str()).collect_vec();
            let (paired, others): (Vec<&str>, Vec<&str>) = members.into_iter().partition(|id| *id == nearest.id);
            match (paired.is_empty(), others.as_slice()) {
                (true, [single]) => single.to_string(),
                (true, _) => format!("({})", others.join(",")),
                (false, []) => format!("({},{QUERY})", nearest.id),
                (false, _) => format!("({},({},{QUERY}))", others.join(","), nearest.id),
            }
        })
        .join(",");

    Ok(vec![format!("({clades});"); replicates].join("\n"))
}

// ----------------------------------------------------------------------------
// Definitions
// ----------------------------------------------------------------------------

fn uniform(base: char) -> String {
    base.to_string().repeat(COLUMNS)
}

/// Replace the first base.
fn marked(sequence: &str) -> String {
    format!("T{}", &sequence[1..])
}

fn halves(first: char, second: char) -> String {
    format!("{}{}", first.to_string().repeat(COLUMNS / 2), second.to_string().repeat(COLUMNS - COLUMNS / 2))
}

/// The reference sequences of a toy tool.
pub fn references(virus: Virus) -> Vec<Record> {
    match virus {
        Virus::Hiv1 => {
            let crf: String =
                halves('A', 'C').chars().enumerate().map(|(i, b)| if i % 10 == 5 { 'T' } else { b }).collect();
            vec![
                Record::new("A.1", &uniform('A')),
                Record::new("A.2", &marked(&uniform('A'))),
                Record::new("B.1", &uniform('C')),
                Record::new("B.2", &marked(&uniform('C'))),
                Record::new("C.1", &uniform('G')),
                Record::new("C.2", &marked(&uniform('G'))),
                Record::new("AE.1", &crf),
                Record::new("AE.2", &marked(&crf)),
            ]
        }
        Virus::Hcv => vec![
            Record::new("1a.1", &uniform('A')),
            Record::new("1b.1", &halves('A', 'T')),
            Record::new("2a.1", &uniform('C')),
            Record::new("3a.1", &uniform('G')),
        ],
    }
}

/// Name of the reference alignment file of a toy tool.
pub fn alignment_file(virus: Virus) -> &'static str {
    match virus {
        Virus::Hiv1 => "hiv-1.fasta",
        Virus::Hcv => "hcv.fasta",
    }
}

fn phylo(id: &str, clusters: &[&str], outgroup: &[&str], alignment: &str) -> AnalysisDefinition {
    let mut definition = AnalysisDefinition::new(id, Kind::PhyloCluster).with_clusters(clusters);
    definition.alignment = Some(PathBuf::from(alignment));
    definition.outgroup = outgroup.iter().map(|t| t.to_string()).collect();
    definition
}

fn scan(id: &str, inner: &str) -> AnalysisDefinition {
    let mut definition = AnalysisDefinition::new(id, Kind::Scan);
    definition.analysis = Some(inner.to_string());
    definition
}

/// The definitions of a toy tool.
pub fn definitions(virus: Virus) -> Definitions {
    let alignment = alignment_file(virus);
    let (clusters, analyses) = match virus {
        Virus::Hiv1 => {
            let clusters = vec![
                Cluster::new("A", "HIV-1 Subtype A").with_taxa(["A.1", "A.2"]),
                Cluster::new("B", "HIV-1 Subtype B").with_taxa(["B.1", "B.2"]),
                Cluster::new("C", "HIV-1 Subtype C").with_taxa(["C.1", "C.2"]),
                Cluster::new("CRF01_AE", "HIV-1 CRF 01_AE").with_tags([CRF]).with_taxa(["AE.1", "AE.2"]),
            ];
            let pure = ["A", "B", "C"];
            let analyses = vec![
                phylo("pure", &pure, &[], alignment),
                phylo("scan-pure", &pure, &[], alignment),
                scan("scan", "scan-pure"),
                phylo("crf", &["CRF01_AE"], &["A.1", "B.1", "C.1"], alignment),
                phylo("crfscan-pure", &pure, &[], alignment),
                scan("crfscan", "crfscan-pure"),
                phylo("pure-puzzle", &pure, &[], alignment),
                scan("scan-pure-self", "scan-pure"),
            ];
            (clusters, analyses)
        }
        Virus::Hcv => {
            let clusters = vec![
                Cluster::new("1", "HCV Genotype 1").with_taxa(["1a.1", "1b.1"]),
                Cluster::new("2", "HCV Genotype 2").with_taxa(["2a.1"]),
                Cluster::new("3", "HCV Genotype 3").with_taxa(["3a.1"]),
                Cluster::new("1a", "HCV Subtype 1a").with_taxa(["1a.1"]),
                Cluster::new("1b", "HCV Subtype 1b").with_taxa(["1b.1"]),
            ];
            let mut blast = AnalysisDefinition::new("blast", Kind::SimilaritySearch).with_clusters(["1", "2", "3"]);
            blast.database = Some(PathBuf::from(alignment));
            let analyses = vec![blast, phylo("subtype", &["1a", "1b"], &["2a.1", "3a.1"], alignment)];
            (clusters, analyses)
        }
    };

    Definitions { virus, version: Some(format!(">={}", env!("CARGO_PKG_VERSION"))), clusters, analyses }
}

/// Write a toy tool directory, with its definitions and reference alignment.
pub fn write<P>(virus: Virus, dir: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    let dir = dir.as_ref();
    definitions(virus).write(&dir.join(crate::analysis::DEFINITIONS_FILE))?;
    sequence::write(&references(virus), &dir.join(alignment_file(virus)))?;
    Ok(())
}

/// The analyses of a toy tool, with the references loaded in memory.
pub fn analyses(virus: Virus) -> Result<Analyses, Report> {
    let definitions = definitions(virus);
    let reference = references(virus);
    let analyses = definitions
        .analyses
        .into_iter()
        .map(|analysis| match analysis.kind {
            Kind::PhyloCluster => analysis.with_reference(reference.clone()),
            _ => analysis,
        })
        .collect();
    Analyses::new(ClusterCatalogue::new(definitions.clusters)?, analyses)
}

/// The toy collaborator for a virus.
pub fn collaborator(virus: Virus) -> Scripted {
    Scripted::nearest_neighbour(references(virus))
}

/// A toy tool, with default thresholds.
pub fn tool(virus: Virus) -> Result<Tool<Scripted>, Report> {
    let runner = Runner::new(collaborator(virus), CascadeConfig::default(), ScanConfig::default());
    Tool::new(virus, analyses(virus)?, runner)
}

/// Query sequences with a known outcome, named after it.
pub fn queries(virus: Virus) -> Vec<Record> {
    match virus {
        Virus::Hiv1 => {
            let crf = references(virus).into_iter().find(|r| r.id == "AE.1").map(|r| r.sequence).unwrap_or_default();
            let short: String = format!("{}{}", "C".repeat(600), "-".repeat(COLUMNS - 600));
            vec![
                Record::new("subtype-b", &uniform('C')),
                Record { id: "crf01-ae".to_string(), sequence: crf },
                Record::new("recombinant-a-c", &halves('A', 'G')),
                Record::new("short-subtype-b", &short),
            ]
        }
        Virus::Hcv => vec![
            Record::new("genotype-1a", &uniform('A')),
            Record::new("genotype-2", &uniform('C')),
            Record::new("short", &format!("{}{}", "A".repeat(150), "-".repeat(COLUMNS - 150))),
        ],
    }
}
