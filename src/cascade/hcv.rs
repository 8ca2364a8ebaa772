//! HCV genotyping by similarity search, with phylogenetic subtyping of one genotype.

use crate::analysis::Analyses;
use crate::cascade::{Assessment, Assignment, Conclusion, Rule, UNASSIGNED};
use crate::result::{AnalysisResult, PhyloResult, SimilarityResult};
use crate::runner::{Collaborator, Runner};
use crate::sequence::Record;
use color_eyre::eyre::{Report, Result};

pub const BLAST: &str = "blast";
pub const SUBTYPE: &str = "subtype";

/// Analyses an HCV definition must provide.
pub const ANALYSES: [&str; 2] = [BLAST, SUBTYPE];

#[derive(Clone, Debug, PartialEq)]
pub struct Evidence {
    pub blast: SimilarityResult,
    /// Only run for the genotype that is subtyped.
    pub subtype: Option<PhyloResult>,
}

impl Evidence {
    pub fn results(&self) -> Vec<AnalysisResult> {
        let mut results = vec![AnalysisResult::from(self.blast.clone())];
        results.extend(self.subtype.clone().map(AnalysisResult::from));
        results
    }
}

/// Run the HCV analyses for a sequence and decide on its genotype.
pub fn analyze<C>(runner: &Runner<C>, analyses: &Analyses, query: &Record) -> Result<Assessment, Report>
where
    C: Collaborator,
{
    let blast = runner.similarity(analyses, BLAST, query)?;
    let subtype = match blast.cluster() {
        Some(cluster) if blast.have_support() && cluster.id == runner.cascade.subtyping_cluster => {
            Some(runner.phylo(analyses, SUBTYPE, query)?)
        }
        _ => None,
    };

    let evidence = Evidence { blast, subtype };
    let conclusion = decide(&evidence);
    Ok(Assessment { results: evidence.results(), conclusion })
}

/// Decide on the genotype of a sequence from its HCV evidence.
///
/// The thresholds quoted are the cutoffs the results were judged by.
///
/// ## Examples
///
/// ```rust
/// use subtyper::cascade::{hcv, Rule};
/// use subtyper::cluster::Cluster;
/// use subtyper::result::SimilarityResult;
///
/// let blast = SimilarityResult {
///     analysis: "blast".to_string(),
///     cluster: Some(Cluster::new("3", "HCV Genotype 3")),
///     score: 154.0,
///     cutoff: 200.0,
///     hit: Some("3a.NZL1".to_string()),
/// };
/// let conclusion = hcv::decide(&hcv::Evidence { blast, subtype: None });
/// assert_eq!(conclusion.rule, Rule::Unassigned);
/// assert_eq!(conclusion.assignment.name, "Unassigned");
/// assert_eq!(conclusion.justification, "Unassigned because of BLAST score < 200.");
/// ```
pub fn decide(evidence: &Evidence) -> Conclusion {
    let blast = &evidence.blast;
    let threshold = blast.cutoff;

    let Some(genotype) = blast.cluster().filter(|_| blast.have_support()) else {
        return Conclusion::new(
            Assignment::unassigned(UNASSIGNED),
            Rule::Unassigned,
            format!("Unassigned because of BLAST score < {threshold}."),
        )
        .citing([blast.clone()]);
    };

    let identified = format!("Identified with BLAST score > {threshold}");
    match &evidence.subtype {
        Some(subtype) => {
            let support = subtype.cutoff;
            let conclusion = match subtype.best().filter(|_| subtype.have_support()) {
                Some(cluster) => Conclusion::new(
                    Assignment::cluster(cluster),
                    Rule::Subtype,
                    format!("{identified}, subtype assigned with bootstrap >= {support}%."),
                ),
                None => Conclusion::new(
                    Assignment::cluster(genotype),
                    Rule::SubtypeUnassigned,
                    format!("{identified}, subtype unassigned because of bootstrap < {support}%."),
                ),
            };
            conclusion.citing([AnalysisResult::from(blast.clone()), subtype.clone().into()])
        }
        None => Conclusion::new(Assignment::cluster(genotype), Rule::Genotype, identified)
            .citing([blast.clone()]),
    }
}
