//! HIV-1 subtyping: pure subtypes, CRFs and recombinants.

use crate::analysis::{with_candidate_cluster, Analyses};
use crate::cascade::{recombinant_name, Assessment, Assignment, CascadeConfig, Conclusion, Rule};
use crate::error::Error;
use crate::result::{AnalysisResult, PhyloResult, ScanResult};
use crate::runner::{Collaborator, Runner};
use crate::sequence::Record;
use color_eyre::eyre::{Report, Result};
use log::debug;

pub const PURE: &str = "pure";
pub const SCAN: &str = "scan";
pub const CRF: &str = "crf";
pub const CRF_SCAN: &str = "crfscan";
pub const PURE_PUZZLE: &str = "pure-puzzle";

/// Analyses an HIV-1 definition must provide.
pub const ANALYSES: [&str; 5] = [PURE, SCAN, CRF, CRF_SCAN, PURE_PUZZLE];

// ----------------------------------------------------------------------------
// Evidence
// ----------------------------------------------------------------------------

/// The `crf` phylo-cluster result, and what probing its best cluster revealed.
#[derive(Clone, Debug, PartialEq)]
pub enum CrfEvidence {
    /// No supported cluster.
    Unsupported(PhyloResult),
    /// Supported by a CRF, which was added as candidate to `crfscan` and `pure`.
    Probed {
        crf: PhyloResult,
        /// `crfscan` with the CRF as candidate.
        scan: ScanResult,
        /// `pure` with the CRF as candidate.
        phylo: PhyloResult,
        /// Fraction of `crfscan` windows supporting the CRF.
        support: f64,
    },
    /// Supported by a cluster without the CRF tag.
    Untagged(PhyloResult),
}

impl CrfEvidence {
    pub fn result(&self) -> &PhyloResult {
        match self {
            CrfEvidence::Unsupported(crf) | CrfEvidence::Untagged(crf) => crf,
            CrfEvidence::Probed { crf, .. } => crf,
        }
    }
}

/// Results of a sequence longer than the length gate.
#[derive(Clone, Debug, PartialEq)]
pub struct LongEvidence {
    pub pure: PhyloResult,
    pub scan: ScanResult,
    pub crf: CrfEvidence,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Evidence {
    Long(LongEvidence),
    /// The `pure-puzzle` result of a short sequence.
    Short(PhyloResult),
}

impl Evidence {
    /// All results, in the order they were produced.
    pub fn results(&self) -> Vec<AnalysisResult> {
        match self {
            Evidence::Short(pure) => vec![pure.clone().into()],
            Evidence::Long(long) => {
                let mut results: Vec<AnalysisResult> =
                    vec![long.pure.clone().into(), long.scan.clone().into(), long.crf.result().clone().into()];
                if let CrfEvidence::Probed { scan, phylo, .. } = &long.crf {
                    results.push(scan.clone().into());
                    results.push(phylo.clone().into());
                }
                results
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Analyze
// ----------------------------------------------------------------------------

/// Run the HIV-1 analyses for a sequence and decide on its subtype.
///
/// When the `crf` analysis is supported by a CRF, that cluster is temporarily added to the
/// inner analysis of `crfscan` and to `pure`, which are then run again. The analyses are
/// restored before returning, also when an analysis fails.
pub fn analyze<C>(
    runner: &Runner<C>,
    analyses: &mut Analyses,
    query: &Record,
) -> Result<Assessment, Report>
where
    C: Collaborator,
{
    let config = &runner.cascade;
    let evidence = match query.length() > config.length_gate {
        false => Evidence::Short(runner.phylo(analyses, PURE_PUZZLE, query)?),
        true => {
            let pure = runner.phylo(analyses, PURE, query)?;
            let scan = runner.scan(analyses, SCAN, query)?;
            let crf = runner.phylo(analyses, CRF, query)?;

            let crf = match crf.best.clone() {
                Some(cluster) if crf.have_support() && cluster.is_crf() => {
                    debug!("{}: probing CRF candidate {}", query.id, cluster.id);
                    let inner = analyses
                        .get(CRF_SCAN)?
                        .analysis
                        .clone()
                        .ok_or_else(|| Error::analysis(CRF_SCAN, "No inner phylo-cluster analysis is defined."))?;
                    let (scan, phylo) =
                        with_candidate_cluster(analyses, &[inner.as_str(), PURE], &cluster.id, |analyses| {
                            let scan = runner.scan(analyses, CRF_SCAN, query)?;
                            let phylo = runner.phylo(analyses, PURE, query)?;
                            Ok::<_, Report>((scan, phylo))
                        })??;
                    let support = scan.bootscan_support(&cluster.id);
                    CrfEvidence::Probed { crf, scan, phylo, support }
                }
                Some(_) if crf.have_support() => CrfEvidence::Untagged(crf),
                _ => CrfEvidence::Unsupported(crf),
            };

            Evidence::Long(LongEvidence { pure, scan, crf })
        }
    };

    let conclusion = decide(&evidence, config);
    Ok(Assessment { results: evidence.results(), conclusion })
}

// ----------------------------------------------------------------------------
// Decide
// ----------------------------------------------------------------------------

/// Decide on the subtype of a sequence from its HIV-1 evidence.
///
/// ## Examples
///
/// ```rust
/// use subtyper::cascade::{hiv, CascadeConfig, Rule};
/// use subtyper::result::PhyloResult;
///
/// let pure = PhyloResult {
///     analysis: "pure-puzzle".to_string(),
///     best: None,
///     support: 0.0,
///     inner: 0.0,
///     outer: 0.0,
///     cutoff: 70.0,
///     replicates: 100,
///     candidate: None,
/// };
/// let conclusion = hiv::decide(&hiv::Evidence::Short(pure), &CascadeConfig::default());
/// assert_eq!(conclusion.rule, Rule::Rule9);
/// assert_eq!(conclusion.assignment.name, "Check the report");
/// ```
pub fn decide(evidence: &Evidence, config: &CascadeConfig) -> Conclusion {
    match evidence {
        Evidence::Short(pure) => decide_short(pure, config),
        Evidence::Long(long) => decide_long(long, config),
    }
}

fn decide_short(pure: &PhyloResult, config: &CascadeConfig) -> Conclusion {
    let gate = config.length_gate;
    let threshold = pure.cutoff;

    let conclusion = match pure.best() {
        Some(cluster) if pure.have_support() => {
            if pure.inner - pure.outer > -config.short_inner_outer_margin {
                Conclusion::new(
                    Assignment::cluster(cluster),
                    Rule::Rule11,
                    format!(
                        "Subtype assigned based on sequence < {gate}bp, clustering with a pure subtype \
                         with bootstrap > {threshold}%, and clustering inside the pure subtype cluster."
                    ),
                )
            } else {
                Conclusion::new(
                    Assignment::unassigned("Check the report"),
                    Rule::Rule10,
                    format!(
                        "Subtype assigned based on sequence < {gate}bp, clustering with a pure subtype \
                         with bootstrap > {threshold}%, however not clustering inside the pure subtype cluster."
                    ),
                )
            }
        }
        _ => Conclusion::new(
            Assignment::unassigned("Check the report"),
            Rule::Rule9,
            format!(
                "Subtype unassigned based on sequence < {gate}bp, and not clustering with a pure \
                 subtype with bootstrap > {threshold}%."
            ),
        ),
    };
    conclusion.citing([pure.clone()])
}

fn decide_long(evidence: &LongEvidence, config: &CascadeConfig) -> Conclusion {
    let gate = config.length_gate;
    let threshold = evidence.pure.cutoff;
    let bands = &config.bands;
    let crf = evidence.crf.result();

    if evidence.scan.have_support() {
        return pure_rules(&evidence.pure, Some(crf), true, config);
    }

    match &evidence.crf {
        CrfEvidence::Unsupported(_) => {
            let scan = &evidence.scan;
            let supported = scan.supported_types();
            match supported.as_slice() {
                [_, _, ..] => Conclusion::new(
                    Assignment::unassigned(recombinant_name(&supported)),
                    Rule::Rule2A,
                    format!(
                        "Recombinant based on sequence > {gate} bps, with {} subtypes supported \
                         in the bootscan.",
                        supported.len()
                    ),
                )
                .citing([scan.clone()]),
                [single] if single.fraction() >= bands.confirmed => {
                    pure_rules(&evidence.pure, Some(crf), false, config).via(Rule::Rule2B)
                }
                [single] if single.fraction() >= bands.potential => {
                    let fraction = single.fraction();
                    Conclusion::new(
                        Assignment::unassigned(format!("{fraction}, potential recombinant")),
                        Rule::Rule2C,
                        format!(
                            "Subtype unassigned based on sequence > {gate} bps, with {} supported in \
                             {fraction} of the bootscan windows, potential recombinant.",
                            single.cluster.name
                        ),
                    )
                    .citing([scan.clone()])
                }
                _ => Conclusion::new(
                    Assignment::unassigned("Check the bootscan"),
                    Rule::Rule2D,
                    format!(
                        "Subtype unassigned based on sequence > {gate} bps clustering with a pure \
                         subtype with bootstrap > {threshold}% with detection of recombination in \
                         the bootscan, and failure to classify as a CRF or sub-subtype (bootstrap support)."
                    ),
                )
                .citing([scan.clone()]),
            }
        }
        CrfEvidence::Probed { crf, scan, phylo, support } => {
            let threshold = crf.cutoff;
            let cluster = crf.best();
            let supported = scan.supported_types();
            let conclusion = match cluster {
                Some(cluster) if scan.have_support() => Conclusion::new(
                    Assignment::cluster(cluster),
                    Rule::Rule4To8,
                    format!(
                        "Subtype assigned based on sequence > {gate}bp, clustering with a CRF or \
                         sub-subtype with bootstrap > {threshold}%, with detection of recombination \
                         in the pure subtype bootscan, and further confirmed as a CRF or sub-subtype \
                         by bootscan analysis."
                    ),
                ),
                // the CRF's own share is part of the recombinant
                _ if *support > bands.minimum && !supported.is_empty() => Conclusion::new(
                    Assignment::unassigned(recombinant_name(&scan.reached_types())),
                    Rule::Rule3A,
                    format!(
                        "Recombinant based on sequence > {gate}bp, clustering with a CRF or sub-subtype \
                         with bootstrap > {threshold}%, with other subtypes supported in the CRF bootscan."
                    ),
                ),
                _ if *support > bands.confirmed && supported.is_empty() => {
                    return pure_rules(phylo, None, true, config).via(Rule::Rule3B);
                }
                Some(cluster) if *support > bands.potential && supported.is_empty() => Conclusion::new(
                    Assignment::cluster(cluster),
                    Rule::Rule3C,
                    format!(
                        "Subtype assigned based on sequence > {gate}bp, clustering with a CRF or \
                         sub-subtype with bootstrap > {threshold}%, potential recombinant subtype."
                    ),
                ),
                _ => Conclusion::new(
                    Assignment::unassigned("Check the bootscan"),
                    Rule::Rule3D,
                    format!(
                        "Subtype unassigned based on sequence > {gate}bp, clustering with a pure subtype \
                         and CRF or sub-subtype with bootstrap > {threshold}%, with detection of \
                         recombination in the pure subtype bootscan, and failure to classify as a CRF \
                         or sub-subtype by bootscan analysis."
                    ),
                ),
            };
            conclusion.citing([AnalysisResult::from(crf.clone()), scan.clone().into()])
        }
        CrfEvidence::Untagged(crf) => Conclusion::new(
            Assignment::unassigned("Check the bootscan"),
            Rule::CrfUntagged,
            format!(
                "Subtype unassigned based on sequence > {gate}bp, not clustering with a pure subtype \
                 with bootstrap > {threshold}%, with or without detection of recombination in the pure \
                 subtype bootscan."
            ),
        )
        .citing([AnalysisResult::from(crf.clone()), evidence.scan.clone().into()]),
    }
}

/// The 1-series: assign the pure subtype, a CRF, or nothing.
fn pure_rules(
    pure: &PhyloResult,
    crf: Option<&PhyloResult>,
    clearly_no_recombination: bool,
    config: &CascadeConfig,
) -> Conclusion {
    let gate = config.length_gate;
    let threshold = pure.cutoff;
    let recombination = match clearly_no_recombination {
        true => "without recombination in the bootscan.",
        false => "without significant recombination in the bootscan.",
    };
    let unassigned = || {
        format!(
            "Subtype unassigned based on sequence > {gate} bps failure to classify as pure subtype \
             (Bootstrap Support) {recombination}"
        )
    };

    let Some(cluster) = pure.best().filter(|_| pure.have_support()) else {
        return Conclusion::new(Assignment::unassigned("Check the Report"), Rule::Rule5, unassigned())
            .citing([pure.clone()]);
    };

    let crf_cluster = crf.filter(|crf| crf.have_support() && crf.inner > crf.outer).and_then(|crf| crf.best());
    if let (Some(crf), Some(crf_cluster)) = (crf, crf_cluster) {
        return Conclusion::new(
            Assignment::cluster(crf_cluster),
            Rule::Rule1C,
            format!(
                "Subtype assigned based on sequence > {gate} bps clustering with a pure subtype and \
                 CRF or sub-subtype with bootstrap > {threshold}% {recombination}"
            ),
        )
        .citing([pure.clone(), crf.clone()]);
    }

    let conclusion = if pure.inner > pure.outer {
        Conclusion::new(
            Assignment::cluster(cluster),
            Rule::Rule1A,
            format!(
                "Subtype assigned based on sequence > {gate} bps clustering with a pure subtype with \
                 bootstrap > {threshold}% {recombination}"
            ),
        )
    } else if pure.inner > pure.outer - config.inner_outer_margin {
        Conclusion::new(
            Assignment { id: Some(cluster.id.clone()), name: format!("{}-like", cluster.name) },
            Rule::Rule1B,
            format!(
                "Subtype assigned based on sequence > {gate} bps clustering with a pure subtype with \
                 bootstrap > {threshold}%, pure-like as it clusters at the edge of the subtype \
                 cluster, {recombination}"
            ),
        )
    } else {
        Conclusion::new(Assignment::unassigned("Check the Report"), Rule::Rule1c, unassigned())
    };
    conclusion.citing([pure.clone()])
}
