use crate::cascade::hiv::{self, CrfEvidence, Evidence, LongEvidence};
use crate::cascade::{hcv, CascadeConfig, Conclusion, Rule, UNASSIGNED};
use crate::cluster::{Cluster, CRF};
use crate::result::{AnalysisResult, PhyloResult, ScanResult, SimilarityResult, WindowProfile};
use crate::runner::Runner;
use crate::tool::{toy, Tool, Virus};
use color_eyre::eyre::{eyre, Report, Result};

fn a() -> Cluster {
    Cluster::new("A", "HIV-1 Subtype A")
}

fn b() -> Cluster {
    Cluster::new("B", "HIV-1 Subtype B")
}

fn ae() -> Cluster {
    Cluster::new("CRF01_AE", "HIV-1 CRF 01_AE").with_tags([CRF])
}

fn phylo(analysis: &str, best: Option<Cluster>, inner: f64, outer: f64) -> PhyloResult {
    PhyloResult {
        analysis: analysis.to_string(),
        support: if best.is_some() { inner + outer } else { 0.0 },
        best,
        inner,
        outer,
        cutoff: 70.0,
        replicates: 100,
        candidate: None,
    }
}

/// A bootscan of 20 windows.
fn scan(analysis: &str, profile: &[(Cluster, usize)], candidate: Option<&str>) -> ScanResult {
    ScanResult {
        analysis: analysis.to_string(),
        profile: profile
            .iter()
            .map(|(cluster, supported)| WindowProfile { cluster: cluster.clone(), supported: *supported, unsupported: 0 })
            .collect(),
        window_count: 20,
        candidate: candidate.map(String::from),
        type_threshold: 0.1,
        cutoff: 0.9,
    }
}

fn long(pure: PhyloResult, scan: ScanResult, crf: CrfEvidence) -> Conclusion {
    hiv::decide(&Evidence::Long(LongEvidence { pure, scan, crf }), &CascadeConfig::default())
}

fn no_crf() -> CrfEvidence {
    CrfEvidence::Unsupported(phylo("crf", None, 0.0, 0.0))
}

/// A supported CRF probe, with the CRF bootscan profile given.
fn probed(profile: &[(Cluster, usize)]) -> CrfEvidence {
    let scan = scan("crfscan", profile, Some("CRF01_AE"));
    let support = scan.bootscan_support("CRF01_AE");
    CrfEvidence::Probed {
        crf: phylo("crf", Some(ae()), 70.0, 20.0),
        scan,
        phylo: phylo("pure", Some(ae()), 60.0, 20.0),
        support,
    }
}

fn recombinant_scan() -> ScanResult {
    scan("scan", &[(a(), 10), (b(), 10)], None)
}

// ----------------------------------------------------------------------------
// HIV-1, pure rules
// ----------------------------------------------------------------------------

#[test]
fn rule_1a() -> Result<(), Report> {
    let pure = phylo("pure", Some(b()), 60.0, 20.0);
    let conclusion = long(pure.clone(), scan("scan", &[(b(), 20)], None), no_crf());

    assert_eq!(conclusion.rule, Rule::Rule1A);
    assert_eq!(conclusion.via, None);
    assert_eq!(conclusion.assignment.id.as_deref(), Some("B"));
    assert_eq!(conclusion.assignment.name, "HIV-1 Subtype B");
    assert_eq!(
        conclusion.justification,
        "Subtype assigned based on sequence > 800 bps clustering with a pure subtype with bootstrap > 70% \
         without recombination in the bootscan."
    );
    assert_eq!(conclusion.results, [AnalysisResult::from(pure)]);
    Ok(())
}

#[test]
fn scan_support_always_ends_in_pure_rules() -> Result<(), Report> {
    let pure_rules = [Rule::Rule1A, Rule::Rule1B, Rule::Rule1C, Rule::Rule1c, Rule::Rule5];
    let cases = [
        (Some(b()), 60.0, 20.0),
        (Some(b()), 30.0, 50.0),
        (Some(b()), 10.0, 70.0),
        (Some(b()), 20.0, 10.0),
        (None, 0.0, 0.0),
    ];
    for (best, inner, outer) in cases {
        for crf in [no_crf(), probed(&[(ae(), 20)]), CrfEvidence::Untagged(phylo("crf", Some(a()), 80.0, 0.0))] {
            let pure = phylo("pure", best.clone(), inner, outer);
            let conclusion = long(pure, scan("scan", &[(b(), 19)], None), crf);
            assert!(pure_rules.contains(&conclusion.rule), "{:?}", conclusion.rule);
        }
    }
    Ok(())
}

#[test]
fn rule_1b() -> Result<(), Report> {
    let conclusion = long(phylo("pure", Some(b()), 30.0, 50.0), scan("scan", &[(b(), 20)], None), no_crf());
    assert_eq!(conclusion.rule, Rule::Rule1B);
    assert_eq!(conclusion.assignment.id.as_deref(), Some("B"));
    assert_eq!(conclusion.assignment.name, "HIV-1 Subtype B-like");
    Ok(())
}

#[test]
fn rule_1c_crf() -> Result<(), Report> {
    let crf = CrfEvidence::Untagged(phylo("crf", Some(ae()), 80.0, 0.0));
    let conclusion = long(phylo("pure", Some(a()), 60.0, 20.0), scan("scan", &[(a(), 20)], None), crf);
    assert_eq!(conclusion.rule, Rule::Rule1C);
    assert_eq!(conclusion.assignment.id.as_deref(), Some("CRF01_AE"));
    assert_eq!(conclusion.results.len(), 2);

    // a crf sister to the query is not enough
    let crf = CrfEvidence::Untagged(phylo("crf", Some(ae()), 20.0, 60.0));
    let conclusion = long(phylo("pure", Some(a()), 60.0, 20.0), scan("scan", &[(a(), 20)], None), crf);
    assert_eq!(conclusion.rule, Rule::Rule1A);
    Ok(())
}

#[test]
fn rule_1c_unassigned() -> Result<(), Report> {
    let conclusion = long(phylo("pure", Some(b()), 10.0, 70.0), scan("scan", &[(b(), 20)], None), no_crf());
    assert_eq!(conclusion.rule, Rule::Rule1c);
    assert_eq!(conclusion.assignment.id, None);
    assert_eq!(conclusion.assignment.name, "Check the Report");
    Ok(())
}

#[test]
fn rule_5() -> Result<(), Report> {
    let conclusion = long(phylo("pure", Some(b()), 30.0, 10.0), scan("scan", &[(b(), 20)], None), no_crf());
    assert_eq!(conclusion.rule, Rule::Rule5);
    assert_eq!(conclusion.assignment.id_or_unassigned(), UNASSIGNED);
    assert!(conclusion.justification.contains("failure to classify as pure subtype"));
    Ok(())
}

// ----------------------------------------------------------------------------
// HIV-1, recombinant rules
// ----------------------------------------------------------------------------

#[test]
fn rule_2a() -> Result<(), Report> {
    let conclusion = long(phylo("pure", Some(a()), 60.0, 20.0), recombinant_scan(), no_crf());
    assert_eq!(conclusion.rule, Rule::Rule2A);
    assert_eq!(conclusion.assignment.name, "Recombinant HIV-1 Subtype A (50%), HIV-1 Subtype B (50%)");
    assert_eq!(
        conclusion.justification,
        "Recombinant based on sequence > 800 bps, with 2 subtypes supported in the bootscan."
    );
    Ok(())
}

#[test]
fn rule_2b() -> Result<(), Report> {
    let scan = scan("scan", &[(b(), 15)], None);
    let conclusion = long(phylo("pure", Some(b()), 60.0, 20.0), scan, no_crf());
    assert_eq!(conclusion.rule, Rule::Rule1A);
    assert_eq!(conclusion.via, Some(Rule::Rule2B));
    assert!(conclusion.justification.ends_with("without significant recombination in the bootscan."));
    Ok(())
}

#[test]
fn rule_2c() -> Result<(), Report> {
    let scan = scan("scan", &[(a(), 0), (b(), 11)], None);
    let conclusion = long(phylo("pure", Some(b()), 60.0, 20.0), scan, no_crf());
    assert_eq!(conclusion.rule, Rule::Rule2C);
    assert_eq!(conclusion.assignment.name, "0.55, potential recombinant");
    assert!(conclusion.justification.contains("HIV-1 Subtype B supported in 0.55 of the bootscan windows"));
    Ok(())
}

#[test]
fn rule_2d() -> Result<(), Report> {
    for profile in [vec![(a(), 0), (b(), 0)], vec![(a(), 1), (b(), 6)]] {
        let conclusion = long(phylo("pure", Some(b()), 60.0, 20.0), scan("scan", &profile, None), no_crf());
        assert_eq!(conclusion.rule, Rule::Rule2D);
        assert_eq!(conclusion.assignment.name, "Check the bootscan");
    }
    Ok(())
}

#[test]
fn rule_3a() -> Result<(), Report> {
    let conclusion = long(phylo("pure", Some(a()), 60.0, 20.0), recombinant_scan(), probed(&[(b(), 6), (ae(), 10)]));
    assert_eq!(conclusion.rule, Rule::Rule3A);
    assert_eq!(conclusion.assignment.name, "Recombinant HIV-1 CRF 01_AE (50%), HIV-1 Subtype B (30%)");
    assert_eq!(conclusion.results.len(), 2);
    Ok(())
}

#[test]
fn rule_3b() -> Result<(), Report> {
    let conclusion = long(phylo("pure", Some(a()), 60.0, 20.0), recombinant_scan(), probed(&[(b(), 0), (ae(), 15)]));
    assert_eq!(conclusion.rule, Rule::Rule1A);
    assert_eq!(conclusion.via, Some(Rule::Rule3B));
    assert_eq!(conclusion.assignment.id.as_deref(), Some("CRF01_AE"));
    Ok(())
}

#[test]
fn rule_3c() -> Result<(), Report> {
    let conclusion = long(phylo("pure", Some(a()), 60.0, 20.0), recombinant_scan(), probed(&[(ae(), 12)]));
    assert_eq!(conclusion.rule, Rule::Rule3C);
    assert_eq!(conclusion.assignment.id.as_deref(), Some("CRF01_AE"));
    Ok(())
}

#[test]
fn rule_3d() -> Result<(), Report> {
    let conclusion = long(phylo("pure", Some(a()), 60.0, 20.0), recombinant_scan(), probed(&[(ae(), 4)]));
    assert_eq!(conclusion.rule, Rule::Rule3D);
    assert_eq!(conclusion.assignment.name, "Check the bootscan");
    Ok(())
}

#[test]
fn rule_4_to_8() -> Result<(), Report> {
    let conclusion = long(phylo("pure", Some(a()), 60.0, 20.0), recombinant_scan(), probed(&[(a(), 0), (ae(), 19)]));
    assert_eq!(conclusion.rule, Rule::Rule4To8);
    assert_eq!(conclusion.rule.to_string(), "4-8");
    assert_eq!(conclusion.assignment.name, "HIV-1 CRF 01_AE");
    Ok(())
}

#[test]
fn crf_untagged() -> Result<(), Report> {
    let crf = CrfEvidence::Untagged(phylo("crf", Some(a()), 80.0, 0.0));
    let conclusion = long(phylo("pure", Some(a()), 60.0, 20.0), recombinant_scan(), crf);
    assert_eq!(conclusion.rule, Rule::CrfUntagged);
    assert_eq!(conclusion.assignment.name, "Check the bootscan");
    Ok(())
}

// ----------------------------------------------------------------------------
// HIV-1, short sequences
// ----------------------------------------------------------------------------

#[test]
fn short_rules() -> Result<(), Report> {
    let config = CascadeConfig::default();
    let decide = |best, inner, outer| hiv::decide(&Evidence::Short(phylo("pure-puzzle", best, inner, outer)), &config);

    let conclusion = decide(Some(b()), 50.0, 30.0);
    assert_eq!((conclusion.rule, conclusion.assignment.id.as_deref()), (Rule::Rule11, Some("B")));
    assert!(conclusion.justification.starts_with("Subtype assigned based on sequence < 800bp"));

    let conclusion = decide(Some(b()), 10.0, 70.0);
    assert_eq!((conclusion.rule, conclusion.assignment.id.as_deref()), (Rule::Rule10, None));

    let conclusion = decide(Some(b()), 30.0, 20.0);
    assert_eq!((conclusion.rule, conclusion.assignment.name.as_str()), (Rule::Rule9, "Check the report"));
    Ok(())
}

#[test]
fn thresholds_from_config() -> Result<(), Report> {
    // the runner sets the result cutoff from the configured support threshold
    let config = CascadeConfig { length_gate: 500, support_threshold: 90.0, ..Default::default() };
    let pure = PhyloResult { cutoff: config.support_threshold, ..phylo("pure-puzzle", Some(b()), 50.0, 30.0) };
    let conclusion = hiv::decide(&Evidence::Short(pure), &config);
    assert_eq!(conclusion.rule, Rule::Rule9);
    assert_eq!(
        conclusion.justification,
        "Subtype unassigned based on sequence < 500bp, and not clustering with a pure subtype with bootstrap > 90%."
    );
    Ok(())
}

#[test]
fn justification_quotes_analysis_cutoff() -> Result<(), Report> {
    // an analysis cutoff below the configured threshold decides, and is the one quoted
    let pure = PhyloResult { cutoff: 60.0, ..phylo("pure-puzzle", Some(b()), 40.0, 25.0) };
    let conclusion = hiv::decide(&Evidence::Short(pure), &CascadeConfig::default());
    assert_eq!(conclusion.rule, Rule::Rule11);
    assert!(conclusion.justification.contains("bootstrap > 60%"));

    let pure = PhyloResult { cutoff: 60.0, ..phylo("pure", Some(b()), 50.0, 15.0) };
    let conclusion = long(pure, scan("scan", &[(b(), 20)], None), no_crf());
    assert_eq!(conclusion.rule, Rule::Rule1A);
    assert!(conclusion.justification.contains("bootstrap > 60%"));

    let blast = SimilarityResult { cutoff: 100.0, ..blast("3", 150.0) };
    let conclusion = hcv::decide(&hcv::Evidence { blast, subtype: None });
    assert_eq!(conclusion.rule, Rule::Genotype);
    assert_eq!(conclusion.justification, "Identified with BLAST score > 100");
    Ok(())
}

// ----------------------------------------------------------------------------
// HCV
// ----------------------------------------------------------------------------

fn blast(cluster: &str, score: f64) -> SimilarityResult {
    SimilarityResult {
        analysis: "blast".to_string(),
        cluster: Some(Cluster::new(cluster, &format!("HCV Genotype {cluster}"))),
        score,
        cutoff: 200.0,
        hit: Some(format!("{cluster}a.ref")),
    }
}

#[test]
fn hcv_rules() -> Result<(), Report> {
    let conclusion = hcv::decide(&hcv::Evidence { blast: blast("3", 1200.0), subtype: None });
    assert_eq!(conclusion.rule, Rule::Genotype);
    assert_eq!(conclusion.assignment.name, "HCV Genotype 3");
    assert_eq!(conclusion.justification, "Identified with BLAST score > 200");

    let subtype = phylo("subtype", Some(Cluster::new("1b", "HCV Subtype 1b")), 90.0, 0.0);
    let conclusion = hcv::decide(&hcv::Evidence { blast: blast("1", 1200.0), subtype: Some(subtype) });
    assert_eq!(conclusion.rule, Rule::Subtype);
    assert_eq!(conclusion.assignment.id.as_deref(), Some("1b"));
    assert_eq!(conclusion.results.len(), 2);

    let subtype = phylo("subtype", Some(Cluster::new("1b", "HCV Subtype 1b")), 40.0, 0.0);
    let conclusion = hcv::decide(&hcv::Evidence { blast: blast("1", 1200.0), subtype: Some(subtype) });
    assert_eq!(conclusion.rule, Rule::SubtypeUnassigned);
    assert_eq!(conclusion.assignment.id.as_deref(), Some("1"));
    assert_eq!(
        conclusion.justification,
        "Identified with BLAST score > 200, subtype unassigned because of bootstrap < 70%."
    );

    // a score at the threshold is not enough
    let conclusion = hcv::decide(&hcv::Evidence { blast: blast("1", 200.0), subtype: None });
    assert_eq!(conclusion.rule, Rule::Unassigned);
    assert_eq!(conclusion.assignment.id_or_unassigned(), UNASSIGNED);
    Ok(())
}

// ----------------------------------------------------------------------------
// Analyze
// ----------------------------------------------------------------------------

#[test]
fn analyze_twice() -> Result<(), Report> {
    for virus in [Virus::Hiv1, Virus::Hcv] {
        let mut tool = toy::tool(virus)?;
        for query in toy::queries(virus) {
            let first = tool.analyze(&query)?;
            let second = tool.analyze(&query)?;
            assert_eq!(first, second);
        }
    }
    Ok(())
}

#[test]
fn analyses_restored_after_probe() -> Result<(), Report> {
    let mut tool = toy::tool(Virus::Hiv1)?;
    let before = tool.analyses.clone();
    let crf = &toy::queries(Virus::Hiv1)[1];

    let assessment = tool.analyze(crf)?;
    assert!(matches!(assessment.results.as_slice(), [_, _, _, _, _]));
    assert_eq!(tool.analyses, before);
    Ok(())
}

#[test]
fn analyses_restored_after_failed_probe() -> Result<(), Report> {
    // trees fail once the CRF candidate is added next to the full pure clusters
    let collaborator = toy::Scripted::new(
        |_, _| Ok(String::new()),
        |alignment| match alignment.iter().any(|r| r.id == "A.2") && alignment.iter().any(|r| r.id == "AE.1") {
            true => Err(eyre!("tree builder crashed")),
            false => toy::nearest_neighbour_trees(alignment, toy::REPLICATES),
        },
    );
    let runner = Runner::new(collaborator, CascadeConfig::default(), Default::default());
    let mut tool = Tool::new(Virus::Hiv1, toy::analyses(Virus::Hiv1)?, runner)?;
    let before = tool.analyses.clone();

    let crf = &toy::queries(Virus::Hiv1)[1];
    assert!(tool.analyze(crf).is_err());
    assert_eq!(tool.analyses, before);

    // and the next sequence is unaffected
    let assessment = tool.analyze(&toy::queries(Virus::Hiv1)[0])?;
    assert_eq!(assessment.conclusion.rule, Rule::Rule1A);
    Ok(())
}
