use crate::analysis::Kind;
use crate::cluster::Cluster;
use crate::result::{AnalysisResult, PhyloResult, ScanResult, WindowProfile};
use color_eyre::eyre::{Report, Result};

fn profile(id: &str, supported: usize, unsupported: usize) -> WindowProfile {
    WindowProfile { cluster: Cluster::new(id, id), supported, unsupported }
}

fn scan(profile: Vec<WindowProfile>, window_count: usize) -> ScanResult {
    ScanResult {
        analysis: "scan".to_string(),
        profile,
        window_count,
        candidate: None,
        type_threshold: 0.1,
        cutoff: 0.9,
    }
}

#[test]
fn phylo_support_at_cutoff() -> Result<(), Report> {
    let mut result = PhyloResult {
        analysis: "pure".to_string(),
        best: Some(Cluster::new("B", "HIV-1 Subtype B")),
        support: 70.0,
        inner: 50.0,
        outer: 20.0,
        cutoff: 70.0,
        replicates: 100,
        candidate: None,
    };
    assert!(result.have_support());

    result.support = 69.0;
    assert!(!result.have_support());

    let result = AnalysisResult::from(result);
    assert_eq!(result.kind(), Kind::PhyloCluster);
    assert_eq!(result.analysis(), "pure");
    assert_eq!(result.best().map(|c| c.id.as_str()), Some("B"));
    Ok(())
}

#[test]
fn phylo_without_best_unsupported() -> Result<(), Report> {
    let result = PhyloResult {
        analysis: "pure".to_string(),
        best: None,
        support: 0.0,
        inner: 0.0,
        outer: 0.0,
        cutoff: 0.0,
        replicates: 100,
        candidate: None,
    };
    assert!(!result.have_support());
    Ok(())
}

#[test]
fn scan_single_type_supported() -> Result<(), Report> {
    let scan = scan(vec![profile("A", 0, 1), profile("B", 19, 0)], 20);
    assert!(scan.have_support());
    assert_eq!(scan.bootscan_support("B"), 0.95);
    assert_eq!(scan.bootscan_nosupport("A"), 0.05);
    assert_eq!(scan.bootscan_support("missing"), 0.0);
    Ok(())
}

#[test]
fn scan_two_types_unsupported() -> Result<(), Report> {
    let scan = scan(vec![profile("A", 2, 0), profile("B", 18, 0)], 20);
    assert!(!scan.have_support());
    let types = scan.supported_types();
    assert_eq!(types.len(), 2);
    assert_eq!(types[0].cluster.id, "B");
    assert_eq!(types[0].fraction(), 0.9);
    Ok(())
}

#[test]
fn scan_single_type_below_cutoff() -> Result<(), Report> {
    let scan = scan(vec![profile("A", 0, 9), profile("B", 11, 0)], 20);
    assert!(!scan.have_support());
    let types = scan.supported_types();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].fraction(), 0.55);
    assert_eq!(types[0].percent(), 55);
    Ok(())
}

#[test]
fn scan_ties_keep_definition_order() -> Result<(), Report> {
    let scan = scan(vec![profile("A", 5, 0), profile("B", 5, 0), profile("C", 10, 0)], 20);
    let ids: Vec<_> = scan.supported_types().iter().map(|t| t.cluster.id.clone()).collect();
    assert_eq!(ids, ["C", "A", "B"]);
    Ok(())
}

#[test]
fn scan_candidate_excluded_from_types() -> Result<(), Report> {
    let mut scan = scan(vec![profile("A", 2, 0), profile("CRF01_AE", 18, 0)], 20);
    scan.candidate = Some("CRF01_AE".to_string());
    let types = scan.supported_types();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].cluster.id, "A");
    assert!(!scan.have_support());

    // without the A windows the candidate alone is supported
    scan.profile[0].supported = 0;
    assert!(scan.have_support());

    // a candidate that is not the single supported type is not overall support
    scan.candidate = Some("A".to_string());
    assert!(!scan.have_support());
    Ok(())
}

#[test]
fn scan_best_includes_candidate() -> Result<(), Report> {
    let mut scan = scan(vec![profile("A", 0, 0), profile("CRF01_AE", 19, 1)], 20);
    scan.candidate = Some("CRF01_AE".to_string());
    assert!(scan.have_support());
    assert!(scan.supported_types().is_empty());

    let result = AnalysisResult::from(scan);
    assert_eq!(result.best().map(|c| c.id.as_str()), Some("CRF01_AE"));
    assert_eq!(result.candidate(), Some("CRF01_AE"));
    Ok(())
}

#[test]
fn scan_without_windows() -> Result<(), Report> {
    let scan = scan(vec![profile("A", 0, 0)], 0);
    assert!(!scan.have_support());
    assert!(scan.supported_types().is_empty());
    assert_eq!(scan.bootscan_support("A"), 0.0);
    Ok(())
}
