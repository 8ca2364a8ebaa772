use crate::cluster::{Cluster, ClusterCatalogue, CRF};
use crate::error::Error;
use color_eyre::eyre::{Report, Result};

#[test]
fn crf_tag() -> Result<(), Report> {
    let crf = Cluster::new("CRF02_AG", "HIV-1 CRF 02_AG").with_tags([CRF, "circulating"]);
    assert!(crf.is_crf());
    assert!(crf.has_tag("circulating"));
    assert!(!Cluster::new("B", "B").is_crf());
    Ok(())
}

#[test]
fn contains_taxon() -> Result<(), Report> {
    let cluster = Cluster::new("C", "HIV-1 Subtype C").with_taxa(["C.BW.96", "C.ET.86"]);
    assert!(cluster.contains("C.ET.86"));
    assert!(!cluster.contains("B.FR.83"));
    assert_eq!(cluster.to_string(), "HIV-1 Subtype C");
    Ok(())
}

#[test]
fn catalogue_duplicate_is_definition_error() -> Result<(), Report> {
    let clusters = vec![Cluster::new("1", "Genotype 1"), Cluster::new("1", "Genotype 1b")];
    let report = ClusterCatalogue::new(clusters).unwrap_err();
    assert!(matches!(report.downcast_ref::<Error>(), Some(Error::Definition(_))));
    Ok(())
}

#[test]
fn catalogue_lookup() -> Result<(), Report> {
    let catalogue = ClusterCatalogue::new(vec![
        Cluster::new("1", "Genotype 1"),
        Cluster::new("2", "Genotype 2"),
    ])?;
    assert_eq!(catalogue.len(), 2);
    assert_eq!(catalogue.get("2").map(|c| c.name.as_str()), Some("Genotype 2"));
    assert!(catalogue.get("3").is_none());
    Ok(())
}
