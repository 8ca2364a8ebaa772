use crate::analysis::Analyses;
use crate::cascade::{Rule, UNASSIGNED};
use crate::cluster::ClusterCatalogue;
use crate::config::Config;
use crate::error::Error;
use crate::runner::Runner;
use crate::tool::{list, toy, ListArgs, Tool, Virus};
use color_eyre::eyre::{Report, Result};
use std::str::FromStr;

#[test]
fn virus_names() -> Result<(), Report> {
    assert_eq!(Virus::from_str("hiv-1")?, Virus::Hiv1);
    assert_eq!(Virus::from_str("hcv")?.to_string(), "hcv");
    assert!(Virus::from_str("HIV").is_err());
    assert_eq!(serde_json::to_string(&Virus::Hiv1)?, "\"hiv-1\"");
    Ok(())
}

#[test]
fn missing_analyses() -> Result<(), Report> {
    let definitions = toy::definitions(Virus::Hiv1);
    let catalogue = ClusterCatalogue::new(definitions.clusters)?;
    let analyses = definitions.analyses.into_iter().filter(|a| a.id != "crfscan").collect();
    let analyses = Analyses::new(catalogue, analyses)?;

    let runner = Runner::new(toy::collaborator(Virus::Hiv1), Default::default(), Default::default());
    let error = Tool::new(Virus::Hiv1, analyses, runner).unwrap_err();
    assert_eq!(
        error.downcast_ref::<Error>(),
        Some(&Error::definition("Definitions for hiv-1 are missing analyses: crfscan"))
    );
    Ok(())
}

#[test]
fn toy_hiv() -> Result<(), Report> {
    let mut tool = toy::tool(Virus::Hiv1)?;
    let outcomes = toy::queries(Virus::Hiv1)
        .iter()
        .map(|query| tool.analyze(query).map(|a| (a.conclusion.rule, a.conclusion.assignment)))
        .collect::<Result<Vec<_>, _>>()?;

    let ids = outcomes.iter().map(|(rule, a)| (*rule, a.id_or_unassigned())).collect::<Vec<_>>();
    assert_eq!(
        ids,
        [
            (Rule::Rule1A, "B"),
            (Rule::Rule4To8, "CRF01_AE"),
            (Rule::Rule2A, UNASSIGNED),
            (Rule::Rule11, "B"),
        ]
    );
    assert_eq!(outcomes[2].1.name, "Recombinant HIV-1 Subtype A (50%), HIV-1 Subtype C (50%)");
    Ok(())
}

#[test]
fn toy_hiv_results() -> Result<(), Report> {
    let mut tool = toy::tool(Virus::Hiv1)?;
    let queries = toy::queries(Virus::Hiv1);

    // pure, scan, crf, then the crfscan and pure re-runs of the probe
    let assessment = tool.analyze(&queries[1])?;
    let analyses: Vec<&str> = assessment.results.iter().map(|r| r.analysis()).collect();
    assert_eq!(analyses, ["pure", "scan", "crf", "crfscan", "pure"]);

    // short sequences only run pure-puzzle
    let assessment = tool.analyze(&queries[3])?;
    let analyses: Vec<&str> = assessment.results.iter().map(|r| r.analysis()).collect();
    assert_eq!(analyses, ["pure-puzzle"]);
    Ok(())
}

#[test]
fn toy_hcv() -> Result<(), Report> {
    let mut tool = toy::tool(Virus::Hcv)?;
    let outcomes = toy::queries(Virus::Hcv)
        .iter()
        .map(|query| {
            let conclusion = tool.analyze(query)?.conclusion;
            Ok::<_, Report>((conclusion.rule, conclusion.assignment.id_or_unassigned().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(
        outcomes,
        [
            (Rule::Subtype, "1a".to_string()),
            (Rule::Genotype, "2".to_string()),
            (Rule::Unassigned, UNASSIGNED.to_string()),
        ]
    );
    Ok(())
}

#[test]
fn load_toy_directory() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    toy::write(Virus::Hiv1, &dir.path())?;

    let tool = Tool::load(&dir.path(), &Config::new())?;
    assert_eq!(tool.virus, Virus::Hiv1);
    assert_eq!(tool.analyses.get("pure")?.reference.len(), 8);
    assert_eq!(tool.analyses.get("crf")?.columns(), toy::COLUMNS);
    assert_eq!(tool.runner.cascade, Config::new().cascade);
    Ok(())
}

#[test]
fn list_definitions() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    toy::write(Virus::Hcv, &dir.path())?;

    let args = ListArgs { virus: None, definitions: Some(dir.path().to_path_buf()) };
    let table = list(&args)?.to_string();
    assert!(table.contains("similarity-search"));
    assert!(table.contains("1a, 1b"));

    let args = ListArgs { virus: None, definitions: Some(dir.path().join("missing")) };
    assert!(list(&args).is_err());
    Ok(())
}
