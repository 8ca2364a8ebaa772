use crate::cascade::CascadeConfig;
use crate::config::{Config, ScanConfig};
use crate::error::Error;
use crate::export::Document;
use crate::run::CONFIG_FILE;
use crate::runner::Runner;
use crate::tool::{toy, Tool, Virus};
use crate::verify::{assess, self_scan, verify, VerifyArgs, SELF_SCAN_FILE};
use color_eyre::eyre::{eyre, Report, Result};

#[test]
fn reference_left_out() -> Result<(), Report> {
    // 6 pure references, one left out, and the query
    let collaborator = toy::Scripted::new(
        |_, _| Ok(String::new()),
        |alignment| match alignment.len() {
            6 => toy::nearest_neighbour_trees(alignment, toy::REPLICATES),
            n => Err(eyre!("Expected 6 sequences, found {n}")),
        },
    );
    let runner = Runner::new(collaborator, CascadeConfig::default(), ScanConfig::default());
    let tool = Tool::new(Virus::Hiv1, toy::analyses(Virus::Hiv1)?, runner)?;

    let scans = self_scan(&tool.runner, &tool.analyses, "scan-pure-self")?;
    assert_eq!(scans.len(), 6);
    let a1 = &scans[0];
    assert_eq!((a1.reference.id.as_str(), a1.cluster.id.as_str()), ("A.1", "A"));
    assert_eq!(a1.scan.window_count, 6);
    assert_eq!(a1.scan.bootscan_support("A"), 1.0);
    Ok(())
}

#[test]
fn self_scan_document() -> Result<(), Report> {
    let document = assess(&toy::tool(Virus::Hiv1)?)?;
    let names: Vec<&str> = document.sequences.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["A.1", "A.2", "B.1", "B.2", "C.1", "C.2"]);

    let b2 = &document.sequences[3];
    assert_eq!(b2.length, toy::COLUMNS);
    let ids: Vec<&str> = b2.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["scan-pure-self"]);
    assert_eq!(b2.results[0].cluster.as_ref().and_then(|c| c.id.as_deref()), Some("B"));
    assert_eq!(b2.results[0].support.get("B"), Some(&1.0));
    Ok(())
}

#[test]
fn no_self_scan_analysis() -> Result<(), Report> {
    let error = assess(&toy::tool(Virus::Hcv)?).unwrap_err();
    assert_eq!(
        error.downcast_ref::<Error>(),
        Some(&Error::definition("Definitions for hcv have no self-scan analysis."))
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn verify_toy_directory() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let tool_dir = dir.path().join("hiv-1");
    toy::write(Virus::Hiv1, &tool_dir)?;

    // every replicate places the query next to B.1
    let trees = dir.path().join("trees.nwk");
    std::fs::write(&trees, "((A.1,A.2),(B.2,(B.1,QUERY)),(C.1,C.2));\n".repeat(4))?;
    let mut config = Config::new();
    config.executables.phylo = format!("cat {}", trees.display());
    let config_path = dir.path().join("config.json");
    config.write(&config_path)?;

    let args = VerifyArgs {
        definitions: tool_dir,
        output_dir: dir.path().join("output"),
        config: Some(config_path),
        window: Some("400".to_string()),
        step: Some("ten".to_string()),
    };
    verify(&args)?;

    let document = Document::read(&args.output_dir.join(SELF_SCAN_FILE))?;
    assert_eq!(document.virus, Virus::Hiv1);
    assert_eq!(document.sequences.len(), 6);

    // the query of B.2 joins B.1, the query of A.1 is never placed in A
    let support = |name: &str, id: &str| {
        document.sequences.iter().find(|s| s.name == name).and_then(|s| s.results[0].support.get(id).copied())
    };
    assert_eq!(support("B.2", "B"), Some(1.0));
    assert_eq!(support("A.1", "A"), Some(0.0));

    // a step that is not a number keeps the configured value
    let config = Config::read(&args.output_dir.join(CONFIG_FILE))?;
    assert_eq!((config.scan.window, config.scan.step), (400, 100));
    Ok(())
}
