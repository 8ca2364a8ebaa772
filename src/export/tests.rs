use crate::cascade::Rule;
use crate::error::Error;
use crate::export::{linelist, Document, LinelistRow, ResultEntry, SequenceEntry, CONCLUSION, FAILED};
use crate::sequence::Record;
use crate::tool::{toy, Virus};
use color_eyre::eyre::{Report, Result, WrapErr};
use indoc::indoc;
use itertools::Itertools;

fn assessed(virus: Virus) -> Result<Vec<SequenceEntry>, Report> {
    let mut tool = toy::tool(virus)?;
    toy::queries(virus)
        .iter()
        .map(|query| Ok(SequenceEntry::assessed(query, &tool.analyze(query)?)))
        .collect()
}

#[test]
fn hiv_entries() -> Result<(), Report> {
    let sequences = assessed(Virus::Hiv1)?;
    let subtype_b = &sequences[0];
    assert_eq!((subtype_b.name.as_str(), subtype_b.length), ("subtype-b", 1000));

    let ids: Vec<&str> = subtype_b.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["pure", "scan", "crf", CONCLUSION]);

    let pure = &subtype_b.results[0];
    assert_eq!(pure.cluster.as_ref().and_then(|c| c.id.as_deref()), Some("B"));
    assert_eq!(pure.best.as_ref().map(|b| (b.support, b.inner, b.outer)), Some((100.0, 100.0, 0.0)));

    let scan = &subtype_b.results[1];
    assert_eq!(scan.support.get("B"), Some(&1.0));
    assert_eq!(scan.nosupport.get("A"), Some(&0.0));

    let conclusion = subtype_b.conclusion().map(|c| (c.rule, c.cluster.clone().unwrap_or_default()));
    let (rule, cluster) = conclusion.unwrap_or_default();
    assert_eq!(rule, Some(Rule::Rule1A));
    assert_eq!(cluster.concluded_id.as_deref(), Some("B"));
    assert_eq!(cluster.concluded_name.as_deref(), Some("HIV-1 Subtype B"));

    // recombinants have no cluster id
    let recombinant = sequences[2].conclusion().and_then(|c| c.cluster.clone()).unwrap_or_default();
    assert_eq!(recombinant.concluded_id.as_deref(), Some("Unassigned"));
    Ok(())
}

#[test]
fn result_ids_unique() -> Result<(), Report> {
    for virus in [Virus::Hiv1, Virus::Hcv] {
        for sequence in assessed(virus)? {
            let ids = sequence.results.iter().map(|r| r.id.as_str()).collect::<Vec<_>>();
            assert_eq!(ids.iter().unique().count(), ids.len(), "{}: {ids:?}", sequence.name);
        }
    }

    // re-runs under the CRF candidate carry it
    let crf = &assessed(Virus::Hiv1)?[1];
    let ids: Vec<&str> = crf.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["pure", "scan", "crf", "crfscan+CRF01_AE", "pure+CRF01_AE", CONCLUSION]);

    let crfscan = &crf.results[3];
    assert_eq!(crfscan.candidate.as_deref(), Some("CRF01_AE"));
    assert_eq!(crfscan.cluster.as_ref().and_then(|c| c.id.as_deref()), Some("CRF01_AE"));
    assert_eq!(crf.results[0].candidate, None);
    Ok(())
}

#[test]
fn failed_entry() -> Result<(), Report> {
    let report = Err::<(), _>(Error::analysis("blast", "Similarity search failed."))
        .wrap_err("Failed to analyze sequence query")
        .unwrap_err();
    let entry = SequenceEntry::failed(&Record::new("query", "AC-GT"), &report);

    assert_eq!(entry.length, 4);
    let conclusion = entry.conclusion().cloned().unwrap_or_default();
    let cluster = conclusion.cluster.unwrap_or_default();
    assert_eq!(cluster.concluded_id.as_deref(), Some("Unassigned"));
    assert_eq!(cluster.concluded_name.as_deref(), Some(FAILED));
    assert_eq!(
        conclusion.error.as_deref(),
        Some("Failed to analyze sequence query: Analysis blast failed: Similarity search failed.")
    );
    assert_eq!(conclusion.rule, None);
    Ok(())
}

#[test]
fn document_keys() -> Result<(), Report> {
    let entry = ResultEntry::from(&toy::tool(Virus::Hcv)?.analyze(&Record::new("q", &"C".repeat(1000)))?.conclusion);
    let json = serde_json::to_string_pretty(&entry)?;
    assert_eq!(
        json,
        indoc! {r#"
            {
              "id": "conclusion",
              "cluster": {
                "concluded-id": "2",
                "concluded-name": "HCV Genotype 2"
              },
              "rule": "genotype",
              "motivation": "Identified with BLAST score > 200"
            }"#}
    );
    Ok(())
}

#[test]
fn write_then_read() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("output").join("results.json");

    let document = Document::new(Virus::Hiv1, assessed(Virus::Hiv1)?);
    document.write(&path)?;
    assert_eq!(Document::read(&path)?, document);
    assert!(Document::read(&dir.path().join("missing.json")).is_err());
    Ok(())
}

#[test]
fn linelist_rows() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("linelist.tsv");

    let mut sequences = assessed(Virus::Hcv)?;
    sequences.push(SequenceEntry::failed(&Record::new("broken", "ACGT"), &Report::msg("tree builder crashed")));
    let document = Document::new(Virus::Hcv, sequences);
    linelist(&document, &path)?;

    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_path(&path)?;
    let rows = reader.deserialize().collect::<Result<Vec<LinelistRow>, _>>()?;
    let outcomes: Vec<(&str, &str, &str)> =
        rows.iter().map(|r| (r.sequence.as_str(), r.concluded_id.as_str(), r.rule.as_str())).collect();
    assert_eq!(
        outcomes,
        [
            ("genotype-1a", "1a", "subtype"),
            ("genotype-2", "2", "genotype"),
            ("short", "Unassigned", "unassigned"),
            ("broken", "Unassigned", ""),
        ]
    );
    assert_eq!(rows[3].error, "tree builder crashed");
    assert_eq!(rows[3].concluded_name, FAILED);
    Ok(())
}
