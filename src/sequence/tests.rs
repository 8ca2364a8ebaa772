use crate::sequence::{self, Alphabet, Record};
use color_eyre::eyre::{Report, Result};
use std::io::Write;

#[test]
fn length_ignores_gaps() -> Result<(), Report> {
    let record = Record::new("query", "acgt..--nn");
    assert_eq!(record.length(), 6);
    assert_eq!(record.aligned_length(), 10);
    assert_eq!(record.ungapped(), Record::new("query", "acgtnn"));
    Ok(())
}

#[test]
fn missing_is_not_a_base() -> Result<(), Report> {
    assert!(!Record::new("query", "NN--??").has_bases());
    assert!(Record::new("query", "NN-A").has_bases());
    assert!(Alphabet::Missing.contains('n'));
    Ok(())
}

#[test]
fn columns_clamped() -> Result<(), Report> {
    let record = Record::new("query", "ACGT");
    assert_eq!(record.columns(2..10).sequence, ['G', 'T']);
    assert!(record.columns(8..10).sequence.is_empty());
    Ok(())
}

#[test]
fn write_then_read() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("alignment.fasta");
    let records = vec![Record::new("A1", "AC-T"), Record::new("QUERY", "ACGT")];
    sequence::write(&records, &path)?;
    assert_eq!(sequence::read(&path)?, records);
    Ok(())
}

#[test]
fn read_zst() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("input.fasta.zst");
    let compressed = zstd::encode_all(">query\nACGTACGT\n".as_bytes(), 0)?;
    std::fs::File::create(&path)?.write_all(&compressed)?;

    let records = sequence::read(&path)?;
    assert_eq!(records, [Record::new("query", "ACGTACGT")]);
    Ok(())
}
