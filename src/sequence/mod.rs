#[cfg(test)]
mod tests;

use crate::utils;
use color_eyre::eyre::{ContextCompat, Report, Result, WrapErr};
use noodles::{core::Position, fasta};
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fmt::{Debug, Display, Formatter},
    fs::File,
    io::BufWriter,
    ops::Range,
    path::Path,
};

// ----------------------------------------------------------------------------
// Alphabet
// ----------------------------------------------------------------------------

/// Collection of characters that represent sequence bases.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub enum Alphabet {
    #[default]
    #[serde(rename = "dna")]
    Dna,
    #[serde(rename = "deletion")]
    Deletion,
    #[serde(rename = "missing")]
    Missing,
}

impl Alphabet {
    fn get_bases(&self) -> &[char] {
        match self {
            Alphabet::Dna => &['A', 'C', 'G', 'T', 'U'],
            Alphabet::Deletion => &['-', '.'],
            Alphabet::Missing => &['N', '?'],
        }
    }

    /// Returns true if the character belongs to this alphabet, ignoring case.
    pub fn contains(&self, base: char) -> bool {
        self.get_bases().contains(&base.to_ascii_uppercase())
    }
}

impl Display for Alphabet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Alphabet::Dna => "dna",
            Alphabet::Deletion => "deletion",
            Alphabet::Missing => "missing",
        };
        write!(f, "{name}")
    }
}

// ----------------------------------------------------------------------------
// Record
// ----------------------------------------------------------------------------

/// A named, possibly aligned, nucleotide sequence.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub id: String,
    pub sequence: Vec<char>,
}

impl Record {
    /// Create a sequence [`Record`] from text.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper::sequence::Record;
    /// let record = Record::new("query", "AC--GTNN");
    /// assert_eq!(record.aligned_length(), 8);
    /// assert_eq!(record.length(), 6);
    /// ```
    pub fn new(id: &str, sequence: &str) -> Self {
        Record { id: id.to_string(), sequence: sequence.chars().collect() }
    }

    /// Create a sequence [`Record`] from a [`noodles`] [`fasta::Record`].
    pub fn from_noodles(record: fasta::Record) -> Result<Self, Report> {
        let id = record.name().to_string();

        // convert sequence to vec of char bases, noodle positions are 1-based!
        let start = Position::try_from(1)?;
        let sequence = match record.sequence().is_empty() {
            true => Vec::new(),
            false => record
                .sequence()
                .get(start..)
                .wrap_err(format!("Failed to parse sequence record {id}"))?
                .iter()
                .map(|b| *b as char)
                .collect(),
        };

        Ok(Record { id, sequence })
    }

    /// Convert into a [`noodles`] [`fasta::Record`], for writing.
    pub fn to_noodles(&self) -> fasta::Record {
        let definition = fasta::record::Definition::new(self.id.clone(), None);
        let bases: Vec<u8> = self.sequence.iter().map(|b| *b as u8).collect();
        fasta::Record::new(definition, fasta::record::Sequence::from(bases))
    }

    /// Number of bases, gaps excluded.
    pub fn length(&self) -> usize {
        self.sequence.iter().filter(|b| !Alphabet::Deletion.contains(**b)).count()
    }

    /// Number of alignment columns, gaps included.
    pub fn aligned_length(&self) -> usize {
        self.sequence.len()
    }

    /// Returns true if the record has at least one base that is neither a gap nor missing.
    pub fn has_bases(&self) -> bool {
        self.sequence
            .iter()
            .any(|b| !Alphabet::Deletion.contains(*b) && !Alphabet::Missing.contains(*b))
    }

    /// Returns a copy of the record restricted to a range of alignment columns.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper::sequence::Record;
    /// let record = Record::new("query", "----ACGT");
    /// assert!(!record.columns(0..4).has_bases());
    /// assert_eq!(record.columns(2..6), Record::new("query", "--AC"));
    /// ```
    pub fn columns(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.sequence.len());
        let start = range.start.min(end);
        Record { id: self.id.clone(), sequence: self.sequence[start..end].to_vec() }
    }

    /// Returns a copy of the record without gaps.
    pub fn ungapped(&self) -> Self {
        let sequence = self.sequence.iter().filter(|b| !Alphabet::Deletion.contains(**b)).copied();
        Record { id: self.id.clone(), sequence: sequence.collect() }
    }

    /// Returns a copy of the record under another name.
    pub fn renamed(&self, id: &str) -> Self {
        Record { id: id.to_string(), sequence: self.sequence.clone() }
    }
}

// ----------------------------------------------------------------------------
// Reading and Writing
// ----------------------------------------------------------------------------

/// Returns all sequence [`Record`]s in a fasta file (optionally `.zst` compressed).
///
/// ## Examples
///
/// ```rust
/// use subtyper::sequence;
///
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("input.fasta");
/// std::fs::write(&path, ">query_1\nACGT\nACGT\n>query_2\nAC-T\n")?;
///
/// let records = sequence::read(&path)?;
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0].length(), 8);
/// assert_eq!(records[1].id, "query_2");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn read<P>(path: &P) -> Result<Vec<Record>, Report>
where
    P: AsRef<Path> + Debug,
{
    let mut reader = fasta::Reader::new(utils::open(path)?);
    reader
        .records()
        .map(|record| {
            let record = record.wrap_err(format!("Failed to parse fasta record: {path:?}"))?;
            Record::from_noodles(record)
        })
        .collect()
}

/// Write sequence [`Record`]s to a fasta file.
pub fn write<P>(records: &[Record], path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    utils::create_parent_dir(path)?;
    let file = File::create(path).wrap_err(format!("Failed to create: {path:?}"))?;
    let mut writer = fasta::Writer::new(BufWriter::new(file));
    records.iter().try_for_each(|record| {
        writer
            .write_record(&record.to_noodles())
            .wrap_err(format!("Failed to write record {} to {path:?}", record.id))
    })?;
    Ok(())
}
