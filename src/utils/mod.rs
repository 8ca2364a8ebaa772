pub mod verbosity;

use color_eyre::eyre::{eyre, ContextCompat, Report, Result, WrapErr};
use color_eyre::Help;
use std::convert::AsRef;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use zstd::stream::read::Decoder;

/// Compression formats that can be read transparently.
pub enum Decompress {
    Zst,
}

impl FromStr for Decompress {
    type Err = Report;
    fn from_str(s: &str) -> Result<Self, Report> {
        match s {
            "zst" => Ok(Decompress::Zst),
            _ext => Err(eyre!("Decompression for {_ext:?} is not implemented yet.")),
        }
    }
}

/// Open a file for buffered reading, decompressing on the fly based on the extension.
///
/// ## Examples
///
/// ```rust
/// use std::io::{BufRead, Write};
///
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("input.fasta.zst");
/// let compressed = zstd::encode_all(">query\nACGT\n".as_bytes(), 0)?;
/// std::fs::File::create(&path)?.write_all(&compressed)?;
///
/// let reader = subtyper::utils::open(&path)?;
/// let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
/// assert_eq!(lines, [">query", "ACGT"]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn open<P>(path: &P) -> Result<Box<dyn BufRead>, Report>
where
    P: AsRef<Path> + Debug,
{
    let file = File::open(path).wrap_err(format!("Failed to open: {path:?}"))?;

    let ext = path.as_ref().extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    let reader: Box<dyn BufRead> = match Decompress::from_str(ext) {
        Ok(Decompress::Zst) => {
            let decoder = Decoder::new(file).wrap_err(format!("Failed to decode: {path:?}"))?;
            Box::new(BufReader::new(decoder))
        }
        Err(_) => Box::new(BufReader::new(file)),
    };

    Ok(reader)
}

/// Create the parent directory of a file path, if it does not exist yet.
pub fn create_parent_dir<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .wrap_err(format!("Failed to create directory: {parent:?}"))?;
        }
    }
    Ok(())
}

/// Get delimiter based on file extension.
///
/// ## Arguments
///
/// - `path` - File path.
///
/// ## Examples
///
/// - `.tsv` => `\t`
/// - `.txt` => `\t`
/// - `.csv` => `,`
///
/// Note that `.txt` is assumed to be tab-delimited!
///
/// ```rust
/// use subtyper::utils::get_delimiter;
///
/// assert_eq!(get_delimiter(&"file.tsv")?, '\t');
/// assert_eq!(get_delimiter(&"file.csv")?, ',');
/// assert_eq!(get_delimiter(&"file.txt")?, '\t');
/// assert!(get_delimiter(&"file").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn get_delimiter<P>(path: &P) -> Result<char, Report>
where
    P: AsRef<Path> + Debug,
{
    let ext = path
        .as_ref()
        .extension()
        .wrap_err(format!("Failed to get file extension: {path:?}"))?
        .to_str()
        .wrap_err(format!("Failed to convert file extension to str: {path:?}"))?;
    // convert extension to the expected delimiter
    match ext {
        "tsv" | "txt" => Ok('\t'),
        "csv" => Ok(','),
        _ext => {
            Err(eyre!("Unknown file extension: {_ext:?}").suggestion("Options: tsv, csv, or txt"))
        }
    }
}
