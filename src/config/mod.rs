//! Run configuration: external programs, thresholds, scan defaults and limits.
//!
//! Read once from a JSON file, every missing key takes its default.

#[cfg(test)]
mod tests;

use crate::cascade::CascadeConfig;
use crate::error::Error;
use color_eyre::eyre::{Report, Result, WrapErr};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;

// ----------------------------------------------------------------------------
// Config
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    pub executables: Executables,
    pub cascade: CascadeConfig,
    pub scan: ScanConfig,
    pub limits: Limits,
    /// Seconds an external program may run before it is killed.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

/// Command templates of the external programs, see [`ExternalTools`](crate::runner::ExternalTools).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Executables {
    /// Similarity search, writing BLAST tabular output (`-outfmt 6`) to stdout.
    pub similarity: String,
    /// Tree builder, writing bootstrap replicate trees (Newick) to stdout.
    pub phylo: String,
}

impl Default for Executables {
    fn default() -> Self {
        Executables {
            similarity: "blastn -query {query} -db {database} -outfmt 6".to_string(),
            phylo: String::new(),
        }
    }
}

/// Bootscan defaults, for scan analyses that do not set their own.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Window size, in alignment columns.
    pub window: usize,
    /// Step between windows, in alignment columns.
    pub step: usize,
    /// Fraction of windows at which a cluster counts as a supported type.
    pub type_threshold: f64,
    /// Fraction of windows the single supported type needs for the scan to be supported.
    pub cutoff: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig { window: 500, step: 100, type_threshold: 0.1, cutoff: 0.9 }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Runs with more input sequences are refused.
    pub max_sequences: usize,
    /// Longer sequences (in bases) fail individually.
    pub max_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_sequences: 10_000, max_length: 20_000 }
    }
}

impl Config {
    pub fn new() -> Self {
        Config {
            executables: Executables::default(),
            cascade: CascadeConfig::default(),
            scan: ScanConfig::default(),
            limits: Limits::default(),
            timeout_secs: 3600,
        }
    }

    /// Reads a [`Config`] from a JSON file.
    pub fn read<P>(path: &P) -> Result<Config, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let input = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read configuration: {path:?}."))?;
        let config = serde_json::from_str(&input)
            .wrap_err_with(|| format!("Failed to deserialize configuration: {path:?}"))?;
        Ok(config)
    }

    /// Write a [`Config`] to a JSON file.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        crate::utils::create_parent_dir(path)?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err(format!("Failed to serialize configuration: {path:?}"))?;
        std::fs::write(path, output).wrap_err(format!("Failed to write configuration: {path:?}"))?;
        Ok(())
    }

    /// Override the scan window and step with user input.
    ///
    /// Values that are not positive integers are logged and the configured values are kept.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper::Config;
    ///
    /// let mut config = Config::new();
    /// config.override_scan(Some("400"), Some("fifty"));
    /// assert_eq!((config.scan.window, config.scan.step), (400, 100));
    /// ```
    pub fn override_scan(&mut self, window: Option<&str>, step: Option<&str>) {
        if let Some(value) = window {
            match parse_positive("window", value) {
                Ok(window) => self.scan.window = window,
                Err(e) => warn!("{e}, using the default window size {}.", self.scan.window),
            }
        }
        if let Some(value) = step {
            match parse_positive("step", value) {
                Ok(step) => self.scan.step = step,
                Err(e) => warn!("{e}, using the default step size {}.", self.scan.step),
            }
        }
    }
}

/// Parse a strictly positive integer parameter.
///
/// ```rust
/// use subtyper::config::parse_positive;
/// assert_eq!(parse_positive("window", " 250 "), Ok(250));
/// assert!(parse_positive("window", "0").is_err());
/// assert!(parse_positive("step", "-100").is_err());
/// ```
pub fn parse_positive(name: &str, value: &str) -> Result<usize, Error> {
    match value.trim().parse::<usize>() {
        Ok(number) if number > 0 => Ok(number),
        _ => Err(Error::Parameter { name: name.to_string(), value: value.to_string() }),
    }
}
