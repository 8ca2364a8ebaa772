//! The [`Collaborator`] that runs configured external programs.

use crate::config::Config;
use crate::error::Error;
use crate::runner::Collaborator;
use crate::sequence::{self, Record};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::debug;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const POLL: Duration = Duration::from_millis(50);

/// Runs command templates for similarity search and tree building.
///
/// Templates are whitespace separated command lines with placeholders:
///
/// - `{query}`: fasta file of the (ungapped) query.
/// - `{database}`: reference database of the analysis.
/// - `{alignment}`: fasta alignment of the references and the query.
///
/// Commands run inside a temporary directory and must write their result to stdout.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalTools {
    pub similarity: String,
    pub phylo: String,
    pub timeout: Duration,
}

impl ExternalTools {
    pub fn new(config: &Config) -> Self {
        ExternalTools {
            similarity: config.executables.similarity.clone(),
            phylo: config.executables.phylo.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Fill in a command template, run it in `dir`, and return its stdout.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// # #[cfg(unix)] {
    /// use subtyper::{runner::ExternalTools, Config};
    /// let tools = ExternalTools::new(&Config::default());
    /// let dir = tempfile::tempdir()?;
    ///
    /// let output = tools.execute("echo {alignment}", dir.path(), &[("{alignment}", "aln.fasta")])?;
    /// assert_eq!(output, "aln.fasta\n");
    ///
    /// assert!(tools.execute("false", dir.path(), &[]).is_err());
    /// # }
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn execute(
        &self,
        template: &str,
        dir: &Path,
        replacements: &[(&str, &str)],
    ) -> Result<String, Report> {
        let command = replacements
            .iter()
            .fold(template.to_string(), |command, (key, value)| command.replace(key, value));
        let mut args = command.split_whitespace();
        let program = args
            .next()
            .ok_or_else(|| eyre!("No command is configured."))
            .suggestion("Set the executables in the configuration file.")?;

        let stdout_path = dir.join("stdout.txt");
        let stderr_path = dir.join("stderr.txt");
        let stdout = File::create(&stdout_path)?;
        let stderr = File::create(&stderr_path)?;

        debug!("Running: {command}");
        let mut child = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .wrap_err_with(|| format!("Failed to run: {command:?}"))
            .with_suggestion(|| format!("Is {program} installed and on the PATH?"))?;

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if start.elapsed() > self.timeout {
                child.kill()?;
                child.wait()?;
                Err(Error::Timeout { command: command.clone(), seconds: self.timeout.as_secs() })?
            }
            sleep(POLL);
        };

        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            Err(eyre!("Command {command:?} failed with {status}: {}", stderr.trim()))?
        }

        let output = std::fs::read_to_string(&stdout_path)
            .wrap_err_with(|| format!("Failed to read output of: {command:?}"))?;
        Ok(output)
    }
}

impl Collaborator for ExternalTools {
    fn search(&self, query: &Record, database: &Path) -> Result<String, Report> {
        let dir = TempDir::new()?;
        let query_path = dir.path().join("query.fasta");
        sequence::write(&[query.clone()], &query_path)?;

        let query_path = query_path.to_string_lossy();
        let database = database.to_string_lossy();
        self.execute(&self.similarity, dir.path(), &[("{query}", &query_path), ("{database}", &database)])
    }

    fn bootstrap(&self, alignment: &[Record]) -> Result<String, Report> {
        let dir = TempDir::new()?;
        let alignment_path = dir.path().join("alignment.fasta");
        sequence::write(alignment, &alignment_path)?;

        let alignment_path = alignment_path.to_string_lossy();
        self.execute(&self.phylo, dir.path(), &[("{alignment}", &alignment_path)])
    }
}
