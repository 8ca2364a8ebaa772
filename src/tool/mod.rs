//! A virus typing tool: analysis definitions, a runner, and the cascade of the virus.

#[cfg(test)]
mod tests;
pub mod toy;

use crate::analysis::{Analyses, Definitions};
use crate::cascade::{hcv, hiv, Assessment};
use crate::config::Config;
use crate::error::Error;
use crate::runner::{Collaborator, ExternalTools, Runner};
use crate::sequence::Record;
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::{EnumIter, EnumProperty, IntoEnumIterator};
use tabled::Table;

// ----------------------------------------------------------------------------
// Virus
// ----------------------------------------------------------------------------

/// The virus a set of definitions is for, which selects the decision cascade.
#[derive(
    Clone, Copy, Debug, Deserialize, EnumIter, EnumProperty, Eq, Hash, PartialEq, Serialize, ValueEnum,
)]
pub enum Virus {
    /// Human Immunodeficiency Virus 1
    #[serde(rename = "hiv-1")]
    #[value(name = "hiv-1")]
    #[strum(props(description = "HIV-1 subtypes, CRFs and recombinants"))]
    Hiv1,
    /// Hepatitis C Virus
    #[serde(rename = "hcv")]
    #[value(name = "hcv")]
    #[strum(props(description = "HCV genotypes, and subtypes of one genotype"))]
    Hcv,
}

impl Virus {
    /// Ids of the analyses the cascade of this virus runs.
    pub fn required_analyses(&self) -> &'static [&'static str] {
        match self {
            Virus::Hiv1 => &hiv::ANALYSES,
            Virus::Hcv => &hcv::ANALYSES,
        }
    }
}

impl std::fmt::Display for Virus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Virus::Hiv1 => "hiv-1",
            Virus::Hcv => "hcv",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Virus {
    type Err = Report;

    /// Convert a string to a [`Virus`].
    fn from_str(name: &str) -> Result<Self, Report> {
        let virus = match name {
            "hiv-1" => Virus::Hiv1,
            "hcv" => Virus::Hcv,
            _ => Err(eyre!("Unknown virus: {name}"))
                .with_suggestion(|| format!("Please choose from: {}", Virus::iter().join(", ")))?,
        };
        Ok(virus)
    }
}

// ----------------------------------------------------------------------------
// Tool
// ----------------------------------------------------------------------------

/// Everything needed to type the sequences of one virus.
///
/// Each sequence is analyzed with `&mut self`, as the cascade may add a temporary candidate
/// cluster to the analyses. Sequences processed in parallel each use a clone.
#[derive(Clone, Debug)]
pub struct Tool<C> {
    pub virus: Virus,
    pub analyses: Analyses,
    pub runner: Runner<C>,
}

impl<C> Tool<C>
where
    C: Collaborator,
{
    /// Create a tool, checking that the analyses of the virus cascade are defined.
    pub fn new(virus: Virus, analyses: Analyses, runner: Runner<C>) -> Result<Self, Report> {
        let ids = analyses.ids();
        let missing = virus.required_analyses().iter().filter(|id| !ids.contains(*id)).join(", ");
        if !missing.is_empty() {
            Err(Error::definition(format!("Definitions for {virus} are missing analyses: {missing}")))?
        }
        Ok(Tool { virus, analyses, runner })
    }

    /// Run the cascade of the virus for one sequence.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper::tool::{toy, Virus};
    /// use subtyper::cascade::Rule;
    ///
    /// let mut tool = toy::tool(Virus::Hiv1)?;
    /// let query = subtyper::sequence::Record::new("query", &"C".repeat(1000));
    /// let assessment = tool.analyze(&query)?;
    /// assert_eq!(assessment.conclusion.rule, Rule::Rule1A);
    /// assert_eq!(assessment.conclusion.assignment.id.as_deref(), Some("B"));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn analyze(&mut self, query: &Record) -> Result<Assessment, Report> {
        let assessment = match self.virus {
            Virus::Hiv1 => hiv::analyze(&self.runner, &mut self.analyses, query)?,
            Virus::Hcv => hcv::analyze(&self.runner, &self.analyses, query)?,
        };
        let conclusion = &assessment.conclusion;
        info!("{}: {} (rule {})", query.id, conclusion.assignment.name, conclusion.rule);
        Ok(assessment)
    }
}

impl Tool<ExternalTools> {
    /// Load a tool directory, running external programs as configured.
    pub fn load<P>(dir: &P, config: &Config) -> Result<Self, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let (virus, analyses) = Definitions::load(dir)?;
        info!("Loaded {virus} definitions with {} analyses: {dir:?}", analyses.ids().len());
        let runner = Runner::new(ExternalTools::new(config), config.cascade.clone(), config.scan.clone());
        Tool::new(virus, analyses, runner)
    }
}

// ----------------------------------------------------------------------------
// List
// ----------------------------------------------------------------------------

/// List the supported viruses, or the analyses of a tool directory.
#[derive(Clone, Debug, Default, Deserialize, Parser, Serialize)]
#[clap(verbatim_doc_comment)]
pub struct ListArgs {
    /// Only list this virus.
    #[clap(short = 'n', long)]
    pub virus: Option<Virus>,

    /// List the analyses of this tool directory instead.
    #[clap(short = 'd', long)]
    pub definitions: Option<PathBuf>,
}

/// Returns a [`Table`] of supported viruses, or of the analyses in a tool directory.
///
/// ## Examples
///
/// ```rust
/// use subtyper::tool::{list, ListArgs, Virus};
///
/// let table = list(&ListArgs::default())?;
/// assert!(table.to_string().contains("hiv-1"));
///
/// let table = list(&ListArgs { virus: Some(Virus::Hcv), definitions: None })?;
/// assert!(!table.to_string().contains("hiv-1"));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn list(args: &ListArgs) -> Result<Table, Report> {
    let mut builder = tabled::builder::Builder::default();

    match &args.definitions {
        Some(dir) => {
            let (virus, analyses) = Definitions::load(dir)?;
            builder.push_record(["Virus", "Analysis", "Kind", "Clusters"]);
            for analysis in analyses.iter() {
                let clusters = match &analysis.analysis {
                    Some(inner) => format!("({inner})"),
                    None => analysis.clusters.join(", "),
                };
                builder.push_record([virus.to_string(), analysis.id.clone(), analysis.kind.to_string(), clusters]);
            }
        }
        None => {
            builder.push_record(["Virus", "Description", "Analyses"]);
            Virus::iter()
                .filter(|virus| args.virus.map_or(true, |v| v == *virus))
                .for_each(|virus| {
                    let description = virus.get_str("description").unwrap_or_default();
                    let analyses = virus.required_analyses().join(", ");
                    builder.push_record([virus.to_string(), description.to_string(), analyses]);
                });
        }
    }

    Ok(builder.build())
}
