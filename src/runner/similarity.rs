use crate::analysis::{Analyses, Kind};
use crate::error::Error;
use crate::result::SimilarityResult;
use crate::runner::{definition, Collaborator, Runner};
use crate::sequence::Record;
use color_eyre::eyre::{Report, Result, WrapErr};
use log::debug;

/// One line of tabular similarity search output.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub query: String,
    pub subject: String,
    pub bitscore: f64,
}

/// Parse BLAST tabular output (`-outfmt 6`), skipping blank and comment lines.
///
/// ## Examples
///
/// ```rust
/// use subtyper::runner::similarity::parse_hits;
///
/// let output = "# BLASTN 2.14.0+\n\
///               query\t1a.H77\t95.1\t1000\t49\t0\t1\t1000\t1\t1000\t0.0\t1578\n\
///               query\t1b.J1\t80.2\t1000\t198\t0\t1\t1000\t1\t1000\t0.0\t1024.5\n";
/// let hits = parse_hits(output)?;
/// assert_eq!(hits.len(), 2);
/// assert_eq!(hits[0].subject, "1a.H77");
/// assert_eq!(hits[1].bitscore, 1024.5);
///
/// assert!(parse_hits("query\t1a.H77\t95.1").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn parse_hits(output: &str) -> Result<Vec<Hit>, Report> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| -> Result<Hit, Report> {
            let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
            if columns.len() < 12 {
                Err(Error::analysis(
                    "similarity-search",
                    format!("Expected 12 tab separated columns, found {}: {line:?}", columns.len()),
                ))?
            }
            let bitscore = columns[11]
                .parse()
                .map_err(|_| Error::analysis("similarity-search", format!("Invalid bit score: {line:?}")))?;
            Ok(Hit { query: columns[0].to_string(), subject: columns[1].to_string(), bitscore })
        })
        .collect()
}

impl<C> Runner<C>
where
    C: Collaborator,
{
    /// Search the query against the analysis database and map the top hit to a cluster.
    ///
    /// The top hit is the hit with the highest bit score, the first one on ties. A search
    /// without hits is an unsupported result with score 0.
    pub fn similarity(
        &self,
        analyses: &Analyses,
        id: &str,
        query: &Record,
    ) -> Result<SimilarityResult, Report> {
        let definition = definition(analyses, id, Kind::SimilaritySearch)?;
        let cutoff = definition.cutoff.unwrap_or(self.cascade.similarity_score_threshold);
        let database = definition
            .database
            .as_ref()
            .ok_or_else(|| Error::analysis(id, "No database is defined."))?;

        let output = self
            .collaborator
            .search(&query.ungapped(), database)
            .wrap_err_with(|| Error::analysis(id, "Similarity search failed."))?;
        let hits = parse_hits(&output).wrap_err_with(|| Error::analysis(id, "Unparsable output."))?;
        debug!("{}: {} hits for analysis {id}", query.id, hits.len());

        // first hit wins on ties
        let top = hits.iter().fold(None, |top: Option<&Hit>, hit| match top {
            Some(top) if top.bitscore >= hit.bitscore => Some(top),
            _ => Some(hit),
        });

        let Some(top) = top else {
            return Ok(SimilarityResult {
                analysis: id.to_string(),
                cluster: None,
                score: 0.0,
                cutoff,
                hit: None,
            });
        };

        let cluster = analyses
            .clusters(id)?
            .into_iter()
            .find(|c| c.contains(&top.subject))
            .ok_or_else(|| {
                Error::analysis(id, format!("Hit {:?} does not belong to any cluster.", top.subject))
            })?;

        Ok(SimilarityResult {
            analysis: id.to_string(),
            cluster: Some(cluster.clone()),
            score: top.bitscore,
            cutoff,
            hit: Some(top.subject.clone()),
        })
    }
}
