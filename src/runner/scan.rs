use crate::analysis::{Analyses, Kind};
use crate::error::Error;
use crate::result::{ScanResult, WindowProfile};
use crate::runner::{definition, Collaborator, Runner};
use crate::sequence::Record;
use color_eyre::eyre::{Report, Result};
use log::debug;
use std::ops::Range;

/// Returns the column ranges of a sliding window along an alignment.
///
/// Alignments that are not longer than one window yield a single window over all columns.
///
/// ## Examples
///
/// ```rust
/// use subtyper::runner::scan::windows;
///
/// assert_eq!(windows(1000, 500, 250), [0..500, 250..750, 500..1000]);
/// assert_eq!(windows(1100, 500, 250), [0..500, 250..750, 500..1000]);
/// assert_eq!(windows(300, 500, 100), [0..300]);
/// assert!(windows(0, 500, 100).is_empty());
/// ```
pub fn windows(columns: usize, window: usize, step: usize) -> Vec<Range<usize>> {
    if columns == 0 {
        return Vec::new();
    }
    if columns <= window || window == 0 {
        return vec![0..columns];
    }
    (0..=columns - window).step_by(step.max(1)).map(|start| start..start + window).collect()
}

impl<C> Runner<C>
where
    C: Collaborator,
{
    /// Bootscan the query, running the inner phylo-cluster analysis on every window.
    ///
    /// A window counts as supported for its best cluster when the inner result has support,
    /// otherwise as unsupported for that cluster. Windows where the query has no bases are skipped.
    pub fn scan(
        &self,
        analyses: &Analyses,
        id: &str,
        query: &Record,
    ) -> Result<ScanResult, Report> {
        let definition = definition(analyses, id, Kind::Scan)?;
        let inner = definition
            .analysis
            .as_deref()
            .ok_or_else(|| Error::analysis(id, "No inner phylo-cluster analysis is defined."))?;
        let inner_definition = analyses.get(inner)?;

        let window = definition.window.unwrap_or(self.scan.window);
        let step = definition.step.unwrap_or(self.scan.step);
        let cutoff = definition.cutoff.unwrap_or(self.scan.cutoff);

        let mut profile: Vec<WindowProfile> = analyses
            .clusters(inner)?
            .into_iter()
            .map(|cluster| WindowProfile { cluster: cluster.clone(), supported: 0, unsupported: 0 })
            .collect();

        let mut window_count = 0;
        for columns in windows(inner_definition.columns(), window, step) {
            if !query.columns(columns.clone()).has_bases() {
                debug!("{}: skipping window {columns:?} without bases", query.id);
                continue;
            }
            window_count += 1;

            let result = self.phylo_columns(analyses, inner, query, Some(columns))?;
            let Some(best) = &result.best else { continue };
            if let Some(counts) = profile.iter_mut().find(|p| p.cluster.id == best.id) {
                match result.have_support() {
                    true => counts.supported += 1,
                    false => counts.unsupported += 1,
                }
            }
        }
        debug!("{}: analysis {id} scanned {window_count} windows", query.id);

        Ok(ScanResult {
            analysis: id.to_string(),
            profile,
            window_count,
            candidate: inner_definition.candidate.clone().or(definition.candidate.clone()),
            type_threshold: self.scan.type_threshold,
            cutoff,
        })
    }
}
