use crate::config::CompletionSettings;
use crate::core::frequency::{
    frequency, frequency_segments, has_missing_events, is_considerable, is_frequency_consistent,
    is_ordinal_consistent, observed_pairs,
};
use crate::core::ghost;
use crate::core::ordinal::{candidates_for, is_ordinal_style_consistent};
use crate::core::solver::BacktrackingSolver;
use crate::domain::model::{CompletionOutcome, EventRecord, SeriesTimeline, YearOrdinalPair};
use crate::domain::ports::{OrdinalSolver, OrdinalVariable};

/// Result of completing one series.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionReport {
    pub timeline: SeriesTimeline,
    pub outcome: CompletionOutcome,
}

impl CompletionReport {
    /// Input passed back untouched, in its original order.
    fn unchanged(records: Vec<EventRecord>, outcome: CompletionOutcome) -> Self {
        Self {
            timeline: SeriesTimeline {
                slots: Vec::new(),
                unmatched: records,
            },
            outcome,
        }
    }

    pub fn into_records(self) -> Vec<EventRecord> {
        self.timeline.into_records()
    }
}

/// 系列補全的進入點：序數推斷、求解、頻率判斷、補上缺漏的版次
pub struct SeriesCompletion<S: OrdinalSolver = BacktrackingSolver> {
    settings: CompletionSettings,
    solver: S,
}

impl SeriesCompletion<BacktrackingSolver> {
    pub fn new(settings: CompletionSettings) -> Self {
        let solver = BacktrackingSolver::new(settings.same_year_ordering, settings.solver_max_steps);
        Self { settings, solver }
    }
}

impl Default for SeriesCompletion<BacktrackingSolver> {
    fn default() -> Self {
        Self::new(CompletionSettings::default())
    }
}

impl<S: OrdinalSolver> SeriesCompletion<S> {
    pub fn with_solver(settings: CompletionSettings, solver: S) -> Self {
        Self { settings, solver }
    }

    /// Completed record list: editions in ascending ordinal order, then unmatched records.
    ///
    /// Every input record appears exactly once. When the candidate ordinals contradict the
    /// chronology the input comes back unchanged.
    pub fn complete_series(&self, records: Vec<EventRecord>) -> Vec<EventRecord> {
        self.complete(records).into_records()
    }

    pub fn complete(&self, records: Vec<EventRecord>) -> CompletionReport {
        let mut variables = Vec::new();
        let mut assignable = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let candidates = candidates_for(record);
            if let Some(year) = record.year.filter(|_| !candidates.is_empty()) {
                variables.push(OrdinalVariable { year, candidates });
                assignable.push(index);
            }
        }

        if variables.is_empty() {
            tracing::debug!(
                records = records.len(),
                "No ordinal evidence in series, nothing to complete"
            );
            return CompletionReport::unchanged(records, CompletionOutcome::Empty);
        }

        if !is_ordinal_style_consistent(&records) {
            tracing::debug!("Series titles mix numeric and spelled ordinals");
        }
        if !is_ordinal_consistent(&observed_pairs(&records)) {
            tracing::debug!("Stated ordinals are out of chronological order");
        }

        let values = match self.solver.solve(&variables) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(
                    outcome = "infeasible",
                    records = records.len(),
                    "⚠️ Ordinals contradict the chronology, series left unchanged: {}",
                    e
                );
                return CompletionReport::unchanged(records, CompletionOutcome::Infeasible);
            }
        };

        let mut resolved: Vec<Option<i64>> = vec![None; records.len()];
        for (index, value) in assignable.into_iter().zip(values) {
            resolved[index] = Some(value);
        }

        let mut confirmed = Vec::new();
        let mut orphans = Vec::new();
        for (mut record, value) in records.into_iter().zip(resolved) {
            let Some(value) = value else {
                orphans.push(record);
                continue;
            };
            if let Some(stated) = record.ordinal.filter(|stated| *stated != value) {
                tracing::warn!(
                    source = record.source.as_deref().unwrap_or("unknown"),
                    year = record.year,
                    "Stated ordinal {} replaced by {}",
                    stated,
                    value
                );
            }
            record.ordinal = Some(value);
            confirmed.push(record);
        }

        let pairs = observed_pairs(&confirmed);
        let freq = frequency(&pairs);
        let regular = freq > 0 && is_frequency_consistent(&pairs);
        if regular && self.fits_timeline(&pairs, freq) {
            if has_missing_events(&pairs) {
                tracing::debug!("Series has gaps, synthesizing ghost editions");
            }
            let synthesis = ghost::synthesize(
                confirmed,
                orphans,
                freq,
                self.settings.reattach_orphans,
                self.settings.max_editions,
            );
            let outcome = CompletionOutcome::Completed {
                frequency: freq,
                ghosts: synthesis.timeline.ghost_count(),
                reattached: synthesis.reattached,
            };
            tracing::debug!(
                frequency = freq,
                editions = synthesis.timeline.slots.len(),
                "Series completed"
            );
            return CompletionReport {
                timeline: synthesis.timeline,
                outcome,
            };
        }

        if regular {
            tracing::warn!(
                outcome = "unsupported_frequency",
                max_editions = self.settings.max_editions,
                "⚠️ Timeline out of range, ghost synthesis skipped"
            );
        } else {
            tracing::info!(
                outcome = "unsupported_frequency",
                "No single frequency, ghost synthesis skipped"
            );
            let segments = frequency_segments(&pairs);
            if !segments.is_empty() {
                tracing::debug!(?segments, "Frequency segments");
            }
        }
        CompletionReport {
            timeline: ghost::passthrough(confirmed, orphans),
            outcome: CompletionOutcome::UnsupportedFrequency,
        }
    }

    /// Ghost-only skeleton built from the stated `(year, ordinal)` observations.
    ///
    /// Returns an empty list when a year carries more than one distinct ordinal or the
    /// observations have no single frequency.
    pub fn completed_blank_series(&self, records: &[EventRecord]) -> Vec<YearOrdinalPair> {
        let pairs = observed_pairs(records);
        if let Some(conflict) = pairs.windows(2).find(|w| w[0].year == w[1].year) {
            tracing::warn!(
                year = conflict[0].year,
                "⚠️ Ambiguous ordinals {} and {} in the same year, no blank series",
                conflict[0].ordinal,
                conflict[1].ordinal
            );
            return Vec::new();
        }
        if !is_considerable(&pairs) {
            tracing::debug!(pairs = pairs.len(), "Too few observations for a blank series");
            return Vec::new();
        }
        let freq = frequency(&pairs);
        if freq == 0 {
            tracing::debug!(pairs = pairs.len(), "No frequency for blank series");
            return Vec::new();
        }
        if !self.fits_timeline(&pairs, freq) {
            tracing::warn!(
                max_editions = self.settings.max_editions,
                "⚠️ Blank series out of range, no blank series"
            );
            return Vec::new();
        }
        ghost::blank_timeline(&pairs, freq, self.settings.max_editions)
    }

    /// The highest ordinal stays within `max_editions` and its inception year is representable.
    fn fits_timeline(&self, pairs: &[YearOrdinalPair], freq: i64) -> bool {
        pairs
            .iter()
            .max_by_key(|pair| pair.ordinal)
            .and_then(|anchor| ghost::inception_year(*anchor, freq, self.settings.max_editions))
            .is_some()
    }
}
