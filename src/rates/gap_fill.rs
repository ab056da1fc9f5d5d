//! Dense daily series from sparse publications.
//!
//! Reference rates are not published on weekends and holidays. The gap filler
//! turns one currency's irregular series into one observation per calendar
//! day, carrying the last published rate forward.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{Diagnostic, RateError, RateObservation};

/// Output of [`GapFiller::fill`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilledSeries {
    /// One observation per day, strictly increasing by date.
    pub observations: Vec<RateObservation>,
    /// Days that could not be filled because no earlier rate was known.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy)]
pub struct GapFiller {
    start_date: Option<NaiveDate>,
    end_date: NaiveDate,
}

impl GapFiller {
    /// Fill from the earliest known date through `end_date` (inclusive).
    pub fn new(end_date: NaiveDate) -> Self {
        Self {
            start_date: None,
            end_date,
        }
    }

    /// Also walk the days between `start_date` and the earliest known date.
    /// Those days cannot be filled and are reported as missing history.
    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Carry the most recent known rate forward over every day in range.
    ///
    /// All observations must share one (base, target) pair. When two entries
    /// share a date the later one in input order wins.
    pub fn fill(&self, observations: &[RateObservation]) -> Result<FilledSeries, RateError> {
        let first = observations.first().ok_or(RateError::EmptySeries)?;

        let mut known: BTreeMap<NaiveDate, &RateObservation> = BTreeMap::new();
        for observation in observations {
            if observation.base_currency() != first.base_currency()
                || observation.target_currency() != first.target_currency()
            {
                return Err(RateError::MixedSeries {
                    expected: format!("{} => {}", first.base_currency(), first.target_currency()),
                    found: format!(
                        "{} => {}",
                        observation.base_currency(),
                        observation.target_currency()
                    ),
                });
            }
            known.insert(observation.date(), observation);
        }

        let earliest_known = match known.keys().next() {
            Some(date) => *date,
            None => return Err(RateError::EmptySeries),
        };
        let start = match self.start_date {
            Some(start) if start < earliest_known => start,
            _ => earliest_known,
        };

        debug!(
            base = %first.base_currency(),
            target = %first.target_currency(),
            start = %start,
            end = %self.end_date,
            known = known.len(),
            "filling missing dates"
        );

        let mut series = FilledSeries::default();
        let mut last_known: Option<&RateObservation> = None;
        let mut current = start;

        while current <= self.end_date {
            if let Some(observation) = known.get(&current).copied() {
                last_known = Some(observation);
            }

            match last_known {
                Some(observation) => series.observations.push(observation.carried_to(current)),
                None => {
                    warn!(
                        base = %first.base_currency(),
                        target = %first.target_currency(),
                        date = %current,
                        "missing exchange rate with no usable history, try an older start date"
                    );
                    series.diagnostics.push(Diagnostic::MissingHistory {
                        base: first.base_currency().clone(),
                        target: first.target_currency().clone(),
                        date: current,
                    });
                }
            }

            current = match current.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        Ok(series)
    }
}
