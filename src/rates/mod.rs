//! Rate normalization engine.
//!
//! Pure, synchronous transformations over in-memory observations: gap filling
//! per currency, then cross-rate derivation through the pivot currency. No
//! I/O happens here; fetching and persistence live in [`crate::source`] and
//! [`crate::sync`].

mod cross;
mod currency;
mod diagnostic;
mod error;
mod gap_fill;
mod observation;

pub use cross::{CrossRateCalculator, CrossRates};
pub use currency::{CurrencyCode, CurrencyCodeError};
pub use diagnostic::Diagnostic;
pub use error::RateError;
pub use gap_fill::{FilledSeries, GapFiller};
pub use observation::{ExchangeRateRecord, ObservationKey, RateObservation};

use chrono::NaiveDate;

/// Complete rate set for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    pub observations: Vec<RateObservation>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RateTable {
    /// Gap-fill each raw pivot series over `[start, end]`, pool them and derive
    /// every cross rate among `currencies`.
    ///
    /// Empty series are skipped. Observations are sorted by (date, base,
    /// target) so repeated runs emit identical output.
    pub fn build(
        pivot: &CurrencyCode,
        series: impl IntoIterator<Item = Vec<RateObservation>>,
        currencies: &[CurrencyCode],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, RateError> {
        let filler = GapFiller::new(end).with_start_date(start);
        let mut pooled = Vec::new();
        let mut diagnostics = Vec::new();

        for raw in series {
            if raw.is_empty() {
                continue;
            }
            let filled = filler.fill(&raw)?;
            pooled.extend(filled.observations);
            diagnostics.extend(filled.diagnostics);
        }

        let cross = CrossRateCalculator::new(pooled, pivot.clone())
            .calculate_rebased_rates(currencies)?;
        diagnostics.extend(cross.diagnostics);

        let mut observations = cross.observations;
        observations.sort_by(|a, b| {
            a.date()
                .cmp(&b.date())
                .then_with(|| a.base_currency().cmp(b.base_currency()))
                .then_with(|| a.target_currency().cmp(b.target_currency()))
        });

        Ok(Self {
            observations,
            diagnostics,
        })
    }

    pub fn records(&self) -> Vec<ExchangeRateRecord> {
        self.observations.iter().map(ExchangeRateRecord::from).collect()
    }
}
