//! Cross-rate derivation through the pivot currency.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::observation::ObservationKey;
use super::{CurrencyCode, Diagnostic, RateError, RateObservation};

/// Output of [`CrossRateCalculator::calculate_rebased_rates`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossRates {
    /// The working set followed by every derived cross rate. No two entries
    /// share a (date, base, target) triple.
    pub observations: Vec<RateObservation>,
    /// (date, pair) combinations skipped for lack of a pivot lookup rate.
    pub diagnostics: Vec<Diagnostic>,
}

/// Derives any-to-any rates from pivot-relative observations.
///
/// Every index below is built once in [`CrossRateCalculator::new`] and is
/// read-only afterwards, so calculations are independent of each other.
#[derive(Debug, Clone)]
pub struct CrossRateCalculator {
    pivot: CurrencyCode,
    /// Input observations followed by the materialized pivot inverses.
    rates: Vec<RateObservation>,
    /// Date -> positions in `rates`, in insertion order.
    by_date: BTreeMap<NaiveDate, Vec<usize>>,
    /// (date, target) -> position of the `pivot => target` rate.
    pivot_lookup: HashMap<(NaiveDate, CurrencyCode), usize>,
}

impl CrossRateCalculator {
    pub fn new(rates: impl IntoIterator<Item = RateObservation>, pivot: CurrencyCode) -> Self {
        let mut seen: HashSet<ObservationKey> = HashSet::new();
        let mut working: Vec<RateObservation> = Vec::new();

        for rate in rates {
            if seen.insert(rate.key()) {
                working.push(rate);
            } else {
                debug!(rate = %rate, "dropping duplicate observation");
            }
        }

        let inverses: Vec<RateObservation> = working
            .iter()
            .filter(|rate| *rate.base_currency() == pivot)
            .map(RateObservation::invert)
            .collect();
        for inverse in inverses {
            if seen.insert(inverse.key()) {
                working.push(inverse);
            }
        }

        let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        let mut pivot_lookup = HashMap::new();
        for (index, rate) in working.iter().enumerate() {
            by_date.entry(rate.date()).or_default().push(index);
            if *rate.base_currency() == pivot {
                pivot_lookup.insert((rate.date(), rate.target_currency().clone()), index);
            }
        }

        Self {
            pivot,
            rates: working,
            by_date,
            pivot_lookup,
        }
    }

    /// Input observations plus the materialized inverses of pivot rates.
    pub fn rates(&self) -> &[RateObservation] {
        &self.rates
    }

    fn lookup(&self, date: NaiveDate, target: &CurrencyCode) -> Option<&RateObservation> {
        self.pivot_lookup
            .get(&(date, target.clone()))
            .map(|&index| &self.rates[index])
    }

    /// Rebase every pivot rate onto each requested currency, date by date.
    ///
    /// For `new_base = B` and each `pivot => T` rate on a date this yields
    /// `B => T = rate(pivot, T) / rate(pivot, B)`. Requesting every currency
    /// of interest therefore produces all ordered pairs among them.
    ///
    /// A missing `pivot => B` lookup only skips the affected pairs and is
    /// reported in [`CrossRates::diagnostics`]. A composition mismatch is an
    /// invariant violation and aborts the calculation.
    pub fn calculate_rebased_rates(
        &self,
        currencies: &[CurrencyCode],
    ) -> Result<CrossRates, RateError> {
        let mut requested: Vec<&CurrencyCode> = Vec::new();
        for currency in currencies {
            if !requested.contains(&currency) {
                requested.push(currency);
            }
        }

        let mut seen: HashSet<ObservationKey> = self.rates.iter().map(RateObservation::key).collect();
        let mut result = CrossRates {
            observations: self.rates.clone(),
            diagnostics: Vec::new(),
        };

        for (&date, indices) in &self.by_date {
            for &new_base in &requested {
                if *new_base == self.pivot {
                    debug!(currency = %new_base, "skipping pivot, it is already a base");
                    continue;
                }

                let lookup = self.lookup(date, new_base);
                for &index in indices {
                    let rate = &self.rates[index];
                    if *rate.base_currency() != self.pivot {
                        // Inversions are reached from the other direction.
                        continue;
                    }
                    if rate.target_currency() == new_base {
                        continue;
                    }

                    let Some(lookup) = lookup else {
                        warn!(
                            date = %date,
                            base = %new_base,
                            target = %rate.target_currency(),
                            "no lookup rate found, cannot create conversion"
                        );
                        result.diagnostics.push(Diagnostic::UnresolvedCrossRate {
                            date,
                            base: new_base.clone(),
                            target: rate.target_currency().clone(),
                        });
                        continue;
                    };

                    let rebased = rate.rebase(new_base, lookup)?;
                    if seen.insert(rebased.key()) {
                        result.observations.push(rebased);
                    } else {
                        debug!(rate = %rebased, "cross rate already present");
                    }
                }
            }
        }

        debug!(
            pivot = %self.pivot,
            total = result.observations.len(),
            skipped = result.diagnostics.len(),
            "cross rates calculated"
        );

        Ok(result)
    }
}
