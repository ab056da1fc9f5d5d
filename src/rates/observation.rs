use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CurrencyCode, RateError};

/// Uniqueness key of an observation within any produced set.
pub type ObservationKey = (NaiveDate, CurrencyCode, CurrencyCode);

/// One exchange rate for one date: 1 unit of `base_currency` buys
/// `exchange_rate` units of `target_currency`.
///
/// Values are immutable once built; `invert` and `rebase` return new
/// observations.
#[derive(Debug, Clone, PartialEq)]
pub struct RateObservation {
    date: NaiveDate,
    base_currency: CurrencyCode,
    target_currency: CurrencyCode,
    exchange_rate: f64,
}

impl RateObservation {
    pub fn new(
        date: NaiveDate,
        base_currency: CurrencyCode,
        target_currency: CurrencyCode,
        exchange_rate: f64,
    ) -> Result<Self, RateError> {
        if !exchange_rate.is_finite() || exchange_rate <= 0.0 {
            return Err(RateError::InvalidRate {
                rate: exchange_rate,
            });
        }
        if base_currency == target_currency {
            return Err(RateError::SameCurrency {
                currency: base_currency,
            });
        }
        Ok(Self {
            date,
            base_currency,
            target_currency,
            exchange_rate,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base_currency
    }

    pub fn target_currency(&self) -> &CurrencyCode {
        &self.target_currency
    }

    pub fn exchange_rate(&self) -> f64 {
        self.exchange_rate
    }

    pub fn key(&self) -> ObservationKey {
        (
            self.date,
            self.base_currency.clone(),
            self.target_currency.clone(),
        )
    }

    /// Same pair and rate, observed on another day.
    pub(crate) fn carried_to(&self, date: NaiveDate) -> Self {
        Self {
            date,
            ..self.clone()
        }
    }

    /// The reverse direction: target becomes base and the rate is `1 / rate`.
    pub fn invert(&self) -> Self {
        Self {
            date: self.date,
            base_currency: self.target_currency.clone(),
            target_currency: self.base_currency.clone(),
            exchange_rate: 1.0 / self.exchange_rate,
        }
    }

    /// Express this observation's target relative to `new_base`.
    ///
    /// `lookup` must quote `new_base` against this observation's base on the
    /// same date. Rebasing onto the current base returns the observation
    /// unchanged.
    pub fn rebase(
        &self,
        new_base: &CurrencyCode,
        lookup: &RateObservation,
    ) -> Result<Self, RateError> {
        if *new_base == self.base_currency {
            return Ok(self.clone());
        }
        if lookup.target_currency != *new_base
            || lookup.base_currency != self.base_currency
            || lookup.date != self.date
        {
            return Err(RateError::CompositionMismatch {
                observation: self.to_string(),
                new_base: new_base.clone(),
                lookup: lookup.to_string(),
            });
        }
        if *new_base == self.target_currency {
            return Err(RateError::SameCurrency {
                currency: new_base.clone(),
            });
        }
        Ok(Self {
            date: self.date,
            base_currency: new_base.clone(),
            target_currency: self.target_currency.clone(),
            exchange_rate: 1.0 / lookup.exchange_rate * self.exchange_rate,
        })
    }
}

impl fmt::Display for RateObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} => {} @{} ({})>",
            self.base_currency,
            self.target_currency,
            self.date.format("%Y-%m-%d"),
            self.exchange_rate
        )
    }
}

/// Flat output record, one per (date, base, target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateRecord {
    pub date: NaiveDate,
    pub base_currency: String,
    pub target_currency: String,
    pub exchange_rate: f64,
}

impl From<&RateObservation> for ExchangeRateRecord {
    fn from(observation: &RateObservation) -> Self {
        Self {
            date: observation.date,
            base_currency: observation.base_currency.to_string(),
            target_currency: observation.target_currency.to_string(),
            exchange_rate: observation.exchange_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(value: &str) -> CurrencyCode {
        CurrencyCode::parse(value).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(base: &str, target: &str, rate: f64) -> RateObservation {
        RateObservation::new(date(2021, 1, 4), code(base), code(target), rate).unwrap()
    }

    #[test]
    fn new_rejects_non_positive_and_non_finite_rates() {
        for rate in [0.0, -1.2, f64::NAN, f64::INFINITY] {
            let err = RateObservation::new(date(2021, 1, 4), code("EUR"), code("USD"), rate)
                .unwrap_err();
            assert!(matches!(err, RateError::InvalidRate { .. }));
        }
    }

    #[test]
    fn new_rejects_identical_currencies() {
        let err =
            RateObservation::new(date(2021, 1, 4), code("EUR"), code("eur"), 1.0).unwrap_err();
        assert_eq!(
            err,
            RateError::SameCurrency {
                currency: code("EUR")
            }
        );
    }

    #[test]
    fn invert_swaps_currencies_and_rate() {
        let inverted = obs("EUR", "USD", 1.25).invert();
        assert_eq!(inverted.base_currency().as_str(), "USD");
        assert_eq!(inverted.target_currency().as_str(), "EUR");
        assert_eq!(inverted.date(), date(2021, 1, 4));
        assert!((inverted.exchange_rate() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn double_inversion_restores_observation() {
        for rate in [1.1, 0.85, 129.37, 0.000_731] {
            let original = obs("EUR", "JPY", rate);
            let round_trip = original.invert().invert();
            assert_eq!(round_trip.key(), original.key());
            assert!((round_trip.exchange_rate() - rate).abs() <= rate * 1e-12);
        }
    }

    #[test]
    fn rebase_onto_own_base_is_identity() {
        let usd = obs("EUR", "USD", 1.10);
        let unrelated = obs("GBP", "CHF", 1.17);
        assert_eq!(usd.rebase(&code("EUR"), &unrelated).unwrap(), usd);
    }

    #[test]
    fn rebase_composes_through_the_pivot() {
        let gbp = obs("EUR", "GBP", 0.85);
        let usd = obs("EUR", "USD", 1.10);

        let usd_gbp = gbp.rebase(&code("USD"), &usd).unwrap();
        assert_eq!(usd_gbp.base_currency().as_str(), "USD");
        assert_eq!(usd_gbp.target_currency().as_str(), "GBP");
        assert!((usd_gbp.exchange_rate() - 0.85 / 1.10).abs() < 1e-12);
    }

    #[test]
    fn rebase_rejects_lookup_with_wrong_target() {
        let gbp = obs("EUR", "GBP", 0.85);
        let chf = obs("EUR", "CHF", 1.08);
        let err = gbp.rebase(&code("USD"), &chf).unwrap_err();
        assert!(matches!(err, RateError::CompositionMismatch { .. }));
    }

    #[test]
    fn rebase_rejects_lookup_with_wrong_base() {
        let gbp = obs("EUR", "GBP", 0.85);
        let usd_from_chf = obs("CHF", "USD", 1.02);
        let err = gbp.rebase(&code("USD"), &usd_from_chf).unwrap_err();
        assert!(matches!(err, RateError::CompositionMismatch { .. }));
    }

    #[test]
    fn rebase_rejects_lookup_from_another_day() {
        let gbp = obs("EUR", "GBP", 0.85);
        let usd = RateObservation::new(date(2021, 1, 5), code("EUR"), code("USD"), 1.1).unwrap();
        assert!(gbp.rebase(&code("USD"), &usd).is_err());
    }

    #[test]
    fn rebase_onto_own_target_is_rejected() {
        let usd = obs("EUR", "USD", 1.10);
        let err = usd.rebase(&code("USD"), &usd).unwrap_err();
        assert!(matches!(err, RateError::SameCurrency { .. }));
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(
            obs("EUR", "USD", 1.1).to_string(),
            "<EUR => USD @2021-01-04 (1.1)>"
        );
    }

    #[test]
    fn record_serializes_plain_fields() {
        let record = ExchangeRateRecord::from(&obs("EUR", "USD", 1.1));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "date": "2021-01-04",
                "base_currency": "EUR",
                "target_currency": "USD",
                "exchange_rate": 1.1
            })
        );
    }
}
