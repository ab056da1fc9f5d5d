use std::fmt;

use chrono::NaiveDate;

use super::CurrencyCode;

/// Non-fatal condition recorded while normalizing rates. The affected item is
/// left out of the output; everything else proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A requested day precedes the first known rate of the series.
    MissingHistory {
        base: CurrencyCode,
        target: CurrencyCode,
        date: NaiveDate,
    },
    /// No pivot rate for `base` on `date`, so `base => target` can't be derived.
    UnresolvedCrossRate {
        date: NaiveDate,
        base: CurrencyCode,
        target: CurrencyCode,
    },
}

impl Diagnostic {
    pub fn date(&self) -> NaiveDate {
        match self {
            Diagnostic::MissingHistory { date, .. } => *date,
            Diagnostic::UnresolvedCrossRate { date, .. } => *date,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingHistory { base, target, date } => write!(
                f,
                "Missing {base} => {target} rate for {date} with no usable history, try an older start date"
            ),
            Diagnostic::UnresolvedCrossRate { date, base, target } => write!(
                f,
                "No lookup rate for {base} on {date}, cannot derive {base} => {target}"
            ),
        }
    }
}
