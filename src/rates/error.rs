use super::CurrencyCode;

/// Errors raised by the rate normalization engine.
///
/// Absent data (missing history, unresolvable cross rates) is not an error; it
/// is reported as a [`super::Diagnostic`]. These variants signal invalid input
/// or an invariant violation upstream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateError {
    #[error("Cannot rebase {observation} onto {new_base} using {lookup}")]
    CompositionMismatch {
        observation: String,
        new_base: CurrencyCode,
        lookup: String,
    },

    #[error("Exchange rate must be positive and finite, got {rate}")]
    InvalidRate { rate: f64 },

    #[error("Base and target currency are both {currency}")]
    SameCurrency { currency: CurrencyCode },

    #[error("Cannot fill gaps in an empty series")]
    EmptySeries,

    #[error("Series for {expected} also contains {found}")]
    MixedSeries { expected: String, found: String },
}
