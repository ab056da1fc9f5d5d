//! Retrieval of raw pivot-relative observations.
//!
//! Sources hand back sparse series exactly as published. Retries happen here
//! and nowhere else; gap filling and cross rates are left to [`crate::rates`].

#[cfg(feature = "fetch")]
pub mod ecb;
mod error;
mod retry;

use chrono::NaiveDate;

use crate::rates::{CurrencyCode, RateObservation};

#[cfg(feature = "fetch")]
pub use ecb::EcbRateSource;
pub use error::FetchError;
pub use retry::RetryPolicy;

/// Root of the ECB SDMX `EXR` dataflow.
pub const ECB_BASE_URL: &str = "https://data-api.ecb.europa.eu/service/data/EXR/";

#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    /// Published `pivot => target` observations with dates in `[start, end]`,
    /// ordered by date. Days without a publication are simply absent.
    async fn fetch_rates(
        &self,
        target: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>, FetchError>;

    /// Currency every observation of this source is quoted against.
    fn pivot(&self) -> &CurrencyCode;

    fn name(&self) -> &str;
}
