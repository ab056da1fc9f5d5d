//! ECB SDMX REST source for daily euro foreign exchange reference rates.
//!
//! Every series is published against EUR, so the pivot of this source is
//! always the euro. Responses use the SDMX-JSON `jsondata` format.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error};

use super::{FetchError, RateSource, RetryPolicy, ECB_BASE_URL};
use crate::rates::{CurrencyCode, RateObservation};

/// Only series in a single-series response.
const SERIES_KEY: &str = "0:0:0:0:0";

#[derive(Debug, Deserialize)]
struct SdmxResponse {
    structure: SdmxStructure,
    #[serde(rename = "dataSets", default)]
    data_sets: Vec<SdmxDataSet>,
}

#[derive(Debug, Deserialize)]
struct SdmxStructure {
    dimensions: SdmxDimensions,
}

#[derive(Debug, Deserialize)]
struct SdmxDimensions {
    #[serde(default)]
    observation: Vec<SdmxDimension>,
}

#[derive(Debug, Deserialize)]
struct SdmxDimension {
    #[serde(default)]
    values: Vec<SdmxDimensionValue>,
}

#[derive(Debug, Deserialize)]
struct SdmxDimensionValue {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SdmxDataSet {
    #[serde(default)]
    series: HashMap<String, SdmxSeries>,
}

#[derive(Debug, Deserialize)]
struct SdmxSeries {
    /// Observation index (into the time dimension) -> `[value, attributes...]`.
    #[serde(default)]
    observations: HashMap<String, Vec<serde_json::Value>>,
}

/// Daily reference rates from the European Central Bank.
#[derive(Debug, Clone)]
pub struct EcbRateSource {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
    pivot: CurrencyCode,
}

impl EcbRateSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: ECB_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            pivot: CurrencyCode::eur(),
        }
    }

    /// Build a client that gives up on a single request after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Series key: daily frequency, measured currency, against EUR, foreign
    /// exchange reference rate (SP00), average variation (A).
    fn resource(target: &CurrencyCode) -> String {
        format!("D.{target}.EUR.SP00.A")
    }

    fn url(&self, target: &CurrencyCode) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            Self::resource(target)
        )
    }

    async fn fetch_once(
        &self,
        target: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>, FetchError> {
        let url = self.url(target);
        let start_period = start.format("%Y-%m-%d").to_string();
        let end_period = end.format("%Y-%m-%d").to_string();
        debug!(url = %url, start = %start_period, end = %end_period, "requesting ECB rates");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("startPeriod", start_period.as_str()),
                ("endPeriod", end_period.as_str()),
                ("detail", "dataonly"),
                ("includeHistory", "false"),
                ("format", "jsondata"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // The ECB answers 404 when no observation falls inside the period.
            debug!(currency = %target, "no ECB observations in requested period");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if !status.is_server_error() && status != StatusCode::TOO_MANY_REQUESTS {
                error!(status = status.as_u16(), body = %body, "ECB request rejected");
            }
            return Err(FetchError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        parse_observations(&body, &self.pivot, target)
    }
}

impl Default for EcbRateSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Join the time dimension with series observations by index.
fn parse_observations(
    body: &str,
    pivot: &CurrencyCode,
    target: &CurrencyCode,
) -> Result<Vec<RateObservation>, FetchError> {
    let response: SdmxResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let dates = response
        .structure
        .dimensions
        .observation
        .first()
        .map(|dimension| dimension.values.as_slice())
        .unwrap_or_default();

    let Some(data_set) = response.data_sets.first() else {
        return Ok(Vec::new());
    };
    let series = match data_set.series.get(SERIES_KEY) {
        Some(series) => series,
        None if data_set.series.len() == 1 => match data_set.series.values().next() {
            Some(series) => series,
            None => return Ok(Vec::new()),
        },
        None => return Ok(Vec::new()),
    };

    let mut observations = Vec::with_capacity(series.observations.len());
    for (key, values) in &series.observations {
        let index: usize = key
            .parse()
            .map_err(|_| FetchError::Parse(format!("invalid observation key {key:?}")))?;
        let date_id = dates.get(index).ok_or_else(|| {
            FetchError::Parse(format!("observation {index} has no matching date"))
        })?;
        let date = NaiveDate::parse_from_str(&date_id.id, "%Y-%m-%d")
            .map_err(|e| FetchError::Parse(format!("invalid date {:?}: {e}", date_id.id)))?;

        let Some(rate) = values.first().and_then(serde_json::Value::as_f64) else {
            debug!(currency = %target, date = %date, "skipping observation without value");
            continue;
        };
        observations.push(RateObservation::new(
            date,
            pivot.clone(),
            target.clone(),
            rate,
        )?);
    }

    observations.sort_by_key(RateObservation::date);
    Ok(observations)
}

#[async_trait::async_trait]
impl RateSource for EcbRateSource {
    async fn fetch_rates(
        &self,
        target: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>, FetchError> {
        self.retry
            .run(|| self.fetch_once(target, start, end))
            .await
    }

    fn pivot(&self) -> &CurrencyCode {
        &self.pivot
    }

    fn name(&self) -> &str {
        "ecb"
    }
}
