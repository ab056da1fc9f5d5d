//! One extraction run: resolve the window, fetch every configured currency,
//! normalize, emit records and advance the checkpoint.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, MIN_LOOKBACK_DAYS};
use crate::output::RecordSink;
use crate::rates::{CurrencyCode, Diagnostic, RateTable};
use crate::source::RateSource;
use crate::state::{Checkpoint, CheckpointStore};

/// Inputs of a sync that come from configuration.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub pivot_currency: CurrencyCode,
    pub currencies: Vec<CurrencyCode>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub lookback_days: u32,
    /// Start at `start_date` even when a checkpoint exists.
    pub start_overrides_checkpoint: bool,
}

impl SyncSettings {
    pub fn new(currencies: Vec<CurrencyCode>, start_date: NaiveDate) -> Self {
        Self {
            pivot_currency: CurrencyCode::eur(),
            currencies,
            start_date,
            end_date: None,
            lookback_days: MIN_LOOKBACK_DAYS,
            start_overrides_checkpoint: false,
        }
    }

    /// Explicitly requested start date. Takes precedence over any checkpoint.
    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self.start_overrides_checkpoint = true;
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            pivot_currency: config.pivot_currency.clone(),
            currencies: config.currencies.clone(),
            start_date: config.start_date,
            end_date: config.end_date,
            lookback_days: config.lookback_days(),
            start_overrides_checkpoint: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// True when `start` was derived from a checkpoint.
    pub resumed: bool,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub window: SyncWindow,
    pub records_emitted: usize,
    pub currencies_fetched: Vec<CurrencyCode>,
    /// Currencies for which the source returned nothing in the window.
    pub currencies_without_data: Vec<CurrencyCode>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ExchangeRateSync {
    source: Arc<dyn RateSource>,
    sink: Arc<dyn RecordSink>,
    checkpoints: Option<Arc<CheckpointStore>>,
    settings: SyncSettings,
    full_refresh: bool,
    clock: Arc<dyn Clock>,
}

impl ExchangeRateSync {
    pub fn new(
        source: Arc<dyn RateSource>,
        sink: Arc<dyn RecordSink>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            sink,
            checkpoints: None,
            settings,
            full_refresh: false,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_checkpoints(mut self, store: Arc<CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    /// Ignore any stored checkpoint and start from the configured start date.
    pub fn with_full_refresh(mut self, full_refresh: bool) -> Self {
        self.full_refresh = full_refresh;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn resolve_window(&self, checkpoint: Option<&Checkpoint>) -> Result<SyncWindow> {
        let end = self.settings.end_date.unwrap_or_else(|| self.clock.today());

        let window = match checkpoint {
            Some(checkpoint) if self.settings.start_overrides_checkpoint && !self.full_refresh => {
                info!(
                    previous_end_date = %checkpoint.end_date,
                    start = %self.settings.start_date,
                    "explicit start date given, ignoring checkpoint"
                );
                SyncWindow {
                    start: self.settings.start_date,
                    end,
                    resumed: false,
                }
            }
            Some(checkpoint) if !self.full_refresh => {
                info!(previous_end_date = %checkpoint.end_date, "resuming from checkpoint");
                let start = checkpoint.resume_start(self.settings.lookback_days);
                info!(
                    start = %start,
                    "new start date covers missing weekend and holiday data"
                );
                SyncWindow {
                    start,
                    end,
                    resumed: true,
                }
            }
            _ => SyncWindow {
                start: self.settings.start_date,
                end,
                resumed: false,
            },
        };

        if window.start > window.end {
            anyhow::bail!(
                "Sync window starts {} after it ends {}",
                window.start,
                window.end
            );
        }
        Ok(window)
    }

    pub async fn run(&self) -> Result<SyncReport> {
        if self.source.pivot() != &self.settings.pivot_currency {
            anyhow::bail!(
                "Source {} quotes against {}, but the configured pivot is {}",
                self.source.name(),
                self.source.pivot(),
                self.settings.pivot_currency
            );
        }

        let checkpoint = match &self.checkpoints {
            Some(store) => store.load().await?,
            None => None,
        };
        let window = self.resolve_window(checkpoint.as_ref())?;
        info!(
            source = self.source.name(),
            start = %window.start,
            end = %window.end,
            currencies = self.settings.currencies.len(),
            "starting exchange rate sync"
        );

        let mut series = Vec::new();
        let mut currencies_fetched = Vec::new();
        let mut currencies_without_data = Vec::new();
        for currency in &self.settings.currencies {
            if *currency == self.settings.pivot_currency {
                continue;
            }
            let raw = self
                .source
                .fetch_rates(currency, window.start, window.end)
                .await
                .with_context(|| format!("Failed to fetch {currency} rates"))?;

            if raw.is_empty() {
                warn!(currency = %currency, "source returned no rates in window");
                currencies_without_data.push(currency.clone());
                continue;
            }
            info!(currency = %currency, observations = raw.len(), "rates fetched");
            currencies_fetched.push(currency.clone());
            series.push(raw);
        }

        let table = RateTable::build(
            &self.settings.pivot_currency,
            series,
            &self.settings.currencies,
            window.start,
            window.end,
        )
        .context("Failed to normalize exchange rates")?;

        let records = table.records();
        self.sink.write_records(&records).await?;

        if let Some(store) = &self.checkpoints {
            store.save(&Checkpoint::new(window.end)).await?;
        }

        info!(
            records = records.len(),
            diagnostics = table.diagnostics.len(),
            "exchange rate sync complete"
        );

        Ok(SyncReport {
            window,
            records_emitted: records.len(),
            currencies_fetched,
            currencies_without_data,
            diagnostics: table.diagnostics,
        })
    }
}
