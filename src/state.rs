//! Resumption checkpoint.
//!
//! A sync records the last end date it fully emitted. The next run restarts a
//! few days earlier so that a carry-forward window spanning the previous end
//! (a weekend, a holiday) is rebuilt from published data.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub end_date: NaiveDate,
}

impl Checkpoint {
    pub fn new(end_date: NaiveDate) -> Self {
        Self { end_date }
    }

    /// First day to request when resuming with `lookback_days` of overlap.
    pub fn resume_start(&self, lookback_days: u32) -> NaiveDate {
        self.end_date
            .checked_sub_signed(Duration::days(i64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// JSON file holding a single [`Checkpoint`].
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no sync has completed yet.
    pub async fn load(&self) -> Result<Option<Checkpoint>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read checkpoint: {}", self.path.display())
                })
            }
        };

        let checkpoint = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse checkpoint: {}", self.path.display()))?;
        Ok(Some(checkpoint))
    }

    /// Write through a temporary sibling file so a crash never leaves a
    /// truncated checkpoint behind.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create checkpoint directory")?;
        }

        let content =
            serde_json::to_string_pretty(checkpoint).context("Failed to serialize checkpoint")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write checkpoint: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace checkpoint: {}", self.path.display()))?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove checkpoint"),
        }
    }
}
