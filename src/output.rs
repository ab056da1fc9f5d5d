//! Record emission.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::rates::ExchangeRateRecord;

#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    /// Emit one batch of records. A sync hands over its whole batch at once.
    async fn write_records(&self, records: &[ExchangeRateRecord]) -> Result<()>;
}

#[derive(Debug, Clone)]
enum JsonlTarget {
    Stdout,
    File { path: PathBuf, append: bool },
}

/// One JSON object per line, to stdout or a file.
#[derive(Debug, Clone)]
pub struct JsonlRecordSink {
    target: JsonlTarget,
}

impl JsonlRecordSink {
    pub fn stdout() -> Self {
        Self {
            target: JsonlTarget::Stdout,
        }
    }

    /// Replace the file's contents on every write.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            target: JsonlTarget::File {
                path: path.as_ref().to_path_buf(),
                append: false,
            },
        }
    }

    /// Append to the file, keeping earlier runs.
    pub fn append(path: impl AsRef<Path>) -> Self {
        Self {
            target: JsonlTarget::File {
                path: path.as_ref().to_path_buf(),
                append: true,
            },
        }
    }

    fn encode(records: &[ExchangeRateRecord]) -> Result<String> {
        let mut content = String::new();
        for record in records {
            let line = serde_json::to_string(record).context("Failed to serialize record")?;
            content.push_str(&line);
            content.push('\n');
        }
        Ok(content)
    }

    async fn write_to<W: AsyncWrite + Unpin>(writer: &mut W, content: &str) -> Result<()> {
        writer.write_all(content.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordSink for JsonlRecordSink {
    async fn write_records(&self, records: &[ExchangeRateRecord]) -> Result<()> {
        let content = Self::encode(records)?;

        match &self.target {
            JsonlTarget::Stdout => {
                let mut stdout = tokio::io::stdout();
                Self::write_to(&mut stdout, &content)
                    .await
                    .context("Failed to write records to stdout")?;
            }
            JsonlTarget::File { path, append } => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .await
                        .context("Failed to create output directory")?;
                }
                let mut file = fs::OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(*append)
                    .truncate(!*append)
                    .open(path)
                    .await
                    .with_context(|| format!("Failed to open output file: {}", path.display()))?;
                Self::write_to(&mut file, &content)
                    .await
                    .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            }
        }

        Ok(())
    }
}

/// Collects records in memory.
#[derive(Default)]
pub struct MemoryRecordSink {
    records: tokio::sync::Mutex<Vec<ExchangeRateRecord>>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ExchangeRateRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl RecordSink for MemoryRecordSink {
    async fn write_records(&self, records: &[ExchangeRateRecord]) -> Result<()> {
        self.records.lock().await.extend_from_slice(records);
        Ok(())
    }
}
