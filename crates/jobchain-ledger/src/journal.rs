//! Fact journal
//!
//! Append-only persistence for [`FactEnvelope`]s. The service appends a fact
//! before reducing it, so anything visible in memory is already durable.
//!
//! [`FileJournal`] stores one JSON envelope per line. A final line without a
//! trailing newline is treated as a torn write from an interrupted append and
//! is truncated away on load, so later appends start on a clean line. A
//! failed append truncates the file back to its previous length before
//! returning, so the journal never holds an entry the caller saw rejected.

use crate::error::LedgerError;
use crate::facts::FactEnvelope;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only fact storage.
#[async_trait]
pub trait FactJournal: Send + Sync {
    /// Durably append one envelope.
    ///
    /// On error the envelope must not be visible to a later [`load`].
    ///
    /// [`load`]: FactJournal::load
    async fn append(&self, envelope: &FactEnvelope) -> Result<(), LedgerError>;

    /// Load all envelopes in append order.
    async fn load(&self) -> Result<Vec<FactEnvelope>, LedgerError>;
}

/// Journal held in memory; contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<FactEnvelope>>,
}

impl MemoryJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored envelopes.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the journal is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl FactJournal for MemoryJournal {
    async fn append(&self, envelope: &FactEnvelope) -> Result<(), LedgerError> {
        self.entries.lock().await.push(envelope.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<FactEnvelope>, LedgerError> {
        Ok(self.entries.lock().await.clone())
    }
}

/// JSON-lines journal on the local filesystem.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    // Serializes appends from this process.
    write_lock: Mutex<()>,
}

impl FileJournal {
    /// Open (or lazily create) a journal at `path`.
    ///
    /// Parent directories are created on first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn write_synced(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await
}

#[async_trait]
impl FactJournal for FileJournal {
    async fn append(&self, envelope: &FactEnvelope) -> Result<(), LedgerError> {
        let mut line = envelope.to_line()?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let start = file.metadata().await?.len();
        if let Err(e) = write_synced(&mut file, line.as_bytes()).await {
            let rollback = match file.set_len(start).await {
                Ok(()) => file.sync_data().await,
                Err(rollback) => Err(rollback),
            };
            match rollback {
                Ok(()) => tracing::warn!(
                    path = %self.path.display(),
                    seq = envelope.seq,
                    error = %e,
                    "Journal append failed, file restored"
                ),
                Err(rollback) => tracing::error!(
                    path = %self.path.display(),
                    seq = envelope.seq,
                    error = %e,
                    rollback_error = %rollback,
                    "Journal append failed and could not be rolled back"
                ),
            }
            return Err(e.into());
        }

        tracing::debug!(
            path = %self.path.display(),
            seq = envelope.seq,
            kind = envelope.fact.sub_type(),
            "Fact appended to journal"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Vec<FactEnvelope>, LedgerError> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        // Bytes, not text: a torn write may end inside a multi-byte character.
        let mut lines: Vec<&[u8]> = contents.split(|byte| *byte == b'\n').collect();
        // `split` leaves either an empty tail (clean file) or a torn last line.
        let tail = lines.pop().unwrap_or_default();
        if !tail.is_empty() {
            tracing::warn!(
                path = %self.path.display(),
                bytes = tail.len(),
                "Truncating torn trailing journal entry"
            );
            let _guard = self.write_lock.lock().await;
            let file = OpenOptions::new().write(true).open(&self.path).await?;
            file.set_len((contents.len() - tail.len()) as u64).await?;
            file.sync_data().await?;
        }

        let mut envelopes = Vec::with_capacity(lines.len());
        for (line_no, line) in lines.into_iter().enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let envelope = std::str::from_utf8(line)
                .map_err(|e| LedgerError::codec(e.to_string()))
                .and_then(FactEnvelope::from_line)
                .map_err(|e| {
                    LedgerError::codec(format!(
                        "{}:{}: {e}",
                        self.path.display(),
                        line_no + 1
                    ))
                })?;
            envelopes.push(envelope);
        }

        tracing::debug!(
            path = %self.path.display(),
            facts = envelopes.len(),
            "Journal loaded"
        );
        Ok(envelopes)
    }
}
