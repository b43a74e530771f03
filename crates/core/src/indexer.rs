use crate::error::IndexError;
use crate::models::{ImportOptions, NormalizedDocument};
use crate::store::{Batch, BatchEntry, BulkResponse};
use crate::traits::DocumentStore;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").expect("non-word pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// A batch is flushed as soon as it holds this many documents.
    pub max_documents: usize,
    /// A batch is flushed before it would grow past this many bytes.
    pub max_bytes: usize,
}

impl From<&ImportOptions> for BatchLimits {
    fn from(options: &ImportOptions) -> Self {
        Self {
            max_documents: options.max_batch_documents.max(1),
            max_bytes: options.max_batch_bytes,
        }
    }
}

/// Buffers documents for one input and writes them in bulk, in the order
/// they were added. A flush whose response reports item errors is fatal.
pub struct BulkIndexer<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
    limits: BatchLimits,
    label: String,
    dump_dir: PathBuf,
    batch: Batch,
    flushes: usize,
    indexed: usize,
}

impl<'s, S: DocumentStore + ?Sized> BulkIndexer<'s, S> {
    pub fn new(
        store: &'s S,
        limits: BatchLimits,
        label: impl Into<String>,
        dump_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            limits,
            label: label.into(),
            dump_dir: dump_dir.into(),
            batch: Batch::new(),
            flushes: 0,
            indexed: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn indexed(&self) -> usize {
        self.indexed
    }

    pub async fn add(&mut self, document: &NormalizedDocument) -> Result<(), IndexError> {
        let entry = BatchEntry::new(document)?;

        if !self.batch.is_empty() && self.batch.bytes() + entry.encoded_len() > self.limits.max_bytes
        {
            self.flush().await?;
        }

        self.batch.push(entry);

        if self.batch.len() >= self.limits.max_documents {
            self.flush().await?;
        }
        Ok(())
    }

    /// Writes the pending batch, returning how many items the store
    /// acknowledged.
    pub async fn flush(&mut self) -> Result<usize, IndexError> {
        if self.batch.is_empty() {
            return Ok(0);
        }

        self.flushes += 1;
        let flush = self.flushes;
        info!(
            file = %self.label,
            flush,
            documents = self.batch.len(),
            bytes = self.batch.bytes(),
            "bulk insert started"
        );

        let response = self.store.bulk_upsert(&self.batch).await?;
        if response.errors {
            let failed_items = response.failed_items();
            let dump_path = self.dump_response(flush, failed_items, &response).await?;
            warn!(
                file = %self.label,
                flush,
                failed_items,
                dump = %dump_path.display(),
                "bulk insert reported errors"
            );
            return Err(IndexError::BulkOperation {
                flush,
                failed_items,
                dump_path,
            });
        }

        let acknowledged = response.items.len();
        self.indexed += acknowledged;
        self.batch.clear();
        info!(file = %self.label, flush, acknowledged, "bulk insert succeeded");
        Ok(acknowledged)
    }

    /// Flushes the remainder and returns the total acknowledged. On error,
    /// `indexed` still holds what earlier flushes wrote.
    pub async fn finish(&mut self) -> Result<usize, IndexError> {
        self.flush().await?;
        Ok(self.indexed)
    }

    async fn dump_response(
        &self,
        flush: usize,
        failed_items: usize,
        response: &BulkResponse,
    ) -> Result<PathBuf, IndexError> {
        let path = dump_path(&self.dump_dir, &self.label, flush);
        let report = json!({
            "file": self.label,
            "flush": flush,
            "failed_items": failed_items,
            "items": response.items.len(),
            "timestamp": Utc::now().to_rfc3339(),
            "response": response.raw,
        });
        let body = serde_json::to_vec_pretty(&report)?;

        tokio::fs::write(&path, body)
            .await
            .map_err(|source| IndexError::Dump {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

/// `err_<label with non-word characters as '-'>_<flush>.json`
pub fn dump_path(dir: &Path, label: &str, flush: usize) -> PathBuf {
    let escaped = NON_WORD_RE.replace_all(label, "-");
    dir.join(format!("err_{escaped}_{flush}.json"))
}
