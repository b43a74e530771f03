use crate::error::{ImportError, StoreError};
use crate::extractor::DocumentExtractor;
use crate::ingest::{import_file, FileFailure, FileReport};
use crate::models::{FileStatus, ImportOptions, ImportResult, ImportSummary};
use crate::store::index_definition;
use crate::traits::DocumentStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Runs one import task per file, at most `pool_size` at a time. A failed
/// file never stops the others.
pub struct ImportCoordinator<S>
where
    S: DocumentStore + 'static,
{
    store: Arc<S>,
    extractor: Arc<DocumentExtractor>,
    options: ImportOptions,
}

impl<S> ImportCoordinator<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, extractor: Arc<DocumentExtractor>, options: ImportOptions) -> Self {
        Self {
            store,
            extractor,
            options,
        }
    }

    /// Creates the index before the first write of a job.
    pub async fn prepare(&self) -> Result<(), StoreError> {
        self.store.create_schema(&index_definition()).await
    }

    pub async fn run(&self, files: Vec<PathBuf>) -> Result<ImportSummary, StoreError> {
        self.prepare().await?;
        Ok(self.import_files(files).await)
    }

    /// Results come back in the order of `files`.
    pub async fn import_files(&self, files: Vec<PathBuf>) -> ImportSummary {
        let permits = Arc::new(Semaphore::new(self.options.pool_size.max(1)));
        let mut tasks = JoinSet::new();

        for (position, path) in files.iter().cloned().enumerate() {
            let store = Arc::clone(&self.store);
            let extractor = Arc::clone(&self.extractor);
            let options = self.options.clone();
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        info!(file = %path.display(), "file started");
                        import_file(store.as_ref(), extractor, &options, &path).await
                    }
                    Err(closed) => Err(FileFailure {
                        report: FileReport::default(),
                        error: ImportError::Worker(closed.to_string()),
                    }),
                };
                (position, outcome)
            });
        }

        let mut slots: Vec<Option<ImportResult>> = vec![None; files.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, outcome)) => {
                    slots[position] = Some(file_result(files[position].clone(), outcome));
                }
                Err(join_error) => error!(error = %join_error, "import task did not complete"),
            }
        }

        let summary = ImportSummary {
            files: slots
                .into_iter()
                .zip(files)
                .map(|(slot, path)| {
                    slot.unwrap_or_else(|| {
                        let lost = FileFailure {
                            report: FileReport::default(),
                            error: ImportError::Worker("task ended without a result".to_string()),
                        };
                        file_result(path, Err(lost))
                    })
                })
                .collect(),
        };

        info!(
            succeeded = summary.succeeded().count(),
            failed = summary.failed().count(),
            documents = summary.documents_indexed(),
            "import finished"
        );
        summary
    }
}

/// A failed file keeps the counts it reached before the error.
fn file_result(path: PathBuf, outcome: Result<FileReport, FileFailure>) -> ImportResult {
    match outcome {
        Ok(report) => ImportResult {
            path,
            status: FileStatus::Succeeded,
            lines_read: report.lines_read,
            documents_indexed: report.documents_indexed,
            error_kind: None,
            error: None,
        },
        Err(FileFailure { report, error }) => {
            error!(
                file = %path.display(),
                kind = error.kind(),
                documents_indexed = report.documents_indexed,
                error = %error,
                "file failed"
            );
            ImportResult {
                path,
                status: FileStatus::Failed,
                lines_read: report.lines_read,
                documents_indexed: report.documents_indexed,
                error_kind: Some(error.kind()),
                error: Some(error.to_string()),
            }
        }
    }
}
