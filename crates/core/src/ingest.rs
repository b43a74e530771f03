use crate::error::{ExtractError, ImportError};
use crate::extractor::DocumentExtractor;
use crate::indexer::{BatchLimits, BulkIndexer};
use crate::models::{ImportOptions, NormalizedDocument};
use crate::post::{decode_line, DecodedLine};
use crate::stoplists::read_list;
use crate::traits::DocumentStore;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const ARCHIVE_SUFFIX: &str = ".jsonl.gz";

/// Documents buffered between the decoding thread and the indexer.
const CHANNEL_CAPACITY: usize = 1_024;

pub fn is_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(ARCHIVE_SUFFIX))
}

pub fn discover_input_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file() && is_archive(entry.path()))
        .map(|entry| entry.path().to_path_buf())
        .collect();

    files.sort_unstable();
    files
}

/// One path per line, in the stop-list file format.
pub fn read_file_list(path: &Path) -> io::Result<Vec<PathBuf>> {
    Ok(read_list(path)?.into_iter().map(PathBuf::from).collect())
}

/// Resolves command-line inputs into the files to import. `@list` reads a
/// file list, directories are searched recursively, anything else is taken
/// as a file and fails on its own if it cannot be read.
pub fn expand_inputs(inputs: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if let Some(list) = input.to_str().and_then(|raw| raw.strip_prefix('@')) {
            files.extend(read_file_list(Path::new(list))?);
        } else if input.is_dir() {
            files.extend(discover_input_files(input));
        } else {
            files.push(input.clone());
        }
    }

    Ok(files)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileReport {
    pub lines_read: usize,
    pub documents_indexed: usize,
}

/// An aborted file, with the progress made before the error. Documents from
/// flushes that succeeded stay in the store and are counted in `report`.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct FileFailure {
    pub report: FileReport,
    pub error: ImportError,
}

impl FileFailure {
    fn before_reading(error: ImportError) -> Self {
        Self {
            report: FileReport::default(),
            error,
        }
    }
}

/// Imports one gzip'd archive. Decoding and extraction run on a blocking
/// thread; documents are indexed in the order they were produced. The first
/// bad line, or the first failed flush, aborts the file.
pub async fn import_file<S>(
    store: &S,
    extractor: Arc<DocumentExtractor>,
    options: &ImportOptions,
    path: &Path,
) -> Result<FileReport, FileFailure>
where
    S: DocumentStore + ?Sized,
{
    store
        .check_connection()
        .await
        .map_err(|error| FileFailure::before_reading(ImportError::StoreConnection(error)))?;

    let (sender, mut receiver) = mpsc::channel::<NormalizedDocument>(CHANNEL_CAPACITY);
    let producer = {
        let path = path.to_path_buf();
        let languages = options.languages.clone();
        tokio::task::spawn_blocking(move || {
            let mut lines = 0;
            let produced = produce_documents(&path, &extractor, &languages, &sender, &mut lines);
            (lines, produced)
        })
    };

    let mut indexer = BulkIndexer::new(
        store,
        BatchLimits::from(options),
        dump_label(path),
        options.error_dump_dir.clone(),
    );

    let mut indexed = Ok(());
    while let Some(document) = receiver.recv().await {
        if let Err(error) = indexer.add(&document).await {
            indexed = Err(error);
            break;
        }
    }
    drop(receiver);

    let (lines_read, produced) = match producer.await {
        Ok(outcome) => outcome,
        Err(error) => (0, Err(ImportError::Worker(error.to_string()))),
    };
    let outcome = match indexed.map_err(ImportError::from).and(produced) {
        Ok(()) => indexer.finish().await.map(drop).map_err(ImportError::from),
        Err(error) => Err(error),
    };

    let report = FileReport {
        lines_read,
        documents_indexed: indexer.indexed(),
    };
    match outcome {
        Ok(()) => {
            info!(
                file = %path.display(),
                lines_read,
                documents_indexed = report.documents_indexed,
                "file finished"
            );
            Ok(report)
        }
        Err(error) => Err(FileFailure { report, error }),
    }
}

fn dump_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Counts lines read into `line`, also when it fails. Stops early, without
/// error, once the receiving side has gone away.
fn produce_documents(
    path: &Path,
    extractor: &DocumentExtractor,
    languages: &[String],
    sender: &mpsc::Sender<NormalizedDocument>,
    line: &mut usize,
) -> Result<(), ImportError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(MultiGzDecoder::new(file));
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        *line += 1;
        let line = *line;

        let failed = |source: ExtractError| ImportError::Extract { line, source };
        let text = std::str::from_utf8(&buffer)
            .map_err(|error| failed(ExtractError::Malformed(error.to_string())))?
            .trim();
        if text.is_empty() {
            continue;
        }

        let post = match decode_line(text, languages).map_err(failed)? {
            DecodedLine::Post(post) => post,
            DecodedLine::Metadata => {
                debug!(line, "skipped stream metadata");
                continue;
            }
            DecodedLine::OtherLanguage(lang) => {
                debug!(line, lang = lang.as_deref().unwrap_or("none"), "skipped post language");
                continue;
            }
        };

        for document in extractor.extract(&post).map_err(failed)? {
            if sender.blocking_send(document).is_err() {
                return Ok(());
            }
        }
    }

    Ok(())
}
