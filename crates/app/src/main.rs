use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use social_index_core::{
    expand_inputs, DocumentExtractor, ImportCoordinator, ImportOptions, ImportSummary,
    NoGeoResolver, OpenSearchStore, PropertyLoader, StopLists, Tokeniser,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "social-index", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Folder with GraphemeBreakProperty.txt, WordBreakProperty.txt and emoji-data.txt;
    /// the bundled copy is used when unset.
    #[arg(long, env = "SOCIAL_INDEX_UNICODE_DATA")]
    unicode_data: Option<PathBuf>,

    /// Replace the built-in English stopwords with one word per line.
    #[arg(long, env = "SOCIAL_INDEX_STOPWORDS")]
    stopwords: Option<PathBuf>,

    /// Replace the built-in denied post sources with one source per line.
    #[arg(long, env = "SOCIAL_INDEX_STOPSOURCES")]
    stopsources: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Import gzip'd post archives into the search index.
    Import(ImportArgs),
    /// Print the word tokens of a text, one per line.
    Tokenise {
        text: String,
    },
}

#[derive(Args)]
struct ImportArgs {
    /// Search store base URL; repeat for several nodes.
    #[arg(
        long = "store-url",
        env = "SOCIAL_INDEX_STORE_URLS",
        value_delimiter = ',',
        default_value = "http://localhost:9200"
    )]
    store_urls: Vec<String>,

    /// Index name
    #[arg(long, env = "SOCIAL_INDEX_INDEX", default_value = "tweets")]
    index: String,

    /// Files imported at the same time.
    #[arg(long, default_value_t = 16)]
    pool_size: usize,

    /// Documents per bulk request.
    #[arg(long, default_value_t = 50_000)]
    max_batch_documents: usize,

    /// Upper bound on a bulk request body, in bytes.
    #[arg(long, default_value_t = 25_000_000)]
    max_batch_bytes: usize,

    /// Deepest region level to resolve (0 disables geo fields). No region
    /// boundaries ship with the binary, so region names stay empty.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    geo_level: u8,

    /// Post language to keep; repeatable.
    #[arg(long = "language", default_value = "en")]
    languages: Vec<String>,

    /// Where failed bulk responses are written.
    #[arg(long, default_value = ".")]
    error_dump_dir: PathBuf,

    /// Store request timeout in seconds.
    #[arg(long, default_value_t = 3600)]
    request_timeout: u64,

    /// `*.jsonl.gz` files, folders searched recursively, or `@list` files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

impl ImportArgs {
    fn options(&self) -> ImportOptions {
        ImportOptions {
            max_batch_documents: self.max_batch_documents,
            max_batch_bytes: self.max_batch_bytes,
            pool_size: self.pool_size,
            geo_level: self.geo_level,
            languages: self.languages.clone(),
            error_dump_dir: self.error_dump_dir.clone(),
            request_timeout: Duration::from_secs(self.request_timeout),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "social-index boot"
    );

    let table = match &cli.unicode_data {
        Some(dir) => PropertyLoader::new(dir)
            .load()
            .with_context(|| format!("loading unicode data from {}", dir.display()))?,
        None => PropertyLoader::bundled()
            .load()
            .context("loading bundled unicode data")?,
    };
    let tokeniser = Tokeniser::new(table);

    match cli.command {
        Command::Tokenise { text } => {
            for token in tokeniser.tokenise(&text) {
                println!("{token}");
            }
        }
        Command::Import(args) => {
            let mut stoplists = StopLists::english();
            if let Some(path) = &cli.stopwords {
                stoplists = stoplists
                    .with_words_file(path)
                    .with_context(|| format!("reading stopwords from {}", path.display()))?;
            }
            if let Some(path) = &cli.stopsources {
                stoplists = stoplists
                    .with_sources_file(path)
                    .with_context(|| format!("reading stop sources from {}", path.display()))?;
            }
            info!(
                stopwords = stoplists.word_count(),
                stopsources = stoplists.source_count(),
                "stop lists ready"
            );

            let options = args.options();
            warn_unresolved_regions(options.geo_level);
            let files = expand_inputs(&args.inputs).context("expanding inputs")?;
            if files.is_empty() {
                warn!("no input files found");
                println!("0 files imported");
                return Ok(());
            }

            let store = OpenSearchStore::new(&args.store_urls, &args.index, options.request_timeout)?;
            let extractor = DocumentExtractor::new(tokeniser, stoplists)
                .with_geo(Arc::new(NoGeoResolver), options.geo_level);

            info!(files = files.len(), index = %args.index, "import started");
            let coordinator = ImportCoordinator::new(Arc::new(store), Arc::new(extractor), options);
            let summary = coordinator.run(files).await?;

            print_summary(&summary);
            let failed = summary.failed().count();
            if failed > 0 {
                anyhow::bail!("{failed} of {} file(s) failed", summary.files.len());
            }
        }
    }

    Ok(())
}

/// Returns whether a warning was logged.
fn warn_unresolved_regions(geo_level: u8) -> bool {
    if geo_level == 0 {
        return false;
    }
    warn!(
        geo_level,
        "no region boundaries are available; geo fields carry coordinates only"
    );
    true
}

fn print_summary(summary: &ImportSummary) {
    for result in &summary.files {
        let marker = result.status.marker();
        match (&result.error_kind, &result.error) {
            (Some(kind), Some(error)) => {
                println!("{marker} {} [{kind}] {error}", result.path.display());
            }
            _ => println!(
                "{marker} {} lines={} documents={}",
                result.path.display(),
                result.lines_read,
                result.documents_indexed
            ),
        }
    }
    println!(
        "{} succeeded, {} failed, {} documents indexed at {}",
        summary.succeeded().count(),
        summary.failed().count(),
        summary.documents_indexed(),
        Utc::now().to_rfc3339()
    );
}
