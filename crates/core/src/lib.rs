pub mod error;
pub mod extractor;
pub mod frequency;
pub mod geo;
pub mod indexer;
pub mod ingest;
pub mod links;
pub mod models;
pub mod orchestrator;
pub mod post;
pub mod stoplists;
pub mod store;
pub mod stores;
pub mod text;
pub mod traits;

pub use error::{ExtractError, ImportError, IndexError, PropertyError, StoreError};
pub use extractor::{hash_username, DocumentExtractor};
pub use frequency::{ngrams, FrequencyMap, TermCount};
pub use geo::{GeoPoint, GeoResolver, NoGeoResolver, Region};
pub use indexer::{BatchLimits, BulkIndexer};
pub use ingest::{
    discover_input_files, expand_inputs, import_file, read_file_list, FileFailure, FileReport,
};
pub use models::{
    ConnectionKind, FileStatus, ImportOptions, ImportResult, ImportSummary, NormalizedDocument,
    UserConnection,
};
pub use orchestrator::ImportCoordinator;
pub use post::{decode_line, DecodedLine, RawPost};
pub use stoplists::StopLists;
pub use store::{index_definition, Batch, BatchEntry, BulkResponse};
pub use stores::OpenSearchStore;
pub use text::{PropertyLoader, PropertyTable, Tokeniser};
pub use traits::DocumentStore;
