use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
}

impl ExtractError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn from_decode(error: serde_json::Error) -> Self {
        let message = error.to_string();
        match message
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next())
        {
            Some(field) => Self::missing(field),
            None => Self::Malformed(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("bulk flush {flush} reported {failed_items} failed item(s); response saved to {dump_path}")]
    BulkOperation {
        flush: usize,
        failed_items: usize,
        dump_path: PathBuf,
    },

    #[error("could not write bulk diagnostics to {path}: {source}")]
    Dump {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("store unreachable: {0}")]
    StoreConnection(#[source] StoreError),

    #[error("line {line}: {source}")]
    Extract {
        line: usize,
        #[source]
        source: ExtractError,
    },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker failed: {0}")]
    Worker(String),
}

impl ImportError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StoreConnection(_) => "store_connection",
            Self::Extract {
                source: ExtractError::MissingField { .. },
                ..
            } => "missing_field",
            Self::Extract { .. } => "malformed_record",
            Self::Index(IndexError::BulkOperation { .. }) => "bulk_operation",
            Self::Index(_) => "store",
            Self::Io(_) => "io",
            Self::Worker(_) => "worker",
        }
    }
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Needs {
        id_str: String,
    }

    #[test]
    fn serde_missing_field_maps_to_missing_field() {
        let error = serde_json::from_str::<Needs>("{}").unwrap_err();
        match ExtractError::from_decode(error) {
            ExtractError::MissingField { field } => assert_eq!(field, "id_str"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn type_mismatch_is_malformed() {
        let error = serde_json::from_str::<Needs>(r#"{"id_str": 5}"#).unwrap_err();
        assert!(matches!(
            ExtractError::from_decode(error),
            ExtractError::Malformed(_)
        ));
    }

    #[test]
    fn import_error_kinds_are_stable() {
        let error = ImportError::Extract {
            line: 3,
            source: ExtractError::missing("user"),
        };
        assert_eq!(error.kind(), "missing_field");
        assert_eq!(error.to_string(), "line 3: missing required field `user`");

        let error = ImportError::Index(IndexError::BulkOperation {
            flush: 1,
            failed_items: 2,
            dump_path: PathBuf::from("err.json"),
        });
        assert_eq!(error.kind(), "bulk_operation");
    }
}
