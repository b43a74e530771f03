use crate::error::StoreError;
use crate::store::{Batch, BulkResponse};
use async_trait::async_trait;
use serde_json::Value;

/// Search store receiving normalised documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn check_connection(&self) -> Result<(), StoreError>;

    /// Creates the index from `definition`; an existing index is success.
    async fn create_schema(&self, definition: &Value) -> Result<(), StoreError>;

    /// Index-or-overwrite every entry keyed by its id, in one request.
    async fn bulk_upsert(&self, batch: &Batch) -> Result<BulkResponse, StoreError>;
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::DocumentStore;
    use crate::error::StoreError;
    use crate::store::{Batch, BulkResponse};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Records every bulk request; can refuse connections or reject one id.
    #[derive(Default)]
    pub struct RecordingStore {
        pub unreachable: bool,
        pub reject_id: Option<String>,
        flushes: Mutex<Vec<Vec<String>>>,
        schemas: Mutex<usize>,
    }

    impl RecordingStore {
        pub fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Default::default()
            }
        }

        pub fn rejecting(id: &str) -> Self {
            Self {
                reject_id: Some(id.to_string()),
                ..Default::default()
            }
        }

        pub fn flush_sizes(&self) -> Vec<usize> {
            self.flushes
                .lock()
                .map(|flushes| flushes.iter().map(Vec::len).collect())
                .unwrap_or_default()
        }

        pub fn stored_ids(&self) -> Vec<String> {
            self.flushes
                .lock()
                .map(|flushes| flushes.iter().flatten().cloned().collect())
                .unwrap_or_default()
        }

        pub fn schemas_created(&self) -> usize {
            self.schemas.lock().map(|count| *count).unwrap_or_default()
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn check_connection(&self) -> Result<(), StoreError> {
            if self.unreachable {
                return Err(StoreError::Request("connection refused".to_string()));
            }
            Ok(())
        }

        async fn create_schema(&self, _definition: &Value) -> Result<(), StoreError> {
            if let Ok(mut count) = self.schemas.lock() {
                *count += 1;
            }
            Ok(())
        }

        async fn bulk_upsert(&self, batch: &Batch) -> Result<BulkResponse, StoreError> {
            let ids: Vec<String> = batch.ids().map(str::to_string).collect();
            if let Ok(mut flushes) = self.flushes.lock() {
                flushes.push(ids.clone());
            }

            let rejected = |id: &str| self.reject_id.as_deref() == Some(id);
            if !ids.iter().any(|id| rejected(id)) {
                return Ok(BulkResponse::succeeded(ids.len()));
            }

            let items: Vec<Value> = ids
                .iter()
                .map(|id| {
                    if rejected(id) {
                        json!({"index": {"_id": id, "status": 400, "error": {"type": "mapper_parsing_exception"}}})
                    } else {
                        json!({"index": {"_id": id, "status": 201}})
                    }
                })
                .collect();
            Ok(BulkResponse::from_value(json!({"errors": true, "items": items})))
        }
    }
}
