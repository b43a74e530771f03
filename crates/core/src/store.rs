use crate::models::NormalizedDocument;
use serde_json::{json, Map, Value};

/// One bulk action plus its document, already in NDJSON form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub id: String,
    payload: String,
}

impl BatchEntry {
    pub fn new(document: &NormalizedDocument) -> Result<Self, serde_json::Error> {
        let action = serde_json::to_string(&json!({ "index": { "_id": document.tweet_id } }))?;
        let source = serde_json::to_string(document)?;
        Ok(Self {
            id: document.tweet_id.clone(),
            payload: format!("{action}\n{source}\n"),
        })
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn encoded_len(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Batch {
    entries: Vec<BatchEntry>,
    bytes: usize,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: BatchEntry) {
        self.bytes += entry.encoded_len();
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the request body `to_ndjson` produces.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.id.as_str())
    }

    pub fn to_ndjson(&self) -> String {
        let mut body = String::with_capacity(self.bytes);
        for entry in &self.entries {
            body.push_str(entry.payload());
        }
        body
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.bytes = 0;
    }
}

/// Store reply to one bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkResponse {
    pub errors: bool,
    pub items: Vec<Value>,
    pub raw: Value,
}

impl BulkResponse {
    pub fn from_value(raw: Value) -> Self {
        let errors = raw.get("errors").and_then(Value::as_bool).unwrap_or(false);
        let items = raw
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Self { errors, items, raw }
    }

    /// Every item acknowledged without an error.
    pub fn succeeded(items: usize) -> Self {
        let items: Vec<Value> = (0..items)
            .map(|_| json!({ "index": { "status": 201 } }))
            .collect();
        Self::from_value(json!({ "errors": false, "items": items }))
    }

    pub fn failed_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| {
                item.as_object()
                    .into_iter()
                    .flat_map(|actions| actions.values())
                    .any(|outcome| outcome.get("error").is_some())
            })
            .count()
    }
}

const FIELD_TYPES: &[(&str, &str)] = &[
    ("tweet_id", "keyword"),
    ("username", "keyword"),
    ("is_reply", "boolean"),
    ("reply_id", "keyword"),
    ("reply_to_username", "keyword"),
    ("is_quote", "boolean"),
    ("quoted_id", "keyword"),
    ("quoted_username", "keyword"),
    ("is_retweet", "boolean"),
    ("retweeted_id", "keyword"),
    ("retweeted_username", "keyword"),
    ("quote_count", "long"),
    ("reply_count", "long"),
    ("retweet_count", "long"),
    ("favorite_count", "long"),
    ("is_truncated", "boolean"),
    ("has_extended", "boolean"),
    ("text", "text"),
    ("computed_text", "keyword"),
    ("types", "keyword"),
    ("unfiltered_types", "wildcard"),
    ("bi_grams", "keyword"),
    ("tri_grams", "keyword"),
    ("hashtags", "keyword"),
    ("user_mentions", "keyword"),
    ("urls", "keyword"),
    ("simple_urls", "keyword"),
    ("unwound_urls", "keyword"),
    ("websites", "keyword"),
    ("simple_websites", "keyword"),
    ("unwound_websites", "keyword"),
    ("url_titles", "keyword"),
    ("url_title_types", "keyword"),
    ("url_description_types", "keyword"),
    ("media_files", "keyword"),
    ("media_urls", "keyword"),
    ("media_websites", "keyword"),
    ("media_formats", "keyword"),
    ("symbols", "keyword"),
    ("profile_text", "text"),
    ("profile_types", "keyword"),
    ("unfiltered_profile_types", "wildcard"),
    ("profile_verified", "boolean"),
    ("profile_followers_count", "long"),
    ("profile_friends_count", "long"),
    ("profile_listed_count", "long"),
    ("profile_favourites_count", "long"),
    ("profile_statuses_count", "long"),
    ("profile_created_timestamp", "date"),
    ("tweet_geo_coord", "geo_point"),
    ("tweet_geo_description", "keyword"),
    ("profile_geo_coord", "geo_point"),
    ("profile_geo_descrption", "keyword"),
    ("geo_source", "keyword"),
    ("geo_coord", "geo_point"),
    ("geo_nuts_level", "keyword"),
    ("geo_nuts1_code", "keyword"),
    ("geo_nuts1_name", "keyword"),
    ("geo_nuts2_code", "keyword"),
    ("geo_nuts2_name", "keyword"),
    ("geo_nuts3_code", "keyword"),
    ("geo_nuts3_name", "keyword"),
    ("timestamp", "date"),
    ("source", "keyword"),
];

/// Settings and mappings for the document index.
pub fn index_definition() -> Value {
    let mut properties: Map<String, Value> = FIELD_TYPES
        .iter()
        .map(|(field, kind)| (field.to_string(), json!({ "type": kind })))
        .collect();

    properties.insert(
        "unfiltered_type_counts".to_string(),
        json!({
            "type": "nested",
            "properties": {
                "type": { "type": "keyword" },
                "freq": { "type": "long" }
            }
        }),
    );
    properties.insert(
        "user_connections".to_string(),
        json!({
            "type": "nested",
            "properties": {
                "user": { "type": "keyword" },
                "conn": { "type": "keyword" }
            }
        }),
    );

    json!({
        "settings": {
            "index": {
                "number_of_shards": 2
            }
        },
        "mappings": {
            "properties": properties
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(id: &str) -> NormalizedDocument {
        NormalizedDocument {
            tweet_id: id.to_string(),
            text: "hello".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn entry_is_action_then_source() -> Result<(), serde_json::Error> {
        let entry = BatchEntry::new(&document("7"))?;
        let mut lines = entry.payload().lines();

        let action: Value = serde_json::from_str(lines.next().unwrap_or_default())?;
        assert_eq!(action, json!({"index": {"_id": "7"}}));

        let source: Value = serde_json::from_str(lines.next().unwrap_or_default())?;
        assert_eq!(source["tweet_id"], "7");
        assert_eq!(source["text"], "hello");
        assert!(lines.next().is_none());
        assert!(entry.payload().ends_with('\n'));
        Ok(())
    }

    #[test]
    fn batch_tracks_body_size() -> Result<(), serde_json::Error> {
        let mut batch = Batch::new();
        batch.push(BatchEntry::new(&document("1"))?);
        batch.push(BatchEntry::new(&document("2"))?);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.bytes(), batch.to_ndjson().len());
        assert_eq!(batch.ids().collect::<Vec<_>>(), vec!["1", "2"]);

        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.bytes(), 0);
        Ok(())
    }

    #[test]
    fn failed_items_are_counted() {
        let response = BulkResponse::from_value(json!({
            "errors": true,
            "items": [
                {"index": {"_id": "1", "status": 201}},
                {"index": {"_id": "2", "status": 400, "error": {"type": "mapper_parsing_exception"}}}
            ]
        }));
        assert!(response.errors);
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.failed_items(), 1);

        let ok = BulkResponse::succeeded(3);
        assert!(!ok.errors);
        assert_eq!(ok.failed_items(), 0);
    }

    #[test]
    fn mapping_covers_document_fields() -> Result<(), serde_json::Error> {
        let definition = index_definition();
        let properties = &definition["mappings"]["properties"];
        let fields = serde_json::to_value(document("1"))?;

        for field in fields.as_object().into_iter().flat_map(|object| object.keys()) {
            assert!(properties.get(field).is_some(), "unmapped field {field}");
        }
        assert_eq!(properties["tweet_geo_coord"]["type"], "geo_point");
        assert_eq!(definition["settings"]["index"]["number_of_shards"], 2);
        Ok(())
    }
}
