use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use social_index_core::{
    hash_username, Batch, BulkResponse, DocumentExtractor, DocumentStore, FileStatus,
    ImportCoordinator, ImportOptions, PropertyTable, StopLists, StoreError, Tokeniser,
};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Default)]
struct MemoryStore {
    documents: Mutex<Vec<Value>>,
    flushes: Mutex<usize>,
}

impl MemoryStore {
    fn documents(&self) -> Vec<Value> {
        self.documents
            .lock()
            .map(|documents| documents.clone())
            .unwrap_or_default()
    }

    fn document(&self, id: &str) -> Option<Value> {
        self.documents()
            .into_iter()
            .find(|document| document["tweet_id"] == id)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn check_connection(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_schema(&self, definition: &Value) -> Result<(), StoreError> {
        if definition["mappings"]["properties"]["tweet_id"]["type"] != "keyword" {
            return Err(StoreError::Request("unexpected mapping".to_string()));
        }
        Ok(())
    }

    async fn bulk_upsert(&self, batch: &Batch) -> Result<BulkResponse, StoreError> {
        let mut parsed = Vec::with_capacity(batch.len());
        for entry in batch.entries() {
            let mut lines = entry.payload().lines();
            let action: Value = serde_json::from_str(lines.next().unwrap_or_default())?;
            let source: Value = serde_json::from_str(lines.next().unwrap_or_default())?;
            assert_eq!(action["index"]["_id"], source["tweet_id"]);
            parsed.push(source);
        }

        if let Ok(mut flushes) = self.flushes.lock() {
            *flushes += 1;
        }
        if let Ok(mut documents) = self.documents.lock() {
            documents.extend(parsed);
        }
        Ok(BulkResponse::succeeded(batch.len()))
    }
}

fn unicode_table() -> Arc<PropertyTable> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/unicode");
    match PropertyTable::load_dir(&dir) {
        Ok(table) => Arc::new(table),
        Err(error) => panic!("fixture tables should load: {error}"),
    }
}

fn post(id: &str, screen_name: &str, text: &str) -> Value {
    json!({
        "id_str": id,
        "text": text,
        "truncated": false,
        "created_at": "Thu Mar 12 09:30:00 +0000 2020",
        "lang": "en",
        "source": "<a href=\"http://twitter.com/download/android\" rel=\"nofollow\">Twitter for Android</a>",
        "retweet_count": 0,
        "favorite_count": 0,
        "user": {
            "screen_name": screen_name,
            "description": "Nurse in Manchester",
            "verified": false,
            "followers_count": 10,
            "friends_count": 20,
            "listed_count": 0,
            "favourites_count": 5,
            "statuses_count": 300,
            "created_at": "Sun Jun 01 12:00:00 +0000 2014"
        },
        "entities": {"hashtags": [], "user_mentions": [], "urls": [], "symbols": []}
    })
}

fn write_archive(path: &Path, records: &[Value]) -> std::io::Result<()> {
    let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
    for record in records {
        writeln!(encoder, "{record}")?;
    }
    encoder.finish()?;
    Ok(())
}

fn coordinator(store: Arc<MemoryStore>, dump_dir: PathBuf) -> ImportCoordinator<MemoryStore> {
    let extractor = DocumentExtractor::new(Tokeniser::new(unicode_table()), StopLists::english());
    let options = ImportOptions {
        max_batch_documents: 2,
        pool_size: 2,
        error_dump_dir: dump_dir,
        ..Default::default()
    };
    ImportCoordinator::new(store, Arc::new(extractor), options)
}

#[tokio::test]
async fn archives_are_indexed_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    let mut hello = post("100", "Alice", "Hello #Covid19 https://example.com/x");
    hello["entities"]["hashtags"] = json!([{"text": "Covid19"}]);
    hello["entities"]["urls"] = json!([{"expanded_url": "https://example.com/x"}]);

    let original = post("200", "Bob", "Washing hands matters");
    let mut retweet = post("201", "Carol", "RT @Bob: Washing hands matters");
    retweet["retweeted_status"] = original;
    retweet["entities"]["user_mentions"] = json!([{"screen_name": "Bob"}]);

    let mut bot = post("300", "Daily", "Automated digest");
    bot["source"] = json!("<a href=\"https://ifttt.com\" rel=\"nofollow\">IFTTT</a>");

    let mut german = post("400", "Erik", "Guten Morgen");
    german["lang"] = json!("de");

    let first = dir.path().join("2020-03-12.jsonl.gz");
    write_archive(
        &first,
        &[json!({"info": {"activity_count": 4}}), hello, retweet, bot, german],
    )?;

    let second = dir.path().join("2020-03-13.jsonl.gz");
    write_archive(&second, &[post("500", "Frank", "Stay home stay safe")])?;

    let store = Arc::new(MemoryStore::default());
    let summary = coordinator(Arc::clone(&store), dir.path().to_path_buf())
        .run(vec![first, second])
        .await?;

    assert!(summary.all_succeeded());
    assert_eq!(summary.files[0].status, FileStatus::Succeeded);
    assert_eq!(summary.files[0].lines_read, 5);
    assert_eq!(summary.files[0].documents_indexed, 3);
    assert_eq!(summary.files[1].documents_indexed, 1);

    let mut ids: Vec<String> = store
        .documents()
        .iter()
        .filter_map(|document| document["tweet_id"].as_str().map(str::to_string))
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["100", "200", "201", "500"]);

    let hello = store.document("100").ok_or("post 100 missing")?;
    assert_eq!(hello["hashtags"], json!(["covid19"]));
    assert_eq!(hello["websites"], json!(["example.com"]));
    let types: Vec<&str> = hello["types"]
        .as_array()
        .ok_or("types missing")?
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(types.contains(&"hello"));
    assert!(!types.contains(&"covid19"));
    assert!(types.iter().all(|token| !token.contains("example")));
    assert_eq!(hello["timestamp"], 1_584_005_400_000_i64);
    assert_eq!(hello["username"], hash_username("alice"));

    let retweet = store.document("201").ok_or("post 201 missing")?;
    assert_eq!(retweet["is_retweet"], true);
    assert_eq!(retweet["retweeted_id"], "200");
    assert_eq!(retweet["is_quote"], false);
    assert_eq!(retweet["quoted_id"], Value::Null);
    assert_eq!(
        retweet["user_connections"],
        json!([{"user": hash_username("Bob"), "conn": ["at", "rt"]}])
    );

    assert!(store.document("300").is_none());
    assert!(store.document("400").is_none());
    Ok(())
}

#[tokio::test]
async fn broken_archive_fails_alone() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let good = dir.path().join("good.jsonl.gz");
    write_archive(&good, &[post("1", "Alice", "Good evening")])?;

    let bad = dir.path().join("bad.jsonl.gz");
    let mut truncated = post("2", "Bob", "Missing pieces");
    if let Some(record) = truncated.as_object_mut() {
        record.remove("created_at");
    }
    write_archive(&bad, &[post("3", "Carol", "Fine line"), truncated])?;

    let store = Arc::new(MemoryStore::default());
    let summary = coordinator(Arc::clone(&store), dir.path().to_path_buf())
        .run(vec![bad, good])
        .await?;

    assert_eq!(summary.files[0].status, FileStatus::Failed);
    assert_eq!(summary.files[0].error_kind, Some("missing_field"));
    assert!(summary.files[0]
        .error
        .as_deref()
        .is_some_and(|message| message.contains("created_at")));
    assert_eq!(summary.files[1].status, FileStatus::Succeeded);
    assert!(store.document("1").is_some());
    assert!(store.document("2").is_none());
    Ok(())
}
