use crate::frequency::TermCount;
use crate::geo::{GeoFields, GeoPoint};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionKind {
    #[serde(rename = "at")]
    Mention,
    #[serde(rename = "rt")]
    Retweet,
    #[serde(rename = "qt")]
    Quote,
    #[serde(rename = "re")]
    Reply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserConnection {
    pub user: String,
    pub conn: Vec<ConnectionKind>,
}

/// The stored form of one post. Field names are the index mapping's.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedDocument {
    pub tweet_id: String,
    pub username: String,

    pub is_reply: bool,
    pub reply_id: Option<String>,
    pub reply_to_username: Option<String>,

    pub is_quote: bool,
    pub quoted_id: Option<String>,
    pub quoted_username: Option<String>,

    pub is_retweet: bool,
    pub retweeted_id: Option<String>,
    pub retweeted_username: Option<String>,

    pub quote_count: u64,
    pub reply_count: u64,
    pub retweet_count: u64,
    pub favorite_count: u64,

    pub is_truncated: bool,
    pub has_extended: bool,
    pub text: String,
    pub computed_text: String,
    pub types: Vec<String>,
    pub unfiltered_types: Vec<String>,
    pub bi_grams: Vec<String>,
    pub tri_grams: Vec<String>,
    pub unfiltered_type_counts: Vec<TermCount>,

    pub hashtags: Vec<String>,
    pub user_mentions: Vec<String>,
    pub urls: Vec<String>,
    pub simple_urls: Vec<String>,
    pub unwound_urls: Vec<String>,
    pub websites: Vec<String>,
    pub simple_websites: Vec<String>,
    pub unwound_websites: Vec<String>,
    pub url_titles: Vec<String>,
    pub url_title_types: Vec<String>,
    pub url_description_types: Vec<String>,
    pub media_files: Vec<String>,
    pub media_urls: Vec<String>,
    pub media_websites: Vec<String>,
    pub media_formats: Vec<String>,
    pub symbols: Vec<String>,

    pub profile_text: String,
    pub profile_types: Vec<String>,
    pub unfiltered_profile_types: Vec<String>,
    pub profile_verified: bool,
    pub profile_followers_count: u64,
    pub profile_friends_count: u64,
    pub profile_listed_count: u64,
    pub profile_favourites_count: u64,
    pub profile_statuses_count: u64,
    pub profile_created_timestamp: i64,

    pub tweet_geo_coord: Option<GeoPoint>,
    pub tweet_geo_description: String,
    pub profile_geo_coord: Option<GeoPoint>,
    // field name is fixed by existing indices
    pub profile_geo_descrption: String,

    pub timestamp: i64,
    pub source: Option<String>,
    pub user_connections: Vec<UserConnection>,

    #[serde(flatten)]
    pub geo: Option<GeoFields>,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub max_batch_documents: usize,
    pub max_batch_bytes: usize,
    pub pool_size: usize,
    pub geo_level: u8,
    pub languages: Vec<String>,
    pub error_dump_dir: PathBuf,
    pub request_timeout: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            max_batch_documents: 50_000,
            max_batch_bytes: 25_000_000,
            pool_size: 16,
            geo_level: 0,
            languages: vec!["en".to_string()],
            error_dump_dir: PathBuf::from("."),
            request_timeout: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Succeeded,
    Failed,
}

impl FileStatus {
    pub fn marker(self) -> char {
        match self {
            Self::Succeeded => '+',
            Self::Failed => '!',
        }
    }
}

/// Outcome of one input file.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub path: PathBuf,
    pub status: FileStatus,
    pub lines_read: usize,
    pub documents_indexed: usize,
    pub error_kind: Option<&'static str>,
    pub error: Option<String>,
}

impl ImportResult {
    pub fn succeeded(&self) -> bool {
        self.status == FileStatus::Succeeded
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub files: Vec<ImportResult>,
}

impl ImportSummary {
    pub fn succeeded(&self) -> impl Iterator<Item = &ImportResult> {
        self.files.iter().filter(|result| result.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ImportResult> {
        self.files.iter().filter(|result| !result.succeeded())
    }

    pub fn documents_indexed(&self) -> usize {
        self.files.iter().map(|result| result.documents_indexed).sum()
    }

    pub fn all_succeeded(&self) -> bool {
        self.files.iter().all(ImportResult::succeeded)
    }
}
