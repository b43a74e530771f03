use crate::error::ExtractError;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

pub const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// One post record as exported upstream. Field names follow the export
/// format; anything optional there is an `Option` here.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub id_str: String,
    #[serde(default)]
    pub text: Option<String>,
    pub truncated: bool,
    #[serde(default)]
    pub extended_tweet: Option<ExtendedText>,
    pub user: User,
    #[serde(default)]
    pub in_reply_to_status_id_str: Option<String>,
    #[serde(default)]
    pub in_reply_to_screen_name: Option<String>,
    #[serde(default)]
    pub retweeted_status: Option<Box<RawPost>>,
    #[serde(default)]
    pub quoted_status: Option<Box<RawPost>>,
    #[serde(default)]
    pub quote_count: Option<u64>,
    #[serde(default)]
    pub reply_count: Option<u64>,
    pub retweet_count: u64,
    pub favorite_count: u64,
    pub created_at: String,
    #[serde(default)]
    pub entities: Option<Entities>,
    #[serde(default)]
    pub place: Option<Place>,
    #[serde(default)]
    pub coordinates: Option<PointGeometry>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtendedText {
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub entities: Option<Entities>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub screen_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub verified: bool,
    pub followers_count: u64,
    pub friends_count: u64,
    pub listed_count: u64,
    pub favourites_count: u64,
    pub statuses_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub derived: Option<DerivedProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DerivedProfile {
    #[serde(default)]
    pub locations: Vec<DerivedLocation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DerivedLocation {
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub sub_region: Option<String>,
    #[serde(default)]
    pub geo: Option<DerivedGeometry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DerivedGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Coordinates {
    Point([f64; 2]),
    Ring(Vec<[f64; 2]>),
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl Coordinates {
    /// Every vertex, flattened in order.
    pub fn points(&self) -> Vec<[f64; 2]> {
        match self {
            Self::Point(point) => vec![*point],
            Self::Ring(ring) => ring.clone(),
            Self::Polygon(rings) => rings.iter().flatten().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entities {
    pub hashtags: Vec<TextEntity>,
    pub user_mentions: Vec<MentionEntity>,
    pub urls: Vec<UrlEntity>,
    #[serde(default)]
    pub media: Vec<MediaEntity>,
    pub symbols: Vec<TextEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextEntity {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MentionEntity {
    pub screen_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlEntity {
    #[serde(default)]
    pub expanded_url: Option<String>,
    #[serde(default)]
    pub unwound: Option<UnwoundUrl>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnwoundUrl {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaEntity {
    #[serde(default)]
    pub media_url_https: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    pub expanded_url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub full_name: String,
    pub country: String,
    pub place_type: String,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoundingBox {
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointGeometry {
    pub coordinates: [f64; 2],
}

impl RawPost {
    pub fn is_extended(&self) -> bool {
        self.extended_tweet.is_some()
    }

    /// The text the platform displays: a retweet shows the original's full
    /// text, otherwise the post's own extended text wins over the plain one.
    pub fn display_text(&self) -> Result<&str, ExtractError> {
        let post = self.retweeted_status.as_deref().unwrap_or(self);
        match &post.extended_tweet {
            Some(extended) => extended
                .full_text
                .as_deref()
                .ok_or_else(|| ExtractError::missing("extended_tweet.full_text")),
            None => post
                .text
                .as_deref()
                .ok_or_else(|| ExtractError::missing("text")),
        }
    }

    /// Entities matching `display_text`.
    pub fn display_entities(&self) -> Result<&Entities, ExtractError> {
        let post = self.retweeted_status.as_deref().unwrap_or(self);
        match &post.extended_tweet {
            Some(extended) => extended
                .entities
                .as_ref()
                .ok_or_else(|| ExtractError::missing("extended_tweet.entities")),
            None => post
                .entities
                .as_ref()
                .ok_or_else(|| ExtractError::missing("entities")),
        }
    }

    pub fn timestamp_millis(&self) -> Result<i64, ExtractError> {
        parse_created_at("created_at", &self.created_at)
    }
}

pub fn parse_created_at(field: &'static str, raw: &str) -> Result<i64, ExtractError> {
    DateTime::parse_from_str(raw, CREATED_AT_FORMAT)
        .map(|parsed| parsed.timestamp_millis())
        .map_err(|error| ExtractError::InvalidField {
            field: field.to_string(),
            reason: error.to_string(),
        })
}

#[derive(Debug)]
pub enum DecodedLine {
    Post(Box<RawPost>),
    /// Stream bookkeeping such as `{"info": {"activity_count": ..}}`.
    Metadata,
    OtherLanguage(Option<String>),
}

/// Parses one input line and applies the record-level filters. Only the
/// top-level record is checked against `languages`.
pub fn decode_line(line: &str, languages: &[String]) -> Result<DecodedLine, ExtractError> {
    let value: Value =
        serde_json::from_str(line).map_err(|error| ExtractError::Malformed(error.to_string()))?;

    if value.pointer("/info/activity_count").is_some() {
        return Ok(DecodedLine::Metadata);
    }

    let lang = value.get("lang").and_then(Value::as_str);
    if !lang.is_some_and(|lang| languages.iter().any(|wanted| wanted == lang)) {
        return Ok(DecodedLine::OtherLanguage(lang.map(str::to_string)));
    }

    serde_json::from_value::<RawPost>(value)
        .map(|post| DecodedLine::Post(Box::new(post)))
        .map_err(ExtractError::from_decode)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    pub fn post(id: &str, screen_name: &str, text: &str) -> Value {
        json!({
            "id_str": id,
            "text": text,
            "truncated": false,
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
            "lang": "en",
            "source": "<a href=\"https://mobile.twitter.com\" rel=\"nofollow\">Twitter Web App</a>",
            "retweet_count": 4,
            "favorite_count": 9,
            "quote_count": 1,
            "reply_count": 2,
            "user": {
                "screen_name": screen_name,
                "description": "Coffee lover and part-time cyclist",
                "verified": false,
                "followers_count": 120,
                "friends_count": 80,
                "listed_count": 3,
                "favourites_count": 45,
                "statuses_count": 1000,
                "created_at": "Mon Jan 02 08:00:00 +0000 2012",
                "location": "Leeds"
            },
            "entities": {
                "hashtags": [],
                "user_mentions": [],
                "urls": [],
                "symbols": []
            }
        })
    }
}
