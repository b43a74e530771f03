use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::fs;
use std::io;
use std::path::Path;

pub const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't", "rt", "amp",
];

/// Client labels of automated posting services.
pub const BOT_SOURCES: &[&str] = &[
    "IFTTT",
    "dlvr.it",
    "twittbot.net",
    "Botize",
    "Cheap Bots, Done Quick!",
    "TweetAdder v4",
    "Twittascope",
    "RoundTeam",
    "Zapier.com",
    "Paper.li",
    "trendinalia",
    "Tweet Old Post",
    "Buffer",
    "Hootsuite Inc.",
    "SocialOomph",
    "Revive Old Post",
];

static ANCHOR_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^<a\b[^>]*>(.*)</a>$").expect("anchor pattern is valid"));

/// Token stopwords and denied post sources.
#[derive(Debug, Clone, Default)]
pub struct StopLists {
    words: FxHashSet<String>,
    sources: FxHashSet<String>,
}

impl StopLists {
    pub fn new<W, S>(words: W, sources: S) -> Self
    where
        W: IntoIterator,
        W::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn english() -> Self {
        Self::new(
            ENGLISH_STOPWORDS.iter().copied(),
            BOT_SOURCES.iter().copied(),
        )
    }

    pub fn with_words_file(mut self, path: &Path) -> io::Result<Self> {
        self.words = read_list(path)?.into_iter().collect();
        Ok(self)
    }

    pub fn with_sources_file(mut self, path: &Path) -> io::Result<Self> {
        self.sources = read_list(path)?.into_iter().collect();
        Ok(self)
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    /// Matches either the raw `source` value or the label of its anchor.
    pub fn is_denied_source(&self, source: &str) -> bool {
        self.sources.contains(source) || self.sources.contains(source_label(source))
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

/// `<a href="..">Label</a>` gives `Label`; anything else is returned as is.
pub fn source_label(source: &str) -> &str {
    ANCHOR_LABEL_RE
        .captures(source)
        .and_then(|captures| captures.get(1))
        .map_or(source, |label| label.as_str())
}

/// One entry per line; blank lines and `#` comments are ignored.
pub fn read_list(path: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
