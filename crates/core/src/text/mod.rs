pub mod normalize;
pub mod postprocess;
pub mod properties;
pub mod segmenter;

pub use normalize::{anonymize, clean};
pub use properties::{CodepointProps, GraphemeProps, PropertyLoader, PropertyTable, WordProps};
pub use segmenter::WordSegmenter;

use std::sync::Arc;

/// Clean, segment and post-process text into word tokens.
#[derive(Debug, Clone)]
pub struct Tokeniser {
    table: Arc<PropertyTable>,
}

impl Tokeniser {
    pub fn new(table: Arc<PropertyTable>) -> Self {
        Self { table }
    }

    pub fn tokenise(&self, text: &str) -> Vec<String> {
        let cleaned = clean(text);
        let segments = WordSegmenter::new(&self.table).segment(&cleaned);
        let tokens = postprocess::split_apostrophes(segments.as_slice());
        let tokens = postprocess::combine_hyphenated(tokens.as_slice());
        postprocess::words_only(tokens)
    }
}
