//! Per-codepoint word-break and grapheme-break property flags.
//!
//! Tables are built from the Unicode Character Database text files
//! (`GraphemeBreakProperty.txt`, `WordBreakProperty.txt`, `emoji-data.txt`).
//! Every data line has the shape `HEX[..HEX] ; PropertyName # comment`.
//! Several files may assign flags to the same codepoint, so values are
//! OR-ed together rather than replaced.
//!
//! A full copy of the three files ships under `data/unicode` and is compiled
//! in; [`PropertyTable::bundled`] parses it when no directory is configured.

use crate::error::PropertyError;
use bitflags::bitflags;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GraphemeProps: u16 {
        const CR = 1;
        const CONTROL = 1 << 1;
        const EXTEND = 1 << 2;
        const L = 1 << 3;
        const LF = 1 << 4;
        const LV = 1 << 5;
        const LVT = 1 << 6;
        const PREPEND = 1 << 7;
        const REGIONAL_INDICATOR = 1 << 8;
        const SPACING_MARK = 1 << 9;
        const T = 1 << 10;
        const V = 1 << 11;
        const ZWJ = 1 << 12;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WordProps: u32 {
        const A_LETTER = 1;
        const CR = 1 << 1;
        const DOUBLE_QUOTE = 1 << 2;
        const EXTEND = 1 << 3;
        const EXTEND_NUM_LET = 1 << 4;
        const FORMAT = 1 << 5;
        const HEBREW_LETTER = 1 << 6;
        const KATAKANA = 1 << 7;
        const LF = 1 << 8;
        const MID_LETTER = 1 << 9;
        const MID_NUM = 1 << 10;
        const MID_NUM_LET = 1 << 11;
        const NEWLINE = 1 << 12;
        const NUMERIC = 1 << 13;
        const REGIONAL_INDICATOR = 1 << 14;
        const SINGLE_QUOTE = 1 << 15;
        const WSEG_SPACE = 1 << 16;
        const ZWJ = 1 << 17;
        const EXTENDED_PICTOGRAPHIC = 1 << 18;
    }
}

impl GraphemeProps {
    /// Maps a UCD property value name; `Any` is the empty set.
    pub fn from_ucd_name(name: &str) -> Option<Self> {
        let flag = match name {
            "Any" => Self::empty(),
            "CR" => Self::CR,
            "Control" => Self::CONTROL,
            "Extend" => Self::EXTEND,
            "L" => Self::L,
            "LF" => Self::LF,
            "LV" => Self::LV,
            "LVT" => Self::LVT,
            "Prepend" => Self::PREPEND,
            "Regional_Indicator" => Self::REGIONAL_INDICATOR,
            "SpacingMark" => Self::SPACING_MARK,
            "T" => Self::T,
            "V" => Self::V,
            "ZWJ" => Self::ZWJ,
            _ => return None,
        };
        Some(flag)
    }
}

impl WordProps {
    /// Letters in the sense of the word rules: `ALetter` or `Hebrew_Letter`.
    pub const AH_LETTER: Self = Self::A_LETTER.union(Self::HEBREW_LETTER);
    pub const NEWLINE_ANY: Self = Self::NEWLINE.union(Self::CR).union(Self::LF);

    pub fn from_ucd_name(name: &str) -> Option<Self> {
        let flag = match name {
            "Any" => Self::empty(),
            "ALetter" => Self::A_LETTER,
            "CR" => Self::CR,
            "Double_Quote" => Self::DOUBLE_QUOTE,
            "Extend" => Self::EXTEND,
            "ExtendNumLet" => Self::EXTEND_NUM_LET,
            "Format" => Self::FORMAT,
            "Hebrew_Letter" => Self::HEBREW_LETTER,
            "Katakana" => Self::KATAKANA,
            "LF" => Self::LF,
            "MidLetter" => Self::MID_LETTER,
            "MidNum" => Self::MID_NUM,
            "MidNumLet" => Self::MID_NUM_LET,
            "Newline" => Self::NEWLINE,
            "Numeric" => Self::NUMERIC,
            "Regional_Indicator" => Self::REGIONAL_INDICATOR,
            "Single_Quote" => Self::SINGLE_QUOTE,
            "WSegSpace" => Self::WSEG_SPACE,
            "ZWJ" => Self::ZWJ,
            "Extended_Pictographic" => Self::EXTENDED_PICTOGRAPHIC,
            _ => return None,
        };
        Some(flag)
    }
}

/// Both property spaces of one codepoint, looked up together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodepointProps {
    pub word: WordProps,
    pub grapheme: GraphemeProps,
}

const BUNDLED_GRAPHEME: &str = include_str!("../../data/unicode/GraphemeBreakProperty.txt");
const BUNDLED_WORD: &str = include_str!("../../data/unicode/WordBreakProperty.txt");
const BUNDLED_EMOJI: &str = include_str!("../../data/unicode/emoji-data.txt");

static ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([0-9A-Fa-f]+)(?:\.+([0-9A-Fa-f]+))?\s*;\s*(\w+)")
        .expect("property entry pattern is valid")
});

#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    grapheme: FxHashMap<u32, GraphemeProps>,
    word: FxHashMap<u32, WordProps>,
}

impl PropertyTable {
    pub const GRAPHEME_FILE: &'static str = "GraphemeBreakProperty.txt";
    pub const WORD_FILE: &'static str = "WordBreakProperty.txt";
    pub const EMOJI_FILE: &'static str = "emoji-data.txt";

    pub fn load_dir(dir: &Path) -> Result<Self, PropertyError> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| PropertyError::Io { path, source })
        };

        let table = Self::from_sources(
            &read(Self::GRAPHEME_FILE)?,
            &read(Self::WORD_FILE)?,
            &read(Self::EMOJI_FILE)?,
        );

        info!(
            dir = %dir.display(),
            grapheme_codepoints = table.grapheme.len(),
            word_codepoints = table.word.len(),
            "unicode properties loaded"
        );
        Ok(table)
    }

    /// Table parsed from the compiled-in copy of the data files.
    pub fn bundled() -> Self {
        let table = Self::from_sources(BUNDLED_GRAPHEME, BUNDLED_WORD, BUNDLED_EMOJI);
        info!(
            grapheme_codepoints = table.grapheme.len(),
            word_codepoints = table.word.len(),
            "bundled unicode properties loaded"
        );
        table
    }

    pub fn from_sources(grapheme: &str, word: &str, emoji: &str) -> Self {
        let mut table = Self::default();
        table.add_grapheme_source(grapheme);
        table.add_word_source(word);
        table.add_emoji_source(emoji);
        table
    }

    pub fn add_grapheme_source(&mut self, source: &str) {
        for_each_entry(source, |range, name| match GraphemeProps::from_ucd_name(name) {
            Some(flag) => accumulate(&mut self.grapheme, range, flag),
            None => warn!(property = name, "unknown grapheme break property skipped"),
        });
    }

    pub fn add_word_source(&mut self, source: &str) {
        for_each_entry(source, |range, name| match WordProps::from_ucd_name(name) {
            Some(flag) => accumulate(&mut self.word, range, flag),
            None => warn!(property = name, "unknown word break property skipped"),
        });
    }

    /// Only `Extended_Pictographic` is taken from emoji data; it lands in the word space.
    pub fn add_emoji_source(&mut self, source: &str) {
        for_each_entry(source, |range, name| {
            if name == "Extended_Pictographic" {
                accumulate(&mut self.word, range, WordProps::EXTENDED_PICTOGRAPHIC);
            }
        });
    }

    pub fn word(&self, c: char) -> WordProps {
        self.word.get(&u32::from(c)).copied().unwrap_or_default()
    }

    pub fn grapheme(&self, c: char) -> GraphemeProps {
        self.grapheme.get(&u32::from(c)).copied().unwrap_or_default()
    }

    pub fn lookup(&self, c: char) -> CodepointProps {
        CodepointProps {
            word: self.word(c),
            grapheme: self.grapheme(c),
        }
    }

    pub fn word_len(&self) -> usize {
        self.word.len()
    }

    pub fn grapheme_len(&self) -> usize {
        self.grapheme.len()
    }
}

fn for_each_entry(source: &str, mut apply: impl FnMut(RangeInclusive<u32>, &str)) {
    for raw in source.lines() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let Some(captures) = ENTRY_RE.captures(line) else {
            warn!(line, "unparseable property line skipped");
            continue;
        };

        let start = captures
            .get(1)
            .and_then(|m| u32::from_str_radix(m.as_str(), 16).ok());
        let end = match captures.get(2) {
            Some(m) => u32::from_str_radix(m.as_str(), 16).ok(),
            None => start,
        };
        let name = captures.get(3).map_or("", |m| m.as_str());

        match (start, end) {
            (Some(start), Some(end)) => apply(start..=end, name),
            _ => warn!(line, "property line with out-of-range codepoint skipped"),
        }
    }
}

fn accumulate<F>(map: &mut FxHashMap<u32, F>, range: RangeInclusive<u32>, flag: F)
where
    F: Copy + Default + std::ops::BitOrAssign,
{
    for codepoint in range {
        *map.entry(codepoint).or_default() |= flag;
    }
}

/// Load-once holder for a property table.
///
/// The table comes from a UCD directory when one is given, otherwise from the
/// bundled data. The first successful `load` parses the files; later calls
/// hand back the same immutable table without touching the filesystem again.
#[derive(Debug, Default)]
pub struct PropertyLoader {
    dir: Option<PathBuf>,
    table: OnceCell<Arc<PropertyTable>>,
}

impl PropertyLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            table: OnceCell::new(),
        }
    }

    pub fn bundled() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Result<Arc<PropertyTable>, PropertyError> {
        self.table
            .get_or_try_init(|| match &self.dir {
                Some(dir) => PropertyTable::load_dir(dir).map(Arc::new),
                None => Ok(Arc::new(PropertyTable::bundled())),
            })
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::PropertyTable;
    use std::sync::Arc;

    pub const GRAPHEME: &str =
        include_str!("../../tests/fixtures/unicode/GraphemeBreakProperty.txt");
    pub const WORD: &str = include_str!("../../tests/fixtures/unicode/WordBreakProperty.txt");
    pub const EMOJI: &str = include_str!("../../tests/fixtures/unicode/emoji-data.txt");

    pub fn table() -> Arc<PropertyTable> {
        Arc::new(PropertyTable::from_sources(GRAPHEME, WORD, EMOJI))
    }
}
