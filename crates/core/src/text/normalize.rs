use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::RangeInclusive;
use unicode_normalization::UnicodeNormalization;

pub const SPACE_VARIANTS: [char; 21] = [
    '\u{0009}', '\u{000B}', '\u{000C}', '\u{0020}', '\u{00A0}', '\u{2000}', '\u{2001}',
    '\u{2002}', '\u{2003}', '\u{2004}', '\u{2005}', '\u{2006}', '\u{2007}', '\u{2008}',
    '\u{2009}', '\u{200A}', '\u{200B}', '\u{202F}', '\u{205F}', '\u{3000}', '\u{FEFF}',
];

pub const HYPHEN_VARIANTS: [char; 13] = [
    '\u{002D}', '\u{00AD}', '\u{058A}', '\u{1806}', '\u{2010}', '\u{2011}', '\u{2012}',
    '\u{2013}', '\u{2014}', '\u{2015}', '\u{207B}', '\u{208B}', '\u{2212}',
];

pub const APOSTROPHE_VARIANTS: [char; 11] = [
    '\u{0027}', '\u{0091}', '\u{0092}', '\u{00B4}', '\u{02BC}', '\u{02CD}', '\u{2018}',
    '\u{2019}', '\u{201A}', '\u{201B}', '\u{0060}',
];

// Tab, LF and CR survive; the rest of C0 and the two non-characters go.
const DENIED_CODEPOINTS: [RangeInclusive<char>; 4] = [
    '\u{0000}'..='\u{0008}',
    '\u{000B}'..='\u{000C}',
    '\u{000E}'..='\u{001F}',
    '\u{FFFE}'..='\u{FFFF}',
];

static NEWLINE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("newline pattern is valid"));

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+://\S+").expect("url pattern is valid"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"));
static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\S+").expect("mention pattern is valid"));

pub fn is_space_variant(c: char) -> bool {
    SPACE_VARIANTS.contains(&c)
}

pub fn is_hyphen_variant(c: char) -> bool {
    HYPHEN_VARIANTS.contains(&c)
}

pub fn is_apostrophe_variant(c: char) -> bool {
    APOSTROPHE_VARIANTS.contains(&c)
}

/// Decodes until no entity is left, so `&amp;lt;` ends up as `<`.
pub fn decode_entities(text: &str) -> String {
    let mut decoded = text.to_string();
    loop {
        let next = html_escape::decode_html_entities(&decoded);
        if next == decoded {
            return decoded;
        }
        decoded = next.into_owned();
    }
}

pub fn remove_control(text: &str) -> String {
    text.chars()
        .filter(|c| !DENIED_CODEPOINTS.iter().any(|range| range.contains(c)))
        .collect()
}

pub fn normalise(text: &str) -> String {
    text.nfc().collect()
}

pub fn fold_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| {
            if is_space_variant(c) {
                ' '
            } else if is_hyphen_variant(c) {
                '-'
            } else if is_apostrophe_variant(c) {
                '\''
            } else {
                c
            }
        })
        .collect()
}

pub fn collapse_whitespace(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let last = lines.len().saturating_sub(1);

    // a run of spaces sitting between two newlines is an empty line
    let without_blank_lines = lines
        .iter()
        .copied()
        .enumerate()
        .map(|(index, line)| {
            let interior = index > 0 && index < last;
            if interior && !line.is_empty() && line.chars().all(is_space_variant) {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let newlines_capped = NEWLINE_RUN_RE.replace_all(&without_blank_lines, "\n\n");

    let mut collapsed = String::with_capacity(newlines_capped.len());
    let mut in_space_run = false;
    for c in newlines_capped.chars() {
        if is_space_variant(c) {
            if !in_space_run {
                collapsed.push(' ');
            }
            in_space_run = true;
        } else {
            collapsed.push(c);
            in_space_run = false;
        }
    }

    collapsed.trim().to_string()
}

/// Full cleaning chain applied before segmentation.
///
/// Dropping a control character or lowercasing can expose a new entity,
/// so the chain is repeated until its output is stable.
pub fn clean(text: &str) -> String {
    let mut cleaned = clean_pass(text);
    loop {
        let next = clean_pass(&cleaned);
        if next == cleaned {
            return cleaned;
        }
        cleaned = next;
    }
}

fn clean_pass(text: &str) -> String {
    let text = decode_entities(text);
    let text = remove_control(&text);
    let text = normalise(&text).to_lowercase();
    let text = fold_punctuation(&text);
    collapse_whitespace(&text)
}

/// Drops links, email addresses and `@handles` outright.
pub fn anonymize(text: &str) -> String {
    let text = URL_RE.replace_all(text, "");
    let text = EMAIL_RE.replace_all(&text, "");
    MENTION_RE.replace_all(&text, "").into_owned()
}
