//! Word segmentation after Unicode TR29, simplified.
//!
//! The segmenter walks the text with a four codepoint window
//! (`far_left`, `left`, `right`, `far_right`) and decides for every
//! `left | right` position whether a token boundary falls there. Word rules
//! run first in fixed precedence; when none of them decides, the grapheme
//! cluster rules have the final say. The returned tokens are slices of the
//! input and always concatenate back to it.

use super::properties::{CodepointProps, GraphemeProps, PropertyTable, WordProps};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub far_left: CodepointProps,
    pub left: CodepointProps,
    pub right: CodepointProps,
    pub far_right: CodepointProps,
}

impl Window {
    fn shift(&mut self, next: CodepointProps) {
        self.far_left = self.left;
        self.left = self.right;
        self.right = self.far_right;
        self.far_right = next;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WordSegmenter<'t> {
    table: &'t PropertyTable,
}

impl<'t> WordSegmenter<'t> {
    pub fn new(table: &'t PropertyTable) -> Self {
        Self { table }
    }

    /// Byte offsets of every interior boundary, ascending.
    pub fn boundaries(&self, text: &str) -> Vec<usize> {
        let codepoints: Vec<(usize, CodepointProps)> = text
            .char_indices()
            .map(|(offset, c)| (offset, self.table.lookup(c)))
            .collect();

        let props_at = |index: usize| {
            codepoints
                .get(index)
                .map(|(_, props)| *props)
                .unwrap_or_default()
        };

        let mut boundaries = Vec::new();
        let mut window = Window {
            right: props_at(0),
            far_right: props_at(1),
            ..Window::default()
        };

        for (index, (offset, _)) in codepoints.iter().enumerate().skip(1) {
            window.shift(props_at(index + 1));
            if is_word_break(&window) {
                boundaries.push(*offset);
            }
        }

        boundaries
    }

    pub fn segment<'a>(&self, text: &'a str) -> Vec<&'a str> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut tokens = Vec::new();
        let mut start = 0;
        for end in self.boundaries(text) {
            tokens.push(&text[start..end]);
            start = end;
        }
        tokens.push(&text[start..]);
        tokens
    }
}

pub fn is_word_break(window: &Window) -> bool {
    let far_left = window.far_left.word;
    let left = window.left.word;
    let right = window.right.word;
    let far_right = window.far_right.word;

    let letter = WordProps::AH_LETTER;
    let mid_letter = WordProps::MID_LETTER | WordProps::MID_NUM_LET | WordProps::SINGLE_QUOTE;
    let mid_num = WordProps::MID_NUM | WordProps::MID_NUM_LET | WordProps::SINGLE_QUOTE;

    // CR x LF, then hard breaks around line endings
    if left.intersects(WordProps::CR) && right.intersects(WordProps::LF) {
        return false;
    }
    if left.intersects(WordProps::NEWLINE_ANY) || right.intersects(WordProps::NEWLINE_ANY) {
        return true;
    }

    // emoji zwj sequences
    if far_left.intersects(WordProps::EXTEND)
        && left.intersects(WordProps::ZWJ)
        && right.intersects(WordProps::EXTENDED_PICTOGRAPHIC)
    {
        return false;
    }
    if left.intersects(WordProps::ZWJ) && right.intersects(WordProps::EXTENDED_PICTOGRAPHIC) {
        return false;
    }

    if left.intersects(WordProps::WSEG_SPACE) && right.intersects(WordProps::WSEG_SPACE) {
        return false;
    }

    if right.intersects(WordProps::EXTEND | WordProps::FORMAT | WordProps::ZWJ) {
        return false;
    }

    if left.intersects(letter) && right.intersects(letter) {
        return false;
    }

    // letter (mid) letter
    if left.intersects(letter) && right.intersects(mid_letter) && far_right.intersects(letter) {
        return false;
    }
    if far_left.intersects(letter) && left.intersects(mid_letter) && right.intersects(letter) {
        return false;
    }

    // hebrew quotes
    if left.intersects(WordProps::HEBREW_LETTER) && right.intersects(WordProps::SINGLE_QUOTE) {
        return false;
    }
    if left.intersects(WordProps::HEBREW_LETTER)
        && right.intersects(WordProps::DOUBLE_QUOTE)
        && far_right.intersects(WordProps::HEBREW_LETTER)
    {
        return false;
    }
    if far_left.intersects(WordProps::HEBREW_LETTER)
        && left.intersects(WordProps::DOUBLE_QUOTE)
        && right.intersects(WordProps::HEBREW_LETTER)
    {
        return false;
    }

    // digits, alone or mixed with letters
    if left.intersects(WordProps::NUMERIC) && right.intersects(WordProps::NUMERIC) {
        return false;
    }
    if left.intersects(letter) && right.intersects(WordProps::NUMERIC) {
        return false;
    }
    if left.intersects(WordProps::NUMERIC) && right.intersects(letter) {
        return false;
    }

    // digit (separator) digit
    if far_left.intersects(WordProps::NUMERIC)
        && left.intersects(mid_num)
        && right.intersects(WordProps::NUMERIC)
    {
        return false;
    }
    if left.intersects(WordProps::NUMERIC)
        && right.intersects(mid_num)
        && far_right.intersects(WordProps::NUMERIC)
    {
        return false;
    }

    if left.intersects(WordProps::KATAKANA) && right.intersects(WordProps::KATAKANA) {
        return false;
    }

    let extendable = letter | WordProps::NUMERIC | WordProps::KATAKANA;
    if left.intersects(extendable | WordProps::EXTEND_NUM_LET)
        && right.intersects(WordProps::EXTEND_NUM_LET)
    {
        return false;
    }
    if left.intersects(WordProps::EXTEND_NUM_LET) && right.intersects(extendable) {
        return false;
    }

    if left.intersects(WordProps::REGIONAL_INDICATOR)
        && right.intersects(WordProps::REGIONAL_INDICATOR)
    {
        return false;
    }

    is_grapheme_break(window.left.grapheme, window.right.grapheme)
}

/// Only the non-breaking grapheme rules; emoji and regional indicators are
/// already settled by the word rules.
pub fn is_grapheme_break(left: GraphemeProps, right: GraphemeProps) -> bool {
    if left.intersects(GraphemeProps::CR) && right.intersects(GraphemeProps::LF) {
        return false;
    }

    // hangul syllables
    if left.intersects(GraphemeProps::L)
        && right.intersects(
            GraphemeProps::L | GraphemeProps::V | GraphemeProps::LV | GraphemeProps::LVT,
        )
    {
        return false;
    }
    if left.intersects(GraphemeProps::LV | GraphemeProps::V)
        && right.intersects(GraphemeProps::V | GraphemeProps::T)
    {
        return false;
    }
    if left.intersects(GraphemeProps::LVT | GraphemeProps::T) && right.intersects(GraphemeProps::T)
    {
        return false;
    }

    if right.intersects(GraphemeProps::EXTEND | GraphemeProps::ZWJ | GraphemeProps::SPACING_MARK) {
        return false;
    }
    if left.intersects(GraphemeProps::PREPEND) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::properties::fixtures;

    fn segment(text: &str) -> Vec<String> {
        let table = fixtures::table();
        WordSegmenter::new(&table)
            .segment(text)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(segment("").is_empty());
    }

    #[test]
    fn single_codepoint_is_one_token() {
        assert_eq!(segment("a"), vec!["a"]);
        assert_eq!(segment("!"), vec!["!"]);
    }

    #[test]
    fn words_spaces_and_punctuation() {
        assert_eq!(
            segment("hello, world!"),
            vec!["hello", ",", " ", "world", "!"]
        );
    }

    #[test]
    fn whitespace_runs_stay_together() {
        assert_eq!(segment("a   b"), vec!["a", "   ", "b"]);
        assert_eq!(segment("   "), vec!["   "]);
    }

    #[test]
    fn infix_apostrophe_keeps_word_together() {
        assert_eq!(segment("can't stop"), vec!["can't", " ", "stop"]);
        assert_eq!(segment("'tis"), vec!["'", "tis"]);
    }

    #[test]
    fn numbers_with_separators() {
        assert_eq!(segment("3.14 1,000"), vec!["3.14", " ", "1,000"]);
        assert_eq!(segment("covid19"), vec!["covid19"]);
        assert_eq!(segment("end."), vec!["end", "."]);
    }

    #[test]
    fn hashtag_symbol_is_separate() {
        assert_eq!(segment("#covid19"), vec!["#", "covid19"]);
    }

    #[test]
    fn newlines_always_break() {
        assert_eq!(segment("a\nb"), vec!["a", "\n", "b"]);
        assert_eq!(segment("a\r\nb"), vec!["a", "\r\n", "b"]);
        assert_eq!(segment("\n\n"), vec!["\n", "\n"]);
    }

    #[test]
    fn combining_marks_attach_left() {
        assert_eq!(segment("e\u{0301} x"), vec!["e\u{0301}", " ", "x"]);
        assert_eq!(segment("!\u{0301}"), vec!["!\u{0301}"]);
    }

    #[test]
    fn emoji_zwj_and_flags() {
        let family = "\u{1F469}\u{200D}\u{1F466}";
        assert_eq!(segment(family), vec![family]);

        let flag = "\u{1F1EC}\u{1F1E7}";
        assert_eq!(segment(flag), vec![flag]);

        assert_eq!(segment("\u{1F600}\u{1F600}"), vec!["\u{1F600}", "\u{1F600}"]);
    }

    #[test]
    fn underscores_extend_words() {
        assert_eq!(segment("snake_case_42"), vec!["snake_case_42"]);
    }

    #[test]
    fn katakana_runs_and_hangul_jamo() {
        assert_eq!(segment("\u{30AB}\u{30BF}\u{30AB}\u{30CA}"), vec!["\u{30AB}\u{30BF}\u{30AB}\u{30CA}"]);
        assert_eq!(segment("\u{1100}\u{1161}\u{11A8}"), vec!["\u{1100}\u{1161}\u{11A8}"]);
    }

    #[test]
    fn hebrew_gershayim() {
        let word = "\u{05E6}\u{05D4}\u{0022}\u{05DC}";
        assert_eq!(segment(word), vec![word]);
    }

    #[test]
    fn segmentation_is_lossless() {
        let samples = [
            "",
            "x",
            " ",
            "  \t ",
            "It's 3.5km — “quoted” @user #tag https://t.co/abc",
            "\u{05E9}\u{05DC}\u{05D5}\u{05DD} \u{1F1FA}\u{1F1F8}\u{1F1EC}\u{1F1E7}",
            "line one\r\nline two\n\n\u{1F44D}\u{1F3FD}!",
        ];

        for sample in samples {
            let tokens = segment(sample);
            assert_eq!(tokens.concat(), sample);
            assert!(tokens.iter().all(|token| !token.is_empty()));
        }
    }

    #[test]
    fn boundaries_are_char_aligned_and_ascending() {
        let table = fixtures::table();
        let text = "é\u{1F600} ok";
        let boundaries = WordSegmenter::new(&table).boundaries(text);
        assert!(boundaries.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(boundaries.iter().all(|offset| text.is_char_boundary(*offset)));
    }
}
