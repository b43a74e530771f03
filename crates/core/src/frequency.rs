use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    #[serde(rename = "type")]
    pub term: String,
    pub freq: u64,
}

/// Term counter with a deterministic output order: count descending, ties
/// in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct FrequencyMap {
    positions: FxHashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl FrequencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, term: &str) {
        match self.positions.get(term) {
            Some(&position) => self.entries[position].1 += 1,
            None => {
                self.positions.insert(term.to_string(), self.entries.len());
                self.entries.push((term.to_string(), 1));
            }
        }
    }

    pub fn count(&self, term: &str) -> u64 {
        self.positions
            .get(term)
            .map_or(0, |&position| self.entries[position].1)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.positions.contains_key(term)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Terms in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries
            .iter()
            .map(|(term, count)| (term.as_str(), *count))
    }

    pub fn most_common(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self.iter().collect();
        // stable sort keeps first-seen order among equal counts
        ranked.sort_by(|left, right| right.1.cmp(&left.1));
        ranked
    }

    pub fn terms(&self) -> Vec<String> {
        self.most_common()
            .into_iter()
            .map(|(term, _)| term.to_string())
            .collect()
    }

    pub fn term_counts(&self) -> Vec<TermCount> {
        self.most_common()
            .into_iter()
            .map(|(term, freq)| TermCount {
                term: term.to_string(),
                freq,
            })
            .collect()
    }
}

impl<S: AsRef<str>> Extend<S> for FrequencyMap {
    fn extend<I: IntoIterator<Item = S>>(&mut self, terms: I) {
        for term in terms {
            self.add(term.as_ref());
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for FrequencyMap {
    fn from_iter<I: IntoIterator<Item = S>>(terms: I) -> Self {
        let mut map = Self::new();
        map.extend(terms);
        map
    }
}

/// Counts space-joined n-grams over a window sliding one token at a time.
pub fn ngrams<S: AsRef<str>>(tokens: &[S], size: usize) -> FrequencyMap {
    if size == 0 {
        return FrequencyMap::new();
    }

    tokens
        .windows(size)
        .map(|window| {
            window
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(" ")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_count_then_first_seen() {
        let map: FrequencyMap = ["b", "a", "c", "a", "c", "d"].into_iter().collect();
        assert_eq!(map.terms(), vec!["a", "c", "b", "d"]);
        assert_eq!(map.count("a"), 2);
        assert_eq!(map.count("zzz"), 0);
    }

    #[test]
    fn term_counts_serialize_with_type_key() -> Result<(), serde_json::Error> {
        let map: FrequencyMap = ["x", "x", "y"].into_iter().collect();
        let json = serde_json::to_value(map.term_counts())?;
        assert_eq!(
            json,
            serde_json::json!([{"type": "x", "freq": 2}, {"type": "y", "freq": 1}])
        );
        Ok(())
    }

    #[test]
    fn bigrams_and_trigrams_slide_by_one() {
        let tokens = ["a", "b", "a", "b", "c"];
        let bigrams = ngrams(&tokens, 2);
        assert_eq!(bigrams.terms(), vec!["a b", "b a", "b c"]);
        assert_eq!(bigrams.count("a b"), 2);

        let trigrams = ngrams(&tokens, 3);
        assert_eq!(trigrams.terms(), vec!["a b a", "b a b", "a b c"]);
    }

    #[test]
    fn ngrams_of_short_input_are_empty() {
        assert!(ngrams(&["only"], 2).is_empty());
        assert!(ngrams::<&str>(&[], 3).is_empty());
        assert!(ngrams(&["a", "b"], 0).is_empty());
    }

    #[test]
    fn iteration_is_first_seen() {
        let map: FrequencyMap = ["z", "y", "y"].into_iter().collect();
        let seen: Vec<&str> = map.iter().map(|(term, _)| term).collect();
        assert_eq!(seen, vec!["z", "y"]);
    }
}
