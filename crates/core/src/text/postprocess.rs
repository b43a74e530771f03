use super::normalize::{is_apostrophe_variant, is_hyphen_variant};

pub fn contains_letter_or_digit(token: &str) -> bool {
    token.chars().any(|c| c.is_alphabetic() || c.is_numeric())
}

/// Splits `can't` into `can`, `'`, `t`; repeats on the remainder.
pub fn split_apostrophes<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    let mut split = Vec::with_capacity(tokens.len());

    for token in tokens {
        let mut rest = token.as_ref();
        while let Some((prefix, apostrophe, suffix)) = split_at_apostrophe(rest) {
            split.push(prefix.to_string());
            split.push(apostrophe.to_string());
            rest = suffix;
        }
        if !rest.is_empty() {
            split.push(rest.to_string());
        }
    }

    split
}

fn split_at_apostrophe(token: &str) -> Option<(&str, &str, &str)> {
    if token.chars().count() < 3 {
        return None;
    }

    let (index, apostrophe) = token
        .char_indices()
        .find(|(_, c)| is_apostrophe_variant(*c))?;
    let end = index + apostrophe.len_utf8();

    let before = token[..index].chars().next_back()?;
    let after = token[end..].chars().next()?;
    if before.is_alphabetic() && after.is_alphabetic() {
        Some((&token[..index], &token[index..end], &token[end..]))
    } else {
        None
    }
}

/// Joins `word - word` triples around a lone hyphen token.
pub fn combine_hyphenated<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    let mut combined = Vec::with_capacity(tokens.len());
    let mut index = 0;

    while index < tokens.len() {
        let current = tokens[index].as_ref();
        if let Some((hyphen, next)) = tokens
            .get(index + 1)
            .zip(tokens.get(index + 2))
            .map(|(hyphen, next)| (hyphen.as_ref(), next.as_ref()))
        {
            if is_lone_hyphen(hyphen)
                && contains_letter_or_digit(current)
                && contains_letter_or_digit(next)
            {
                combined.push(format!("{current}{hyphen}{next}"));
                index += 3;
                continue;
            }
        }

        combined.push(current.to_string());
        index += 1;
    }

    combined
}

fn is_lone_hyphen(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if is_hyphen_variant(c))
}

pub fn words_only(tokens: Vec<String>) -> Vec<String> {
    tokens
        .into_iter()
        .filter(|token| contains_letter_or_digit(token))
        .collect()
}
