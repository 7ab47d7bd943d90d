/// Splits a query string on non-alphanumeric boundaries, lower-cased — the
/// tokenization the Resolver's token-prefix tier (spec.md §4.3) and the
/// Dispatcher's pattern matcher (§4.5) both need.
pub fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Concatenates the uppercase letters and digits of a name, e.g.
/// `"A Wooden Staff" -> "AWS"` (spec.md §4.3, match-key rule).
pub fn initialism(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Whether every token of `query` has a corresponding candidate token it is
/// a case-insensitive prefix of (spec.md §4.3 token-prefix rule).
pub fn tokens_prefix_match(query_tokens: &[String], candidate_tokens: &[String]) -> bool {
    query_tokens.iter().all(|qt| {
        candidate_tokens
            .iter()
            .any(|ct| ct.to_lowercase().starts_with(qt))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_punctuation() {
        assert_eq!(tokenize("red gem,stone"), vec!["red", "gem", "stone"]);
    }

    #[test]
    fn initialism_picks_uppercase_and_digits() {
        assert_eq!(initialism("A Wooden Staff"), "AWS");
        assert_eq!(initialism("R2 Unit"), "R2U");
    }

    #[test]
    fn prefix_match_requires_every_query_token() {
        let candidate = tokenize("red gemstone");
        assert!(tokens_prefix_match(&tokenize("red gem"), &candidate));
        assert!(!tokens_prefix_match(&tokenize("blue gem"), &candidate));
    }
}
