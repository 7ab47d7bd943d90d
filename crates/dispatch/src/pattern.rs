/// One token of a parsed verb pattern (spec.md §4.4's `pattern` field, e.g.
/// `"put * in *"`, `"*item at *target"`, `"say ..."`).
#[derive(Clone, Debug, PartialEq, Eq)]
enum PatternToken {
    Literal(String),
    Wildcard,
    Capture(String),
    Rest(String),
}

/// Parses a space-separated verb pattern. `*` matches exactly one token
/// (captured positionally as `arg0`, `arg1`, ...), `*name` captures exactly
/// one token under `name`, and `...`/`*rest` captures the remainder of the
/// input verbatim (spec.md §4.5).
fn parse_pattern(pattern: &str) -> Vec<PatternToken> {
    pattern
        .split_whitespace()
        .map(|tok| match tok {
            "*" => PatternToken::Wildcard,
            "..." => PatternToken::Rest("rest".to_string()),
            "*rest" => PatternToken::Rest("rest".to_string()),
            _ if tok.starts_with('*') => PatternToken::Capture(tok[1..].to_string()),
            _ => PatternToken::Literal(tok.to_lowercase()),
        })
        .collect()
}

/// Matches `input` against `pattern`, returning the named captures on
/// success (positional captures use `arg0`, `arg1`, ... for unnamed
/// wildcards so callers can still see how many words they spanned).
pub fn match_pattern(pattern: &str, input: &str) -> Option<Vec<(String, String)>> {
    let tokens = parse_pattern(pattern);
    let words: Vec<&str> = input.split_whitespace().collect();
    let mut captures = Vec::new();
    let mut wi = 0usize;
    let mut positional = 0usize;
    for tok in &tokens {
        match tok {
            PatternToken::Literal(lit) => {
                if wi >= words.len() || !words[wi].eq_ignore_ascii_case(lit) {
                    return None;
                }
                wi += 1;
            }
            PatternToken::Wildcard => {
                if wi >= words.len() {
                    return None;
                }
                captures.push((format!("arg{positional}"), words[wi].to_string()));
                positional += 1;
                wi += 1;
            }
            PatternToken::Capture(name) => {
                if wi >= words.len() {
                    return None;
                }
                captures.push((name.clone(), words[wi].to_string()));
                wi += 1;
            }
            PatternToken::Rest(name) => {
                if wi >= words.len() {
                    return None;
                }
                captures.push((name.clone(), words[wi..].join(" ")));
                wi = words.len();
            }
        }
    }
    if wi == words.len() {
        Some(captures)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_wildcards_capture_one_word_positionally() {
        let caps = match_pattern("put * in *", "put key in box").unwrap();
        assert_eq!(
            caps,
            vec![("arg0".to_string(), "key".to_string()), ("arg1".to_string(), "box".to_string())]
        );
    }

    #[test]
    fn captures_named_groups_exactly_one_token_each() {
        let caps = match_pattern("*item at *target", "gem at pedestal").unwrap();
        assert_eq!(
            caps,
            vec![
                ("item".to_string(), "gem".to_string()),
                ("target".to_string(), "pedestal".to_string()),
            ]
        );
    }

    #[test]
    fn named_capture_rejects_a_multi_word_token() {
        assert!(match_pattern("*item at *target", "red gem at stone pedestal").is_none());
    }

    #[test]
    fn rest_captures_everything_remaining() {
        let caps = match_pattern("say ...", "say hello there friend").unwrap();
        assert_eq!(caps, vec![("rest".to_string(), "hello there friend".to_string())]);
    }

    #[test]
    fn mismatched_literal_fails() {
        assert!(match_pattern("put * in *", "drop key").is_none());
    }
}
