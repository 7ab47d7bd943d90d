/// Normative exit-direction abbreviation table (spec.md §6). Each entry is
/// (canonical direction, abbreviations).
pub const DIRECTIONS: &[(&str, &[&str])] = &[
    ("north", &["n"]),
    ("south", &["s"]),
    ("east", &["e"]),
    ("west", &["w"]),
    ("northeast", &["ne"]),
    ("northwest", &["nw"]),
    ("southeast", &["se"]),
    ("southwest", &["sw"]),
    ("up", &["u"]),
    ("down", &["d"]),
    ("out", &["o"]),
    ("port", &["p"]),
    ("starboard", &["s", "stbd"]),
    ("forward", &["f", "fore"]),
    ("aft", &["a"]),
    ("turbolift", &["tl"]),
    ("clockwise", &["cw", "clock"]),
    ("counterclockwise", &["ccw", "counter", "anticlockwise"]),
    ("hubward", &["h", "hw", "hub", "inward"]),
    ("rimward", &["r", "rw", "rim", "outward"]),
];

/// All match keys (canonical name plus abbreviations) for a `direction`
/// property value, case-insensitive.
pub fn direction_match_keys(direction: &str) -> Vec<String> {
    let mut keys = vec![direction.to_lowercase()];
    if let Some((_, abbrevs)) = DIRECTIONS
        .iter()
        .find(|(d, _)| d.eq_ignore_ascii_case(direction))
    {
        keys.extend(abbrevs.iter().map(|s| s.to_string()));
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hubward_has_all_documented_abbreviations() {
        let keys = direction_match_keys("hubward");
        for abbr in ["h", "hw", "hub", "inward"] {
            assert!(keys.contains(&abbr.to_string()), "missing {abbr}");
        }
    }

    #[test]
    fn unknown_direction_yields_only_itself() {
        assert_eq!(direction_match_keys("spinward"), vec!["spinward".to_string()]);
    }
}
