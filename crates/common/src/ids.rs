use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A stable document id. Shared newtype for objects, classes, verbs and
/// functions — the store never hands out raw strings.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ObjectId(pub String);

/// Classes and objects live in the same id space (§4.3 stage 2 relies on
/// this: a class reference synthesizes a placeholder object sharing the
/// class's id).
pub type ClassId = ObjectId;

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_str(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User-facing `#N` numeric address. Unique, monotonic, never reused
/// (spec.md §3.2 invariant 5).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Dbref(pub u64);

impl fmt::Display for Dbref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Dbref {
    /// Parses the `#123` syntax from spec.md §6. Returns `None` if the
    /// leading `#` or any trailing non-digit is present.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix('#')?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse::<u64>().ok().map(Dbref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_dbref() {
        assert_eq!(Dbref::parse("#42"), Some(Dbref(42)));
    }

    #[test]
    fn rejects_malformed_dbref() {
        assert_eq!(Dbref::parse("42"), None);
        assert_eq!(Dbref::parse("#"), None);
        assert_eq!(Dbref::parse("#4x"), None);
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(Dbref(42).to_string(), "#42");
    }
}
