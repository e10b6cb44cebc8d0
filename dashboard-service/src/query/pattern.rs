//! Free-text search patterns.
//!
//! A [`SearchPattern`] is a case-insensitive literal matcher built from user
//! input. It renders to a BSON regex for MongoDB and compiles to a
//! [`regex::Regex`] for in-process evaluation, so both stores agree on what
//! matches.

use bson::Regex as BsonRegex;
use regex::{Regex, RegexBuilder};

const METACHARACTERS: &[char] = &[
    '.', '*', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\',
];

#[derive(Debug, Clone)]
pub struct SearchPattern {
    raw: String,
    escaped: String,
    matcher: Option<Regex>,
}

impl SearchPattern {
    /// Build a pattern from raw search text.
    ///
    /// Empty input yields `None`, which callers treat as "no filter".
    pub fn build(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        let escaped = escape(raw);
        // Only fails past the compiled size limit.
        let matcher = RegexBuilder::new(&escaped)
            .case_insensitive(true)
            .build()
            .ok();

        Some(Self {
            raw: raw.to_string(),
            escaped,
            matcher,
        })
    }

    /// Escaped pattern source.
    pub fn as_str(&self) -> &str {
        &self.escaped
    }

    pub fn is_match(&self, text: &str) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.is_match(text),
            None => text.to_lowercase().contains(&self.raw.to_lowercase()),
        }
    }

    /// MongoDB form: `{ $regex: <escaped>, $options: "i" }`.
    pub fn to_bson(&self) -> BsonRegex {
        BsonRegex {
            pattern: self.escaped.clone(),
            options: "i".to_string(),
        }
    }
}

impl PartialEq for SearchPattern {
    fn eq(&self, other: &Self) -> bool {
        self.escaped == other.escaped
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() * 2);
    for c in raw.chars() {
        if METACHARACTERS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_absent() {
        assert!(SearchPattern::build("").is_none());
    }

    #[test]
    fn test_whitespace_is_a_pattern() {
        let pattern = SearchPattern::build(" ").unwrap();
        assert!(pattern.is_match("Evil Rabbit"));
        assert!(!pattern.is_match("Delba"));
    }

    #[test]
    fn test_case_insensitive() {
        let pattern = SearchPattern::build("lee").unwrap();
        assert!(pattern.is_match("Lee Robinson"));
        assert!(pattern.is_match("LEE"));
        assert!(pattern.is_match("lee@robinson.com"));
    }

    #[test]
    fn test_matches_itself() {
        for raw in ["a.b", "(x)", "[1-2]", "$100", "c++", "a|b", "^start", "back\\slash", "{2}"] {
            let pattern = SearchPattern::build(raw).unwrap();
            assert!(pattern.is_match(raw), "{} should match itself", raw);
            assert!(
                pattern.is_match(&format!("prefix .*+ {} suffix ()", raw)),
                "{} should match when embedded",
                raw
            );
        }
    }

    #[test]
    fn test_dot_is_literal() {
        let pattern = SearchPattern::build("a.b").unwrap();
        assert!(pattern.is_match("A.B"));
        assert!(!pattern.is_match("axb"));
    }

    #[test]
    fn test_alternation_is_literal() {
        let pattern = SearchPattern::build("paid|pending").unwrap();
        assert!(!pattern.is_match("paid"));
        assert!(pattern.is_match("paid|pending"));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape("[x]"), "\\[x\\]");
        assert_eq!(escape("plain text"), "plain text");
        assert_eq!(escape("\\"), "\\\\");
    }

    #[test]
    fn test_bson_form() {
        let regex = SearchPattern::build("a.b").unwrap().to_bson();
        assert_eq!(regex.pattern, "a\\.b");
        assert_eq!(regex.options, "i");
    }
}
