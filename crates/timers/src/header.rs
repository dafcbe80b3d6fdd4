//! Server-Timing header export.
//!
//! A flattened tree becomes one header value, one token per timer:
//!
//! ```text
//! Request;descr="Request";dur=12.345;start=1700000000123;parent=0;id=1, db;descr="db";dur=0;parent=1;id=2
//! ```
//!
//! Token names are restricted to `[A-Za-z0-9_]` and are unique within one
//! header value; the original name travels in `descr`. Unstarted timers carry
//! `dur=0` and no `start`.

use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::tree::FlatTimer;

/// Header name used by browsers and tools.
pub const SERVER_TIMING: &str = "Server-Timing";

/// Separator placed between tokens.
pub const DEFAULT_SEPARATOR: &str = ", ";

/// Token name used when sanitizing leaves nothing meaningful.
pub const FALLBACK_NAME: &str = "timer";

fn invalid_chars() -> &'static Regex {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    INVALID.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("name pattern is a valid regex"))
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
///
/// Empty and all-underscore results become [`FALLBACK_NAME`].
pub fn sanitize_name(name: &str) -> String {
    let cleaned = invalid_chars().replace_all(name, "_").into_owned();

    if cleaned.chars().all(|c| c == '_') {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// Hands out collision-free token names for a single header value.
#[derive(Debug, Default)]
pub struct TokenNames {
    used: HashSet<String>,
}

impl TokenNames {
    /// Start with no names in use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitized form of `name`, suffixed with the smallest unused integer
    /// if the plain form is already taken.
    pub fn claim(&mut self, name: &str) -> String {
        let base = sanitize_name(name);
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut suffix: u64 = 0;
        loop {
            let candidate = format!("{base}{suffix}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

/// Quote `s` for a `descr` attribute, escaping embedded quotes.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// Format one token for `entry` under the given unique name.
pub fn format_token(token_name: &str, entry: &FlatTimer) -> String {
    let timer = &entry.timer;
    let timing = match timer.start() {
        None => ";dur=0".to_string(),
        Some(start) => format!(";dur={:.3};start={}", timer.milliseconds(), start.epoch_ms()),
    };
    format!(
        "{};descr={}{};parent={};id={}",
        token_name,
        quote(timer.name()),
        timing,
        entry.parent_id,
        entry.id
    )
}

/// Header value for a flattened tree, tokens joined by `separator`.
pub fn format_header_with(entries: &[FlatTimer], separator: &str) -> String {
    let mut names = TokenNames::new();
    entries
        .iter()
        .map(|entry| format_token(&names.claim(entry.timer.name()), entry))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Header value for a flattened tree using [`DEFAULT_SEPARATOR`].
pub fn format_header(entries: &[FlatTimer]) -> String {
    format_header_with(entries, DEFAULT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::TimerSet;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Test123_"), "Test123_");
        assert_eq!(sanitize_name("db query #2"), "db_query__2");
        assert_eq!(sanitize_name(""), "timer");
        assert_eq!(sanitize_name("_"), "timer");
        assert_eq!(sanitize_name("!!"), "timer");
        assert_eq!(sanitize_name("né"), "n_");
    }

    #[test]
    fn test_claim_resolves_collisions() {
        let mut names = TokenNames::new();
        assert_eq!(names.claim("Test"), "Test");
        assert_eq!(names.claim("Test"), "Test0");
        assert_eq!(names.claim("Test"), "Test1");
        assert_eq!(names.claim("a b"), "a_b");
        assert_eq!(names.claim("a-b"), "a_b0");
        assert_eq!(names.claim(""), "timer");
        assert_eq!(names.claim("?"), "timer0");
    }

    #[test]
    fn test_claim_skips_taken_suffixes() {
        let mut names = TokenNames::new();
        assert_eq!(names.claim("x0"), "x0");
        assert_eq!(names.claim("x"), "x");
        assert_eq!(names.claim("x"), "x1");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"say "hi""#), r#""say \"hi\"""#);
    }

    #[test]
    fn test_unstarted_token() {
        let set = TimerSet::new();
        set.new_timer("Idle timer");
        assert_eq!(
            set.server_timing(),
            r#"Idle_timer;descr="Idle timer";dur=0;parent=0;id=1"#
        );
    }

    #[test]
    fn test_started_token() {
        let set = TimerSet::new();
        let timer = set.new_timer("Test");
        timer.start().stop();
        let header = set.server_timing();
        let start = timer.snapshot().start().unwrap().epoch_ms();

        assert_eq!(
            header,
            format!(
                "Test;descr=\"Test\";dur={:.3};start={};parent=0;id=1",
                timer.milliseconds(),
                start
            )
        );
    }

    #[test]
    fn test_nested_tokens() {
        let set = TimerSet::new();
        set.new_timer("Test");
        let (_, child) = set.new_parent_timer("Test");
        child.new_timer("inner");

        let header = set.server_timing();
        let tokens: Vec<_> = header.split(", ").collect();
        assert_eq!(tokens.len(), 3);
        assert!(tokens[0].starts_with("Test;"));
        assert!(tokens[1].starts_with("Test0;"));
        assert!(tokens[2].ends_with(";parent=2;id=3"));
    }

    #[test]
    fn test_custom_separator() {
        let set = TimerSet::new();
        set.new_timer("a");
        set.new_timer("b");
        let header = format_header_with(&set.all_deep(), ",");
        assert_eq!(header.matches(',').count(), 1);
    }

    proptest! {
        #[test]
        fn prop_header_tokens_unique_and_restricted(
            steps in prop::collection::vec(("[^,]{0,6}", any::<bool>()), 0..20)
        ) {
            let root = TimerSet::shared();
            let mut current = Arc::clone(&root);
            for (name, descend) in &steps {
                if *descend {
                    let (_, child) = current.new_parent_timer(name.clone());
                    current = child;
                } else {
                    current.new_timer(name.clone());
                }
            }

            let entries = root.all_deep();
            prop_assert_eq!(entries.len(), steps.len());
            let header = format_header(&entries);
            let tokens: Vec<&str> = if header.is_empty() {
                Vec::new()
            } else {
                header.split(DEFAULT_SEPARATOR).collect()
            };
            prop_assert_eq!(tokens.len(), entries.len());

            let mut seen = HashSet::new();
            for (token, entry) in tokens.iter().zip(&entries) {
                let (name, rest) = token.split_once(';').unwrap_or((*token, ""));
                prop_assert!(!name.is_empty());
                prop_assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
                prop_assert!(seen.insert(name.to_string()), "duplicate token name {}", name);
                prop_assert!(rest.starts_with("descr=\""));
                let suffix = format!(";parent={};id={}", entry.parent_id, entry.id);
                prop_assert!(token.ends_with(&suffix));
            }
        }
    }
}
