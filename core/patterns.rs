//! Gitignore-style pattern sets.
//!
//! Matching follows `.gitignore` rules: a trailing `/` only matches
//! directories, a pattern without `/` matches the basename at any depth, a
//! leading `/` anchors to the root and `**` crosses directories. Patterns are
//! evaluated in order and the last match wins, so a later `!pattern` undoes
//! an earlier match.

use crate::error::{AppError, Result};
use globset::GlobBuilder;
use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log;
use std::path::Path;

const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}'];
const ESCAPABLE: &[char] = &['*', '?', '[', ']', '{', '}', '!', '#', '\\', ' '];

#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    matcher: Gitignore,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl PatternSet {
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            matcher: Gitignore::empty(),
        }
    }

    /// Compiles `patterns` in declaration order. Every pattern is validated
    /// first, so a set that builds never fails while matching.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(".");
        let mut kept = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let pattern = raw.trim_end_matches(['\r', '\n']);
            if pattern.trim().is_empty() {
                log::trace!("Skipping blank pattern");
                continue;
            }
            validate_pattern(pattern)?;
            builder.add_line(None, pattern).map_err(|e| {
                AppError::Config(format!("Invalid pattern \"{}\": {}", pattern, e))
            })?;
            log::trace!("Added pattern: {}", pattern);
            kept.push(pattern.to_string());
        }
        let matcher = builder.build()?;
        Ok(Self {
            patterns: kept,
            matcher,
        })
    }

    /// True when the last pattern applying to `relative_path` is a positive
    /// (non-negated) one.
    pub fn matches(&self, relative_path: &Path, is_dir: bool) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        matches!(
            self.matcher.matched(relative_path, is_dir),
            Match::Ignore(_)
        )
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Checks one raw pattern for syntax problems: unbalanced `[]` or `{}`, an
/// orphan `\` escape, or anything the glob compiler refuses.
pub fn validate_pattern(pattern: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(AppError::Config(format!(
            "Invalid pattern \"{}\": {}",
            pattern, reason
        )))
    };

    if pattern.matches('[').count() != pattern.matches(']').count() {
        return invalid("unmatched brackets");
    }
    if pattern.matches('{').count() != pattern.matches('}').count() {
        return invalid("unmatched braces");
    }

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            continue;
        }
        match chars.next() {
            Some(next) if ESCAPABLE.contains(&next) => {}
            Some(next) => {
                return invalid(&format!("invalid escape sequence '\\{}'", next));
            }
            None => return invalid("trailing escape character"),
        }
    }

    let body = pattern.strip_prefix('!').unwrap_or(pattern);
    let body = body.strip_prefix('/').unwrap_or(body);
    let body = body.strip_suffix('/').unwrap_or(body);
    if body.contains(GLOB_META) || body.contains('\\') {
        GlobBuilder::new(body)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .map_err(|e| AppError::Config(format!("Invalid pattern \"{}\": {}", pattern, e)))?;
    }
    Ok(())
}

pub fn validate_patterns(patterns: &[String], context: &str) -> Result<()> {
    for pattern in patterns {
        validate_pattern(pattern).map_err(|e| match e {
            AppError::Config(msg) => AppError::Config(format!("{} (in {})", msg, context)),
            other => other,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> PatternSet {
        let owned: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        PatternSet::new(&owned).unwrap()
    }

    #[test]
    fn empty_set_matches_nothing() {
        let empty = PatternSet::empty();
        assert!(!empty.matches(Path::new("a.txt"), false));
        assert!(!empty.matches(Path::new("dir"), true));
        assert!(set(&[]).is_empty());
    }

    #[test]
    fn basename_pattern_matches_at_any_depth() {
        let s = set(&["*.log"]);
        assert!(s.matches(Path::new("a.log"), false));
        assert!(s.matches(Path::new("deep/nested/b.log"), false));
        assert!(!s.matches(Path::new("b.py"), false));
    }

    #[test]
    fn anchored_pattern_only_matches_at_root() {
        let s = set(&["/build"]);
        assert!(s.matches(Path::new("build"), true));
        assert!(!s.matches(Path::new("src/build"), true));
    }

    #[test]
    fn trailing_slash_only_matches_directories() {
        let s = set(&["logs/"]);
        assert!(s.matches(Path::new("logs"), true));
        assert!(!s.matches(Path::new("logs"), false));
    }

    #[test]
    fn double_star_crosses_directories() {
        let s = set(&["**/node_modules/**"]);
        assert!(s.matches(Path::new("web/node_modules/lib/index.js"), false));
        assert!(!s.matches(Path::new("web/src/index.js"), false));
    }

    #[test]
    fn last_match_wins_with_negation() {
        let s = set(&["*.md", "!README.md"]);
        assert!(!s.matches(Path::new("README.md"), false));
        assert!(s.matches(Path::new("other.md"), false));

        let reversed = set(&["!README.md", "*.md"]);
        assert!(reversed.matches(Path::new("README.md"), false));
    }

    #[test]
    fn matching_is_independent_of_query_order() {
        let s = set(&["*.rs", "!keep.rs"]);
        let first = s.matches(Path::new("keep.rs"), false);
        s.matches(Path::new("other.rs"), false);
        s.matches(Path::new("x/y/z.rs"), false);
        assert_eq!(first, s.matches(Path::new("keep.rs"), false));
    }

    #[test]
    fn rejects_unbalanced_brackets_and_braces() {
        assert!(matches!(
            validate_pattern("src/[abc.rs"),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            validate_pattern("*.{rs,toml"),
            Err(AppError::Config(_))
        ));
        assert!(PatternSet::new(&["a]".to_string()]).is_err());
    }

    #[test]
    fn rejects_orphan_escapes() {
        assert!(validate_pattern("foo\\").is_err());
        assert!(validate_pattern("fo\\o").is_err());
        assert!(validate_pattern("\\#literal").is_ok());
        assert!(validate_pattern("file\\*name").is_ok());
    }

    #[test]
    fn accepts_common_patterns() {
        for p in ["*.rs", "**/*.{rs,toml}", "/target", "docs/", "!README.md", "src/[ab]*.c"] {
            assert!(validate_pattern(p).is_ok(), "pattern {} should be valid", p);
        }
    }

    #[test]
    fn validate_patterns_names_the_context() {
        let err = validate_patterns(&["ok.rs".to_string(), "bad[".to_string()], "exclude files")
            .unwrap_err();
        assert!(err.to_string().contains("exclude files"));
    }
}
