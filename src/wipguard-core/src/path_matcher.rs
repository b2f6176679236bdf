//! Wildcard path patterns used for watchdog exclusions.
//!
//! A pattern is split at its last `/` into a directory part and a file name
//! part. `*` matches any run of characters, `?` a single character, and a
//! `**` directory segment matches any number of directories. Patterns
//! without a directory part match the file name in any directory.

use crate::{Result, WipError};

use regex::Regex;

#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: String,
    file_name: Regex,
    dir: Option<Regex>,
}

impl PathMatcher {
    pub fn parse(wildcard_pattern: &str) -> Result<Self> {
        let normalized = wildcard_pattern.trim().replace('\\', "/");
        if normalized.is_empty() {
            return Err(WipError::InvalidPattern {
                pattern: wildcard_pattern.to_string(),
                reason: "pattern is empty".to_string(),
            });
        }

        let (dir_pattern, file_pattern) = match normalized.rfind('/') {
            Some(slash) => (
                Some(dir_to_regex(&normalized[..slash])),
                &normalized[slash + 1..],
            ),
            None => (None, normalized.as_str()),
        };

        let compile = |source: &str| {
            Regex::new(&format!("^(?:{source})$")).map_err(|e| WipError::InvalidPattern {
                pattern: wildcard_pattern.to_string(),
                reason: e.to_string(),
            })
        };

        let file_name = compile(&collapse_any(&wildcards_to_regex(file_pattern)))?;
        let dir = dir_pattern.as_deref().map(compile).transpose()?;

        Ok(Self {
            pattern: wildcard_pattern.to_string(),
            file_name,
            dir,
        })
    }

    /// Parse a `;`-separated list of patterns.
    pub fn parse_list(patterns: &str) -> Result<Vec<Self>> {
        patterns
            .split(';')
            .filter(|p| !p.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, file_path: &str) -> bool {
        let file_path = file_path.replace('\\', "/");
        let (dir, file_name) = match file_path.rfind('/') {
            Some(slash) => (&file_path[..slash], &file_path[slash + 1..]),
            None => ("", file_path.as_str()),
        };
        self.file_name.is_match(file_name)
            && self.dir.as_ref().is_none_or(|d| d.is_match(&absolute(dir)))
    }
}

impl PartialEq for PathMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for PathMatcher {}

fn absolute(dir: &str) -> String {
    if dir.is_empty() || dir.starts_with('/') {
        dir.to_string()
    } else {
        format!("/{dir}")
    }
}

fn wildcards_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match (chars[i], chars.get(i + 1)) {
            ('*', Some('?')) | ('?', Some('*')) => {
                out.push_str(".+");
                i += 2;
                continue;
            }
            ('*', _) => out.push_str(".*"),
            ('?', _) => out.push('.'),
            (c, _) => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out
}

fn collapse_any(regex: &str) -> String {
    let mut out = regex.to_string();
    while out.contains(".*.*") {
        out = out.replace(".*.*", ".*");
    }
    out
}

/// `some/**/path` becomes `/some(/.*)?/path`.
fn dir_to_regex(dir_pattern: &str) -> String {
    let trimmed = dir_pattern.trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    let mut any_dirs = false;
    for segment in trimmed.split('/') {
        if segment == "**" {
            any_dirs = true;
            continue;
        }
        if any_dirs {
            out.push_str("(?:/.*)?");
            any_dirs = false;
        }
        out.push('/');
        out.push_str(&collapse_any(&wildcards_to_regex(segment)));
    }
    if any_dirs {
        out.push_str("(?:/.*)?");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        PathMatcher::parse(pattern).unwrap().matches(path)
    }

    #[test]
    fn test_file_name() {
        assert!(matches("*.approved", "foo.approved"));
        assert!(matches("*.approved", "bar.approved"));
        assert!(matches("*.approved", "/some/path/bar.approved"));
        assert!(!matches("*.approved", "foo.kt"));
    }

    #[test]
    fn test_dir_name() {
        assert!(matches("/some/path/*.approved", "/some/path/foo.approved"));
        assert!(!matches(
            "/some/path/*.approved",
            "/some/other/path/foo.approved"
        ));
        assert!(matches(
            "/some/**/path/*.approved",
            "/some/other/path/foo.approved"
        ));
        assert!(matches(
            "/some/**/path/*.approved",
            "/some/other/longer/path/foo.approved"
        ));
        assert!(!matches(
            "/some/**/path/*.approved",
            "/a/different/path/foo.approved"
        ));
    }

    #[test]
    fn test_relative_paths() {
        assert!(matches("some/excluded/path", "some/excluded/path"));
        assert!(!matches("some/excluded/path", "some/path"));
        assert!(matches("docs/**/*.md", "docs/guide/intro.md"));
        assert!(matches("docs/**/*.md", "docs/intro.md"));
    }

    #[test]
    fn test_single_char_wildcards() {
        assert!(matches("file?.txt", "file1.txt"));
        assert!(!matches("file?.txt", "file12.txt"));
        assert!(matches("file*?.txt", "file12.txt"));
        assert!(!matches("file*?.txt", "file.txt"));
    }

    #[test]
    fn test_dot_is_literal() {
        assert!(!matches("a.b", "axb"));
    }

    #[test]
    fn test_parse_list() {
        let matchers = PathMatcher::parse_list("*.approved; ;docs/*.md").unwrap();
        assert_eq!(matchers.len(), 2);
        assert_eq!(matchers[1].pattern(), "docs/*.md");
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        assert!(matches!(
            PathMatcher::parse("  "),
            Err(WipError::InvalidPattern { .. })
        ));
    }
}
