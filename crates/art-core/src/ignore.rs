//! .artignore — user-configurable file/directory ignore rules.
//!
//! The format is a pared-down .gitignore: blank lines and `#` comments
//! are skipped, a bare name ignores any path component with that name,
//! and a pattern containing `*` or `?` is matched against filenames.
//! When a `.artignore` file exists it replaces the built-in defaults —
//! users own their ignore list — but `.art` itself stays ignored no
//! matter what. Rules are parsed once per repository handle.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Metadata directory, unconditionally ignored.
const METADATA_DIR: &str = ".art";

/// Component names ignored when no `.artignore` exists.
const DEFAULT_COMPONENTS: &[&str] = &[".git", "target", "node_modules", ".venv", "__pycache__"];

/// Ceilings on user rule lists, to keep the predicate cheap.
const MAX_RULES: usize = 1000;
const MAX_PATTERN_LEN: usize = 1024;

/// A parsed set of ignore rules.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    /// Path components ignored by exact name.
    components: BTreeSet<String>,
    /// Patterns with wildcards, matched against filenames.
    globs: Vec<String>,
}

impl IgnoreRules {
    /// Load from `.artignore` at the repo root, or fall back to defaults.
    pub fn load(repo_root: &Path) -> Self {
        match fs::read_to_string(repo_root.join(".artignore")) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::defaults(),
        }
    }

    /// The built-in rule set used when no `.artignore` exists.
    pub fn defaults() -> Self {
        IgnoreRules {
            components: std::iter::once(METADATA_DIR)
                .chain(DEFAULT_COMPONENTS.iter().copied())
                .map(String::from)
                .collect(),
            globs: Vec::new(),
        }
    }

    /// Parse `.artignore` content into rules.
    ///
    /// Overlong patterns are dropped and at most [`MAX_RULES`] lines are
    /// honored.
    pub fn parse(content: &str) -> Self {
        let mut rules = IgnoreRules {
            components: BTreeSet::from([METADATA_DIR.to_string()]),
            globs: Vec::new(),
        };

        let lines = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter(|line| line.len() <= MAX_PATTERN_LEN)
            .take(MAX_RULES);

        for line in lines {
            if line.contains(['*', '?']) {
                rules.globs.push(line.to_string());
            } else {
                rules
                    .components
                    .insert(line.trim_end_matches('/').to_string());
            }
        }
        rules
    }

    /// The ignore predicate: should this relative path be left untracked?
    ///
    /// A path is ignored when any of its components matches a name rule,
    /// or its filename matches one of the wildcard patterns.
    pub fn should_ignore(&self, rel_path: &str) -> bool {
        if rel_path
            .split('/')
            .any(|part| self.components.contains(part))
        {
            return true;
        }
        let filename = rel_path.rsplit('/').next().unwrap_or(rel_path);
        self.globs.iter().any(|glob| glob_match(glob, filename))
    }
}

/// Wildcard match: `*` spans any run of characters, `?` exactly one.
///
/// Simulates the pattern as a tiny NFA: `reach[j]` records whether the
/// first `j` pattern characters can consume the text read so far, and
/// the row is advanced one text character at a time. No backtracking,
/// cost bounded by `pattern len × text len`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();

    let mut reach = vec![false; pattern.len() + 1];
    reach[0] = true;
    for (j, &pc) in pattern.iter().enumerate() {
        // Only a leading run of stars can match the empty text.
        reach[j + 1] = reach[j] && pc == '*';
    }

    for tc in text.chars() {
        let mut next = vec![false; pattern.len() + 1];
        for (j, &pc) in pattern.iter().enumerate() {
            next[j + 1] = match pc {
                '*' => next[j] || reach[j] || reach[j + 1],
                '?' => reach[j],
                _ => reach[j] && pc == tc,
            };
        }
        reach = next;
    }

    *reach.last().unwrap()
}
