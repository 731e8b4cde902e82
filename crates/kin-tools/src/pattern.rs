//! Name/argument pattern matching shared by the Tool Manager's
//! enable/disable filtering and a tool's allowlist/denylist check. Both
//! accept a plain glob or, with a `re:` prefix, a regular expression.

use globset::{Glob, GlobMatcher};
use regex::Regex;

/// A compiled glob or regex pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// A glob, e.g. `"shell:git *"`.
    Glob(GlobMatcher),
    /// A `re:`-prefixed regular expression.
    Regex(Regex),
}

impl Pattern {
    /// Compile `spec` as a regex if it starts with `re:`, otherwise as a
    /// glob.
    ///
    /// # Errors
    ///
    /// Returns an error if the glob or regex fails to compile.
    pub fn parse(spec: &str) -> Result<Self, String> {
        if let Some(expr) = spec.strip_prefix("re:") {
            Regex::new(expr)
                .map(Pattern::Regex)
                .map_err(|e| format!("invalid regex {expr:?}: {e}"))
        } else {
            Glob::new(spec)
                .map(|g| Pattern::Glob(g.compile_matcher()))
                .map_err(|e| format!("invalid glob {spec:?}: {e}"))
        }
    }

    /// Whether `text` matches this pattern.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Pattern::Glob(g) => g.is_match(text),
            Pattern::Regex(r) => r.is_match(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_a_prefix_pattern() {
        let p = Pattern::parse("git *").unwrap();
        assert!(p.matches("git push origin"));
        assert!(!p.matches("curl evil.example"));
    }

    #[test]
    fn regex_prefix_compiles_as_a_regular_expression() {
        let p = Pattern::parse("re:^rm\\s+-rf").unwrap();
        assert!(p.matches("rm -rf /"));
        assert!(!p.matches("rm file.txt"));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(Pattern::parse("re:(unclosed").is_err());
    }
}
