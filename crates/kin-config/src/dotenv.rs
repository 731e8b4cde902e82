//! `<KIN_HOME>/.env` loading: `key=value` API secrets injected into the
//! process environment at startup.

// `std::env::set_var` is an unsafe fn in edition 2024; this module is the
// one sanctioned caller (once, at startup, before other threads exist).
#![allow(unsafe_code)]

use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Parse `path` as `key=value` lines (blank lines and `#`-comments
/// ignored) and set each as a process environment variable. A no-op if
/// the file does not exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file exists but cannot be read.
///
/// # Safety
///
/// Mutates the process environment; callers must do this once at
/// startup before spawning other threads that read env vars.
pub fn load(path: &Path) -> ConfigResult<usize> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let mut count = 0;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"');
        if key.is_empty() {
            continue;
        }
        // SAFETY: called once at startup before other threads are spawned.
        unsafe {
            std::env::set_var(key, value);
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_noop() {
        let count = load(Path::new("/nonexistent/.env")).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn parses_key_value_pairs_and_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# comment\nANTHROPIC_API_KEY=\"sk-test-123\"\n\nFOO=bar\n").unwrap();
        let count = load(&path).unwrap();
        assert_eq!(count, 2);
        assert_eq!(std::env::var("ANTHROPIC_API_KEY").as_deref(), Ok("sk-test-123"));
        assert_eq!(std::env::var("FOO").as_deref(), Ok("bar"));
        // SAFETY: test-only cleanup of vars this test set.
        unsafe {
            std::env::remove_var("ANTHROPIC_API_KEY");
            std::env::remove_var("FOO");
        }
    }
}
