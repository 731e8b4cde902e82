//! `<KIN_HOME>/trusted_folders.toml`: the on-disk registry consulted to
//! gate whether a project's local config may be honored.
//!
//! A read of this file is pure given a path — it carries no other
//! process-wide state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::paths::Paths;

/// `{trusted: [paths], untrusted: [paths]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustedFolders {
    /// Folders the user has explicitly marked trusted.
    #[serde(default)]
    pub trusted: Vec<PathBuf>,
    /// Folders the user has explicitly marked untrusted.
    #[serde(default)]
    pub untrusted: Vec<PathBuf>,
}

impl TrustedFolders {
    /// Load from `paths.trusted_folders_file()`, or an empty registry if
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let path = paths.trusted_folders_file();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::ReadError {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Persist to `paths.trusted_folders_file()`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if serialization or the write fails.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        let path = paths.trusted_folders_file();
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError {
            field: "trusted_folders".to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, text).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Whether `folder` (or an ancestor of it) is listed as trusted and
    /// not also listed as untrusted. Untrusted takes precedence over a
    /// trusted ancestor, matching the principle that narrower scope wins.
    #[must_use]
    pub fn is_trusted(&self, folder: &Path) -> bool {
        let untrusted = self.untrusted.iter().any(|u| folder.starts_with(u));
        if untrusted {
            return false;
        }
        self.trusted.iter().any(|t| folder.starts_with(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::resolve(Some(dir.path().to_path_buf())).unwrap();
        let folders = TrustedFolders::load(&paths).unwrap();
        assert!(folders.trusted.is_empty());
    }

    #[test]
    fn ancestor_of_a_trusted_path_is_trusted() {
        let folders = TrustedFolders {
            trusted: vec![PathBuf::from("/home/user/project")],
            untrusted: vec![],
        };
        assert!(folders.is_trusted(Path::new("/home/user/project/sub")));
        assert!(!folders.is_trusted(Path::new("/home/user/other")));
    }

    #[test]
    fn untrusted_overrides_a_trusted_ancestor() {
        let folders = TrustedFolders {
            trusted: vec![PathBuf::from("/home/user")],
            untrusted: vec![PathBuf::from("/home/user/scratch")],
        };
        assert!(!folders.is_trusted(Path::new("/home/user/scratch/tmp")));
        assert!(folders.is_trusted(Path::new("/home/user/project")));
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::resolve(Some(dir.path().to_path_buf())).unwrap();
        let folders = TrustedFolders {
            trusted: vec![PathBuf::from("/a")],
            untrusted: vec![PathBuf::from("/b")],
        };
        folders.save(&paths).unwrap();
        let loaded = TrustedFolders::load(&paths).unwrap();
        assert_eq!(loaded.trusted, folders.trusted);
        assert_eq!(loaded.untrusted, folders.untrusted);
    }
}
