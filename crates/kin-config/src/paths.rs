//! Process-wide config-root resolution, gated behind a one-shot "unlock"
//! step rather than a singleton. A single root directory, no layered
//! system/user/workspace search.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

const DEFAULT_DIR_NAME: &str = ".kin-code";
const HOME_ENV_VAR: &str = "KIN_HOME";

/// The resolved location of every on-disk artifact Kin Code touches.
///
/// Constructed once at startup (the "unlock" step) and threaded through
/// explicitly; nothing in this crate or its callers holds a singleton or
/// reaches for `std::env` again after this point.
#[derive(Debug, Clone)]
pub struct Paths {
    home: PathBuf,
}

impl Paths {
    /// Resolve the config root: `explicit_home`, else `KIN_HOME`, else
    /// `~/.kin-code`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if no override is given and the
    /// OS home directory cannot be determined.
    pub fn resolve(explicit_home: Option<PathBuf>) -> ConfigResult<Self> {
        if let Some(home) = explicit_home {
            return Ok(Self { home });
        }
        if let Ok(env_home) = std::env::var(HOME_ENV_VAR) {
            return Ok(Self {
                home: PathBuf::from(env_home),
            });
        }
        let base = directories::BaseDirs::new().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self {
            home: base.home_dir().join(DEFAULT_DIR_NAME),
        })
    }

    /// The config root itself.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// `<KIN_HOME>/config.toml`.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// `<KIN_HOME>/.env`.
    #[must_use]
    pub fn dotenv_file(&self) -> PathBuf {
        self.home.join(".env")
    }

    /// `<KIN_HOME>/logs/session/`.
    #[must_use]
    pub fn session_logs_dir(&self) -> PathBuf {
        self.home.join("logs").join("session")
    }

    /// `<KIN_HOME>/trusted_folders.toml`.
    #[must_use]
    pub fn trusted_folders_file(&self) -> PathBuf {
        self.home.join("trusted_folders.toml")
    }

    /// `<KIN_HOME>/pricing_cache.json`.
    #[must_use]
    pub fn pricing_cache_file(&self) -> PathBuf {
        self.home.join("pricing_cache.json")
    }
}
