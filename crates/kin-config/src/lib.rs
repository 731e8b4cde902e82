#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Config-root discovery, on-disk config, trusted folders, and pricing
//! cache.
//!
//! Deliberately thin: one config file plus scalar env overrides, no
//! system/user/workspace deep-merge engine. The agent core consumes the
//! resolved `ModelConfig`/`ProviderConfig` values and never reads the
//! filesystem or environment itself.

mod dotenv;
mod error;
mod file_config;
mod paths;
mod pricing_cache;
mod trusted_folders;

pub use error::{ConfigError, ConfigResult};
pub use file_config::FileConfig;
pub use paths::Paths;
pub use pricing_cache::{CachedPrice, PricingCache};
pub use trusted_folders::TrustedFolders;

/// Unlock the config root and load every on-disk artifact it touches:
/// `.env` secrets into the process environment, `config.toml`, the
/// trusted-folders registry, and the pricing cache.
///
/// This is the one-shot "unlock" step for process-wide state: call it
/// once at startup, then thread the returned [`Paths`] and config
/// through explicitly.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any existing file fails to read or
/// parse.
pub fn load(explicit_home: Option<std::path::PathBuf>) -> ConfigResult<LoadedConfig> {
    let paths = Paths::resolve(explicit_home)?;
    dotenv::load(&paths.dotenv_file())?;
    let file = FileConfig::load(&paths)?;
    let trusted_folders = TrustedFolders::load(&paths)?;
    let pricing_cache = PricingCache::load(&paths)?;

    Ok(LoadedConfig {
        paths,
        file,
        trusted_folders,
        pricing_cache,
    })
}

impl FileConfig {
    /// Load `<paths>/config.toml`. See [`file_config::load`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        file_config::load(paths)
    }
}

/// Everything `load` assembled in one call.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config-root paths.
    pub paths: Paths,
    /// Parsed `config.toml` (plus env overrides).
    pub file: FileConfig,
    /// Parsed trusted-folders registry.
    pub trusted_folders: TrustedFolders,
    /// Parsed pricing cache.
    pub pricing_cache: PricingCache,
}
