//! `<KIN_HOME>/config.toml` loading and `KIN_<FIELD>` env overrides.
//!
//! A single file with scalar env fallbacks; no system/user/workspace
//! layering or deep-merge engine.

use std::collections::HashMap;
use std::path::Path;

use kin_core::{ModelConfig, ProviderConfig, ToolPermission};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::paths::Paths;

const ENV_PREFIX: &str = "KIN_";
/// Reserved; resolved separately by [`Paths::resolve`], never treated as a
/// scalar field override.
const RESERVED_ENV_VAR: &str = "KIN_HOME";

/// The deserialized contents of `config.toml`, plus any `KIN_<FIELD>`
/// scalar overrides applied on top.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Name of the model to use when none is given on the command line.
    pub default_model: Option<String>,
    /// Name of the agent profile to start in.
    pub default_agent: Option<String>,
    /// Turn cap applied by the `TurnLimit` middleware, if configured.
    pub max_turns: Option<u64>,
    /// Dollar cap applied by the `PriceLimit` middleware, if configured.
    pub max_price_usd: Option<f64>,
    /// Named model configurations, keyed by model name.
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,
    /// Named provider configurations, keyed by provider name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Default permission per tool name, for tools not covered by an
    /// allowlist/denylist pattern.
    #[serde(default)]
    pub tool_permissions: HashMap<String, ToolPermission>,
}

/// Load `<home>/config.toml`, applying `KIN_<FIELD>` env overrides for any
/// top-level scalar field left unset by the file. Returns
/// [`FileConfig::default`] if no file exists.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file exists but cannot be read or
/// parsed.
pub fn load(paths: &Paths) -> ConfigResult<FileConfig> {
    let path = paths.config_file();
    let mut value = read_toml_value(&path)?.unwrap_or(toml::Value::Table(toml::map::Map::new()));
    apply_env_overrides(&mut value);

    value
        .try_into()
        .map_err(|source| ConfigError::ParseError {
            path: path.display().to_string(),
            source,
        })
}

fn read_toml_value(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source,
            });
        }
    };
    let value: toml::Value = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(value))
}

/// Overlay top-level scalar fields from `KIN_<FIELD>` environment
/// variables (case-insensitive field name) onto `value`, without
/// overwriting a field the file already set.
fn apply_env_overrides(value: &mut toml::Value) {
    let table = value
        .as_table_mut()
        .expect("config root is always a table");

    for (key, raw) in std::env::vars() {
        if key == RESERVED_ENV_VAR || !key.starts_with(ENV_PREFIX) {
            continue;
        }
        let field = key[ENV_PREFIX.len()..].to_lowercase();
        if field.is_empty() || table.contains_key(&field) {
            continue;
        }
        table.insert(field, env_value_to_toml(&raw));
    }
}

fn env_value_to_toml(raw: &str) -> toml::Value {
    if let Ok(i) = raw.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return toml::Value::Float(f);
    }
    if let Ok(b) = raw.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    toml::Value::String(raw.to_string())
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_file_yields_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::resolve(Some(dir.path().to_path_buf())).unwrap();
        let config = load(&paths).unwrap();
        assert!(config.default_model.is_none());
    }

    #[test]
    fn file_values_parse() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "default_model = \"gpt\"\nmax_turns = 10\n",
        )
        .unwrap();
        let paths = Paths::resolve(Some(dir.path().to_path_buf())).unwrap();
        let config = load(&paths).unwrap();
        assert_eq!(config.default_model.as_deref(), Some("gpt"));
        assert_eq!(config.max_turns, Some(10));
    }

    #[test]
    fn env_override_fills_unset_field_only() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "default_model = \"gpt\"\n").unwrap();
        let paths = Paths::resolve(Some(dir.path().to_path_buf())).unwrap();

        // SAFETY: test runs under a mutex guarding this process's env.
        unsafe {
            std::env::set_var("KIN_DEFAULT_MODEL", "claude");
            std::env::set_var("KIN_MAX_TURNS", "25");
        }
        let config = load(&paths).unwrap();
        unsafe {
            std::env::remove_var("KIN_DEFAULT_MODEL");
            std::env::remove_var("KIN_MAX_TURNS");
        }

        assert_eq!(config.default_model.as_deref(), Some("gpt"));
        assert_eq!(config.max_turns, Some(25));
    }
}
