//! `--setup` and `--add-provider`: scaffold the on-disk config so a first
//! run has something to edit. Deliberately non-interactive; the files are
//! commented templates, not a wizard.

use anyhow::{Context, Result};
use kin_config::Paths;

const CONFIG_TEMPLATE: &str = r#"# Kin Code configuration
#
# This file was created by `kin --setup`. Point default_model at one of the
# [models.*] entries below and put the provider's API key in the .env file
# next to this one.

default_model = "gpt-4o"
# default_agent = "default"
# max_turns = 50
# max_price_usd = 5.0

[models."gpt-4o"]
name = "gpt-4o"
provider_ref = "openai"
alias = "gpt"
temperature = 0.7
tool_call_format = "AUTO"
context_window = 128000

[models."gpt-4o".reasoning]
enabled = false

[models."gpt-4o".prices]
input_per_million = 2.5
output_per_million = 10.0

[providers.openai]
name = "openai"
api_base = "https://api.openai.com/v1/chat/completions"
api_key_env_var = "OPENAI_API_KEY"
backend_kind = "open_ai_compat"
reasoning_field_name = "reasoning_content"

# [tool_permissions]
# bash = "ask"
# read_file = "always"
"#;

const DOTENV_TEMPLATE: &str = "# API secrets, loaded into the environment at startup.\n# OPENAI_API_KEY=sk-...\n";

const PROVIDER_TEMPLATE: &str = r#"
# Added by `kin --add-provider`; rename and fill in, then define a model
# with provider_ref pointing at it.
# [providers.myprovider]
# name = "myprovider"
# api_base = "http://localhost:11434/v1/chat/completions"
# api_key_env_var = ""
# backend_kind = "open_ai_compat"
# reasoning_field_name = "reasoning_content"
"#;

/// Create the config root with starter `config.toml` and `.env` files.
pub fn run_setup(paths: &Paths) -> Result<()> {
    std::fs::create_dir_all(paths.home())
        .with_context(|| format!("creating {}", paths.home().display()))?;

    let config_path = paths.config_file();
    if config_path.exists() {
        println!("config already exists at {}", config_path.display());
    } else {
        std::fs::write(&config_path, CONFIG_TEMPLATE)
            .with_context(|| format!("writing {}", config_path.display()))?;
        println!("wrote {}", config_path.display());
    }

    let dotenv_path = paths.dotenv_file();
    if !dotenv_path.exists() {
        std::fs::write(&dotenv_path, DOTENV_TEMPLATE)
            .with_context(|| format!("writing {}", dotenv_path.display()))?;
        println!("wrote {}", dotenv_path.display());
    }

    println!("edit the config, add your API key, then run `kin`");
    Ok(())
}

/// Append a commented provider template to `config.toml`.
pub fn run_add_provider(paths: &Paths) -> Result<()> {
    let config_path = paths.config_file();
    if !config_path.exists() {
        run_setup(paths)?;
    }
    let mut content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    content.push_str(PROVIDER_TEMPLATE);
    std::fs::write(&config_path, content)
        .with_context(|| format!("writing {}", config_path.display()))?;
    println!("appended a provider template to {}; uncomment and edit it", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kin_config::FileConfig;

    #[test]
    fn setup_template_parses_as_a_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::resolve(Some(dir.path().to_path_buf())).unwrap();
        run_setup(&paths).unwrap();

        let config = FileConfig::load(&paths).unwrap();
        assert_eq!(config.default_model.as_deref(), Some("gpt-4o"));
        let model = &config.models["gpt-4o"];
        assert_eq!(model.provider_ref, "openai");
        assert!(config.providers.contains_key("openai"));
    }

    #[test]
    fn setup_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::resolve(Some(dir.path().to_path_buf())).unwrap();
        run_setup(&paths).unwrap();
        std::fs::write(paths.config_file(), "default_model = \"mine\"\n").unwrap();
        run_setup(&paths).unwrap();

        let config = FileConfig::load(&paths).unwrap();
        assert_eq!(config.default_model.as_deref(), Some("mine"));
    }
}
