//! Kin Code CLI — wires config, backend, tools, middleware, and the agent
//! loop into one binary.
//!
//! Two modes: interactive (a line-at-a-time prompt on the controlling
//! terminal) and programmatic (`-p`: one prompt in, events or final text
//! out, then exit). Exit code 0 on success and on a graceful interrupt at
//! the prompt; 1 for configuration, runtime, or limit-exceeded errors.

#![deny(unsafe_code)]

mod approval;
mod output;
mod profiles;
mod session;
mod setup;

use std::collections::HashMap;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use futures::StreamExt;
use kin_config::LoadedConfig;
use kin_core::{AgentProfile, BackendKind, ModelConfig, Prices, ProviderConfig};
use kin_llm::{AnthropicBackend, LlmBackend, LlmClient, OpenAiCompatBackend};
use kin_middleware::{
    AutoCompact, ContextWarning, Middleware, PlanAgentReminder, PriceLimit, TurnLimit,
};
use kin_runtime::{AgentLoop, AgentLoopConfig, MessageObserver, SubAgentExecutor, ToolRunnerConfig};
use kin_tools::{ApprovalCallback, ToolManager, ToolManagerConfig};
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;

use crate::output::{EventSink, OutputMode};
use crate::session::{SessionStore, TranscriptWriter};

const KIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Kin Code — an LLM coding assistant.
#[derive(Parser)]
#[command(name = "kin", version, about, long_about = None)]
struct Cli {
    /// First message to send once the interactive session starts.
    initial_prompt: Option<String>,

    /// Programmatic mode: run one prompt (the flag's value, else stdin)
    /// and exit after the final assistant reply.
    #[arg(short = 'p', long, num_args = 0..=1, default_missing_value = "", value_name = "TEXT")]
    prompt: Option<String>,

    /// Execute every tool call without asking for approval.
    #[arg(long)]
    auto_approve: bool,

    /// Start in the read-only "plan" profile.
    #[arg(long, conflicts_with = "agent")]
    plan: bool,

    /// Start in the named agent profile.
    #[arg(long, value_name = "NAME")]
    agent: Option<String>,

    /// Stop the loop after this many turns.
    #[arg(long, value_name = "N")]
    max_turns: Option<u64>,

    /// Stop the loop once the session has cost more than this many dollars.
    #[arg(long, value_name = "DOLLARS")]
    max_price: Option<f64>,

    /// Expose only these tools (repeatable; glob or `re:` regex patterns).
    #[arg(long = "enabled-tools", value_name = "TOOL")]
    enabled_tools: Vec<String>,

    /// Output format in programmatic mode.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputMode,

    /// Continue the most recent session.
    #[arg(short = 'c', long = "continue", conflicts_with = "resume")]
    continue_last: bool,

    /// Resume the session with this id.
    #[arg(long, value_name = "SESSION_ID")]
    resume: Option<String>,

    /// Write starter config.toml and .env files under the config root,
    /// then exit.
    #[arg(long)]
    setup: bool,

    /// Append a provider template to config.toml, then exit.
    #[arg(long)]
    add_provider: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            };
            let _ = e.print();
            return code;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if cli.setup || cli.add_provider {
        let paths = kin_config::Paths::resolve(None)?;
        if cli.setup {
            setup::run_setup(&paths)?;
        } else {
            setup::run_add_provider(&paths)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let loaded = kin_config::load(None).context("loading configuration")?;
    let (mut agent, transcript) = build_agent(&cli, &loaded)?;

    if cli.prompt.is_some() {
        run_programmatic(&cli, &mut agent, &transcript).await
    } else {
        run_interactive(&cli, &mut agent, &transcript).await
    }
}

fn resolve_model(cli_config: &LoadedConfig) -> Result<(ModelConfig, ProviderConfig)> {
    let file = &cli_config.file;
    let model_name = file.default_model.clone().ok_or_else(|| {
        anyhow!(
            "no default_model configured; run `kin --setup` and edit {}",
            cli_config.paths.config_file().display()
        )
    })?;
    let mut model = file
        .models
        .get(&model_name)
        .cloned()
        .ok_or_else(|| anyhow!("model {model_name} is not defined in config.toml"))?;
    let provider = file.providers.get(&model.provider_ref).cloned().ok_or_else(|| {
        anyhow!(
            "provider {} (used by model {model_name}) is not defined in config.toml",
            model.provider_ref
        )
    })?;

    // A fresh pricing-cache entry wins over the static config prices.
    let now = chrono::Utc::now().timestamp();
    if let Some(cached) = cli_config.pricing_cache.get_fresh(&provider.name, &model.name, now) {
        model.prices = Prices {
            input_per_million: cached.input_price,
            output_per_million: cached.output_price,
        };
    }

    Ok((model, provider))
}

fn build_backend(provider: &ProviderConfig, dotenv_hint: &std::path::Path) -> Result<Arc<dyn LlmBackend>> {
    let api_key = if provider.api_key_env_var.is_empty() {
        None
    } else {
        Some(std::env::var(&provider.api_key_env_var).map_err(|_| {
            anyhow!(
                "environment variable {} (API key for provider {}) is not set; add it to {}",
                provider.api_key_env_var,
                provider.name,
                dotenv_hint.display()
            )
        })?)
    };

    Ok(match provider.backend_kind {
        BackendKind::OpenAiCompat => Arc::new(OpenAiCompatBackend::new(provider.api_base.clone(), api_key)),
        BackendKind::Anthropic => Arc::new(AnthropicBackend::new(provider.api_base.clone(), api_key)),
    })
}

fn resolve_profile(
    cli: &Cli,
    loaded: &LoadedConfig,
    all_profiles: &HashMap<String, AgentProfile>,
) -> Result<AgentProfile> {
    let name = if cli.plan {
        "plan".to_string()
    } else {
        cli.agent
            .clone()
            .or_else(|| loaded.file.default_agent.clone())
            .unwrap_or_else(|| "default".to_string())
    };
    let mut profile = all_profiles
        .get(&name)
        .cloned()
        .ok_or_else(|| anyhow!("unknown agent profile: {name}"))?;
    if profile.subagent_only {
        bail!("profile {name} is subagent-only and cannot run a top-level session");
    }
    // Config-level permissions fill in for tools the profile doesn't
    // override itself.
    for (tool, permission) in &loaded.file.tool_permissions {
        profile.tool_permissions.entry(tool.clone()).or_insert(*permission);
    }
    Ok(profile)
}

fn build_agent(cli: &Cli, loaded: &LoadedConfig) -> Result<(AgentLoop, Arc<TranscriptWriter>)> {
    let (model, provider) = resolve_model(loaded)?;
    let backend = build_backend(&provider, &loaded.paths.dotenv_file())?;

    let workspace_root = std::env::current_dir().context("resolving current directory")?;
    let project_trusted = loaded.trusted_folders.is_trusted(&workspace_root);
    let tool_config = || ToolManagerConfig {
        user_global_dir: Some(loaded.paths.home().join("tools")),
        trusted_project_dir: project_trusted.then(|| workspace_root.join(".kin-code").join("tools")),
        enabled_tools: cli.enabled_tools.clone(),
        disabled_tools: Vec::new(),
    };
    let subagent_tool_config = tool_config();
    let main_tool_config = tool_config();

    let all_profiles = profiles::builtin_profiles();
    let profile = resolve_profile(cli, loaded, &all_profiles)?;

    let mut middlewares: Vec<Box<dyn Middleware>> = Vec::new();
    if let Some(n) = cli.max_turns.or(loaded.file.max_turns) {
        middlewares.push(Box::new(TurnLimit::new(n)));
    }
    if let Some(dollars) = cli.max_price.or(loaded.file.max_price_usd) {
        middlewares.push(Box::new(PriceLimit::new(dollars)));
    }
    if let Some(window) = model.context_window {
        middlewares.push(Box::new(AutoCompact::new(0.9, window, None)));
        middlewares.push(Box::new(ContextWarning::new(0.5, window)));
    }
    middlewares.push(Box::new(PlanAgentReminder));

    let approval: Arc<dyn ApprovalCallback> = Arc::new(approval::InteractiveApproval);
    let runner_config = ToolRunnerConfig {
        auto_approve: cli.auto_approve,
        ..Default::default()
    };

    let spawner = Arc::new(SubAgentExecutor::new(
        all_profiles,
        Arc::clone(&backend),
        model.clone(),
        subagent_tool_config,
        workspace_root.clone(),
        runner_config.clone(),
        Arc::clone(&approval),
        true,
    ));

    let store = SessionStore::new(&loaded.paths)?;
    let resumed = if cli.continue_last {
        Some(store.most_recent()?.ok_or_else(|| anyhow!("no sessions to continue"))?)
    } else if let Some(id) = &cli.resume {
        Some(store.load(id)?)
    } else {
        None
    };
    let session_id = resumed
        .as_ref()
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), |r| r.session_id.clone());
    let initial_messages = resumed.map(|r| r.messages).filter(|m| !m.is_empty());

    let transcript = Arc::new(TranscriptWriter::new(&store, &session_id));

    let agent = AgentLoop::new(AgentLoopConfig {
        agent_profile: profile,
        llm_client: LlmClient::new(Arc::clone(&backend), model, session_id),
        tool_manager: ToolManager::new(&main_tool_config),
        workspace_root,
        runner_config,
        approval_callback: Some(approval),
        user_input_callback: None,
        agent_manager: Some(spawner),
        message_observer: Some(Arc::clone(&transcript) as Arc<dyn MessageObserver>),
        enable_streaming: true,
        middlewares,
        initial_messages,
    });

    Ok((agent, transcript))
}

fn read_stdin_all() -> Result<String> {
    let text = std::io::read_to_string(std::io::stdin()).context("reading stdin")?;
    Ok(text.trim().to_string())
}

fn spawn_cancel_on_ctrl_c(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

async fn run_programmatic(
    cli: &Cli,
    agent: &mut AgentLoop,
    transcript: &TranscriptWriter,
) -> Result<ExitCode> {
    let flag_text = cli.prompt.clone().unwrap_or_default();
    let prompt = if !flag_text.is_empty() {
        flag_text
    } else if let Some(positional) = &cli.initial_prompt {
        positional.clone()
    } else {
        read_stdin_all()?
    };
    if prompt.is_empty() {
        bail!("no prompt given: pass text to -p, as the positional argument, or on stdin");
    }

    let cancel = CancellationToken::new();
    let watcher = spawn_cancel_on_ctrl_c(cancel.clone());
    let mut sink = EventSink::new(cli.output);
    {
        let stream = agent.act(&prompt, cancel);
        tokio::pin!(stream);
        while let Some(event) = stream.next().await {
            sink.observe(&event);
        }
    }
    watcher.abort();
    transcript.snapshot_stats(agent.stats());

    let limited = sink.stopped_by_middleware();
    sink.finish();
    Ok(if limited { ExitCode::from(1) } else { ExitCode::SUCCESS })
}

async fn run_interactive(
    cli: &Cli,
    agent: &mut AgentLoop,
    transcript: &TranscriptWriter,
) -> Result<ExitCode> {
    // A piped stdin is drained entirely up front and becomes (part of) the
    // first prompt; rustyline then reopens the controlling terminal for
    // everything after it.
    let piped = if std::io::stdin().is_terminal() {
        None
    } else {
        let text = read_stdin_all()?;
        (!text.is_empty()).then_some(text)
    };
    let mut pending = match (cli.initial_prompt.clone(), piped) {
        (Some(arg), Some(piped)) => Some(format!("{arg}\n\n{piped}")),
        (Some(arg), None) => Some(arg),
        (None, Some(piped)) => Some(piped),
        (None, None) => None,
    };

    let config = rustyline::Config::builder()
        .behavior(rustyline::config::Behavior::PreferTerm)
        .build();
    let mut editor = rustyline::DefaultEditor::with_config(config)?;

    println!(
        "kin {KIN_VERSION} | profile {} | model {} | session {}",
        agent.agent_profile().name,
        agent.model_alias(),
        agent.session_id(),
    );

    loop {
        let line = if let Some(first) = pending.take() {
            first
        } else {
            match editor.readline("kin> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(&line);
                    line
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    println!("bye");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            println!("bye");
            break;
        }

        let cancel = CancellationToken::new();
        let watcher = spawn_cancel_on_ctrl_c(cancel.clone());
        {
            let stream = agent.act(line, cancel);
            tokio::pin!(stream);
            while let Some(event) = stream.next().await {
                output::render_interactive(&event);
            }
        }
        watcher.abort();
        transcript.snapshot_stats(agent.stats());
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_flag_accepts_a_missing_value() {
        let cli = Cli::try_parse_from(["kin", "-p"]).unwrap();
        assert_eq!(cli.prompt.as_deref(), Some(""));

        let cli = Cli::try_parse_from(["kin", "-p", "do the thing"]).unwrap();
        assert_eq!(cli.prompt.as_deref(), Some("do the thing"));
    }

    #[test]
    fn continue_and_resume_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["kin", "-c", "--resume", "abc"]).is_err());
    }

    #[test]
    fn plan_conflicts_with_an_explicit_agent() {
        assert!(Cli::try_parse_from(["kin", "--plan", "--agent", "explore"]).is_err());
        assert!(Cli::try_parse_from(["kin", "--plan"]).unwrap().plan);
    }

    #[test]
    fn enabled_tools_repeats() {
        let cli = Cli::try_parse_from(["kin", "--enabled-tools", "bash", "--enabled-tools", "read_*"]).unwrap();
        assert_eq!(cli.enabled_tools, vec!["bash", "read_*"]);
    }
}
