mod editor;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use editor::{FileEditor, LineRange};
use promptpad_core::types::CommandType;
use promptpad_engine::engine::PromptEngine;
use promptpad_engine::manager::SettingsManager;
use promptpad_runtime::api_key::resolve_api_key;
use promptpad_runtime::config_store::FileSettingsRepository;
use promptpad_runtime::defaults::{DEFAULT_BASE_URL, default_settings_path};
use promptpad_runtime::llm::OpenAiCompatibleLlmClient;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(
    name = "promptpad",
    version,
    about = "Rewrite or generate markdown notes with a hosted LLM"
)]
struct Cli {
    /// Settings file.
    #[arg(long, env = "PROMPTPAD_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = "PROMPTPAD_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rewrite selection
    RewriteSelection {
        #[arg(long)]
        file: PathBuf,
        /// Lines to select, e.g. `3:5`.
        #[arg(long)]
        lines: LineRange,
        #[arg(long, short)]
        request: String,
    },
    /// Rewrite document
    RewriteDocument {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, short)]
        request: String,
    },
    /// Generate content at cursor
    Generate {
        #[arg(long)]
        file: PathBuf,
        /// Insert after this line; defaults to the end of the file.
        #[arg(long)]
        line: Option<usize>,
        #[arg(long, short)]
        request: String,
    },
    /// Show or change settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// List the supported models.
    Models,
    /// List recent requests, newest first.
    Recents,
    /// Show, edit or reset prompt templates.
    #[command(subcommand)]
    Templates(TemplateCommand),
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    Show,
    SetModel {
        model: String,
    },
    SetStreaming {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    SetRecentsLimit {
        limit: usize,
    },
    SetApiKey {
        key: String,
    },
    ClearApiKey,
}

#[derive(Debug, Subcommand)]
enum TemplateCommand {
    Show {
        command: CommandType,
    },
    Set {
        command: CommandType,
        /// File holding the new template text.
        #[arg(long)]
        file: PathBuf,
    },
    Reset {
        command: CommandType,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(default_settings_path);
    log::debug!("settings file: {}", config_path.display());
    let mut settings = SettingsManager::load(FileSettingsRepository::at_path(config_path));

    match cli.command {
        Command::RewriteSelection {
            file,
            lines,
            request,
        } => {
            let editor = FileEditor::open(file)?.with_selection(lines)?;
            run_editor_command(settings, &cli.base_url, editor, CommandType::Selection, &request)
                .await
        }
        Command::RewriteDocument { file, request } => {
            let editor = FileEditor::open(file)?;
            run_editor_command(settings, &cli.base_url, editor, CommandType::Document, &request)
                .await
        }
        Command::Generate {
            file,
            line,
            request,
        } => {
            let editor = FileEditor::open(file)?.with_cursor_after_line(line)?;
            run_editor_command(settings, &cli.base_url, editor, CommandType::Cursor, &request)
                .await
        }
        Command::Settings(cmd) => run_settings_command(&mut settings, cmd),
        Command::Models => {
            let current = settings.settings().model;
            for (id, name) in settings.list_models() {
                let marker = if id == current { "*" } else { " " };
                println!("{marker} {id:<14} {name}");
            }
            Ok(())
        }
        Command::Recents => {
            for prompt in settings.settings().recent_prompts_newest_first() {
                println!("{prompt}");
            }
            Ok(())
        }
        Command::Templates(cmd) => run_template_command(&mut settings, cmd),
    }
}

async fn run_editor_command(
    settings: SettingsManager<FileSettingsRepository>,
    base_url: &str,
    editor: FileEditor,
    command: CommandType,
    request: &str,
) -> anyhow::Result<()> {
    let lookup = resolve_api_key(settings.settings());
    log::debug!("api key source: {}", lookup.source.as_str());

    let editor = Arc::new(editor);
    let mut engine = PromptEngine::new(
        settings,
        Arc::new(OpenAiCompatibleLlmClient::new(base_url)),
        editor.clone(),
    )
    .with_fallback_api_key(lookup.key);

    let outcome = engine
        .run_command_with_hook(command, request, |stage| async move {
            log::info!("stage: {stage}");
        })
        .await?;

    if let Some(error) = outcome.error {
        // Keep the reply recoverable when the file could not be written.
        if let Some(reply) = &outcome.reply {
            println!("{reply}");
        }
        anyhow::bail!("could not write {}: {error}", editor.path().display());
    }

    eprintln!(
        "{}: wrote {} chunk(s) to {}",
        command.command_name(),
        outcome.chunks,
        editor.path().display()
    );
    engine.into_settings().teardown();
    Ok(())
}

fn run_settings_command(
    settings: &mut SettingsManager<FileSettingsRepository>,
    cmd: SettingsCommand,
) -> anyhow::Result<()> {
    match cmd {
        SettingsCommand::Show => {
            let mut value =
                serde_json::to_value(settings.settings()).context("encode settings")?;
            if let Some(key) = value.get_mut("apiKey").filter(|k| !k.is_null()) {
                *key = "[REDACTED]".into();
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        SettingsCommand::SetModel { model } => settings.set_model_str(&model),
        SettingsCommand::SetStreaming { enabled } => settings.set_streaming(enabled),
        SettingsCommand::SetRecentsLimit { limit } => settings.set_recents_limit(limit),
        SettingsCommand::SetApiKey { key } => settings.set_api_key(Some(key)),
        SettingsCommand::ClearApiKey => settings.set_api_key(None),
    }
}

fn run_template_command(
    settings: &mut SettingsManager<FileSettingsRepository>,
    cmd: TemplateCommand,
) -> anyhow::Result<()> {
    match cmd {
        TemplateCommand::Show { command } => {
            println!("{}", settings.template(command));
            Ok(())
        }
        TemplateCommand::Set { command, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("read template: {}", file.display()))?;
            settings.set_template(command, text)
        }
        TemplateCommand::Reset { command } => {
            settings.reset_template(command)?;
            eprintln!("Template successfully reset!");
            Ok(())
        }
    }
}
