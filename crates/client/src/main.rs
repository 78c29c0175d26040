use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use futures::FutureExt;
use futures::StreamExt;
use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use snafu::{ResultExt, Snafu, ensure};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use supportdesk::chat::{
    ChatAction, ChatController, ChatView, ConnectionStatus, HtmlTranscript, InputCommand,
    InputComposer,
};
use supportdesk::settings::{SettingsError, SettingsStore};
use supportdesk::terminal::{HELP_TEXT, TerminalView};
use supportdesk_api::{ApiError, HttpSupportClient, SessionId, SupportApi};

#[derive(Debug, Parser)]
#[command(name = "supportdesk", version, about = "Chat with the support bot from a terminal")]
struct Cli {
    /// Settings file to read instead of the per-user default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Support API base URL, overriding settings and environment.
    #[arg(long, global = true)]
    api_base_url: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start an interactive conversation (default).
    Chat {
        /// Also write the conversation as an HTML page when the chat ends.
        #[arg(long)]
        html_transcript: Option<PathBuf>,
    },
    /// Check that the support API is reachable.
    Health,
    /// Print the server-side transcript of a session.
    History { session_id: String },
    /// Delete a session and its stored transcript on the server.
    Close { session_id: String },
    /// Inspect or change persisted settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective settings.
    Show,
    /// Print the settings file location.
    Path,
    /// Persist a new API base URL.
    SetUrl { url: String },
}

#[derive(Debug, Snafu)]
enum CliError {
    #[snafu(display("support api call failed on `{stage}`"))]
    Api {
        stage: &'static str,
        source: ApiError,
    },
    #[snafu(display("support api reported status '{status}'"))]
    Unhealthy { status: String },
    #[snafu(display("failed to update settings"))]
    Settings { source: SettingsError },
    #[snafu(display("failed to render settings on `{stage}`"))]
    RenderSettings {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to read terminal input"))]
    ReadInput { source: std::io::Error },
    #[snafu(display("failed to write transcript to {path:?}"))]
    WriteTranscript {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn init_tracing() {
    // Logs go to stderr so they never interleave with the conversation on stdout.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[snafu::report]
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    init_tracing();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(SettingsStore::default_config_path);

    let command = cli.command.unwrap_or(Command::Chat {
        html_transcript: None,
    });

    match command {
        Command::Config { action } => run_config(action, config_path),
        Command::Chat { html_transcript } => {
            let (store, api) = connect(config_path, cli.api_base_url.as_deref())?;
            let options = store.settings().session_options();
            match html_transcript {
                Some(path) => {
                    let controller = ChatController::new(
                        api,
                        (TerminalView::stdout(), HtmlTranscript::new()),
                        options,
                    );
                    run_chat(&controller).await?;
                    let (_, transcript) = controller.into_view();
                    std::fs::write(&path, transcript.to_document())
                        .context(WriteTranscriptSnafu { path: path.clone() })?;
                    println!("{} {}", "transcript written to".dimmed(), path.display());
                }
                None => {
                    let controller = ChatController::new(api, TerminalView::stdout(), options);
                    run_chat(&controller).await?;
                }
            }
            Ok(())
        }
        Command::Health => {
            let (_, api) = connect(config_path, cli.api_base_url.as_deref())?;
            run_health(&api).await
        }
        Command::History { session_id } => {
            let (_, api) = connect(config_path, cli.api_base_url.as_deref())?;
            run_history(&api, SessionId::new(session_id)).await
        }
        Command::Close { session_id } => {
            let (_, api) = connect(config_path, cli.api_base_url.as_deref())?;
            let session_id = SessionId::new(session_id);
            api.close_session(&session_id)
                .await
                .context(ApiSnafu {
                    stage: "close-session",
                })?;
            println!("{} {session_id}", "closed".green());
            Ok(())
        }
    }
}

/// Resolves settings and builds the HTTP client for commands that talk to the API.
fn connect(
    config_path: PathBuf,
    api_base_url: Option<&str>,
) -> Result<(SettingsStore, HttpSupportClient), CliError> {
    let mut store = SettingsStore::load(config_path);
    if let Some(api_base_url) = api_base_url {
        store.override_api_base_url(api_base_url);
    }
    let api = HttpSupportClient::new(store.settings().api_base_url.clone()).context(ApiSnafu {
        stage: "build-http-client",
    })?;
    tracing::debug!(api_base_url = %api.base_url(), "support api client ready");
    Ok((store, api))
}

async fn run_chat<V>(controller: &ChatController<HttpSupportClient, V>) -> Result<(), CliError>
where
    V: ChatView,
{
    println!("{}", HELP_TEXT.dimmed());
    controller.create_session().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut composer = InputComposer::default();
    let mut inflight: FuturesUnordered<LocalBoxFuture<'_, ()>> = FuturesUnordered::new();

    // Input keeps being read while requests are pending, so the in-flight guard decides
    // what happens to a message typed before the previous reply arrived.
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context(ReadInputSnafu)? else {
                    // End of input: let pending exchanges finish before leaving.
                    while inflight.next().await.is_some() {}
                    break;
                };
                match composer.push_line(&line) {
                    None => {}
                    Some(InputCommand::Quit) => break,
                    Some(InputCommand::Help) => println!("{}", HELP_TEXT.dimmed()),
                    Some(InputCommand::ShowSession) => match controller.session_id() {
                        Some(session_id) => println!("{} {session_id}", "session:".dimmed()),
                        None => println!("{}", "no active session".dimmed()),
                    },
                    Some(InputCommand::Unknown(name)) => {
                        println!("{} {name} (try /help)", "unknown command".red());
                    }
                    Some(InputCommand::Chat(ChatAction::Submit(_)))
                        if controller.status() == ConnectionStatus::Escalated =>
                    {
                        println!("{}", "input is closed for this session, type /new to start over".dimmed());
                    }
                    Some(InputCommand::Chat(action)) => {
                        inflight.push(controller.dispatch(action).boxed_local());
                    }
                }
            }
            Some(()) = inflight.next(), if !inflight.is_empty() => {}
        }
    }

    Ok(())
}

async fn run_health(api: &HttpSupportClient) -> Result<(), CliError> {
    let health = api
        .health()
        .await
        .context(ApiSnafu { stage: "health" })?;

    let details = [health.message.as_deref(), health.version.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    println!("{} {} {details}", api.base_url(), health.status.green());

    ensure!(
        health.is_ok(),
        UnhealthySnafu {
            status: health.status.clone()
        }
    );
    Ok(())
}

async fn run_history(api: &HttpSupportClient, session_id: SessionId) -> Result<(), CliError> {
    let history = api
        .history(&session_id)
        .await
        .context(ApiSnafu { stage: "history" })?;

    println!(
        "{} {} ({})",
        "session:".dimmed(),
        history.session_id,
        history.status
    );
    for entry in &history.messages {
        let confidence = entry
            .confidence_score
            .map(|score| format!(" ({:.0}% confident)", (score * 100.0).round()))
            .unwrap_or_default();
        println!(
            "{} {}{confidence}: {}",
            format!("[{}]", entry.timestamp).dimmed(),
            entry.role.bold(),
            entry.content
        );
    }
    Ok(())
}

fn run_config(action: ConfigAction, config_path: PathBuf) -> Result<(), CliError> {
    match action {
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Show => {
            let store = SettingsStore::load(config_path);
            let rendered = serde_json::to_string_pretty(store.settings()).context(
                RenderSettingsSnafu {
                    stage: "show-settings",
                },
            )?;
            println!("{rendered}");
        }
        ConfigAction::SetUrl { url } => {
            let mut store = SettingsStore::load_file_only(config_path);
            let mut settings = store.settings().clone();
            settings.api_base_url = url;
            store.update(settings).context(SettingsSnafu)?;
            println!(
                "{} {} in {}",
                "saved".green(),
                store.settings().api_base_url,
                store.config_path().display()
            );
        }
    }
    Ok(())
}
