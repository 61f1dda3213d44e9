use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use liaison_core::{Config, GeminiClient, Liaison};
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui, TICK_RATE};

#[derive(Parser)]
#[command(name = "liaison", version)]
#[command(about = "Chat with Saon's AI liaison from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Model to use instead of the configured one
    #[arg(short, long, global = true)]
    model: Option<String>,
    /// Send requests to this endpoint (e.g. a proxy that holds the API key)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Read configuration from this file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase logging verbosity
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        text: String,
    },
    /// List known models
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.verbose, Config::config_dir());

    let config = load_config(&cli)?;

    match cli.command {
        None => run_tui(&config).await,
        Some(Commands::Ask { text }) => ask(&config, &text).await,
        Some(Commands::Models) => {
            list_models(&config);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env(|name| std::env::var(name).ok());
            config
        }
        None => Config::load()?,
    };

    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = Some(base_url.clone());
    }
    Ok(config)
}

/// The terminal belongs to the UI, so logs go to a file next to the config.
/// Without a usable directory logging is off and the app runs anyway.
fn setup_logging(verbose: u8, log_dir: Result<PathBuf>) -> WorkerGuard {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let Some(appender) = log_appender(log_dir) else {
        let (_, guard) = NonBlocking::new(std::io::sink());
        return guard;
    };

    let (non_blocking, guard) = NonBlocking::new(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    Registry::default().with(env_filter).with(file_layer).init();

    guard
}

fn log_appender(log_dir: Result<PathBuf>) -> Option<RollingFileAppender> {
    let log_dir = log_dir.ok()?;
    std::fs::create_dir_all(&log_dir).ok()?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("liaison.log")
        .build(&log_dir)
        .ok()
}

fn build_liaison(config: &Config) -> Result<Liaison> {
    let client = config.client()?;
    info!(model = client.model(), base_url = client.base_url(), "liaison ready");
    Ok(Liaison::new(config.persona(), Arc::new(client)))
}

async fn run_tui(config: &Config) -> Result<()> {
    let mut app = App::new(build_liaison(config)?, config.model());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run_loop(&mut terminal, &mut app).await;
    tui::restore()?;

    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}

async fn ask(config: &Config, text: &str) -> Result<()> {
    let mut liaison = build_liaison(config)?;

    if !liaison.send(text).await {
        anyhow::bail!("nothing to ask: the question is empty");
    }

    if let Some(reply) = liaison.conversation().last() {
        println!("{}", reply.text);
    }
    Ok(())
}

fn list_models(config: &Config) {
    for model in GeminiClient::list_models() {
        let marker = if model == config.model() { "*" } else { " " };
        println!("{marker} {model}");
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn log_file_lands_in_the_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("liaison");
        assert!(log_appender(Ok(log_dir.clone())).is_some());
        assert!(log_dir.join("liaison.log").exists());
    }

    #[test]
    fn unknown_config_dir_disables_logging() {
        assert!(log_appender(Err(anyhow!("Could not determine config directory"))).is_none());
    }

    #[test]
    fn unwritable_log_dir_disables_logging() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        assert!(log_appender(Ok(blocker.join("liaison"))).is_none());
    }

    #[test]
    fn logging_setup_survives_missing_dir() {
        let _guard = setup_logging(0, Err(anyhow!("no home")));
    }
}
