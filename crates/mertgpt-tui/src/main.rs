use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mertgpt_core::{
    ChatController, ChatGateway, ChatView, HttpGateway, Settings, SettingsStore, KNOWN_MODELS,
};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod transcript;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "mgpt")]
#[command(about = "Chat with an OpenAI-compatible endpoint from the terminal", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key for this session only (not saved)
    #[arg(long, env = "MGPT_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Chat-completion endpoint for this session only (not saved)
    #[arg(long, env = "MGPT_API_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Model for this session only (not saved)
    #[arg(long, env = "MGPT_MODEL", global = true)]
    model: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120, global = true)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Show saved settings, or update them
    Config {
        #[arg(long)]
        set_key: Option<String>,
        #[arg(long)]
        set_endpoint: Option<String>,
        #[arg(long)]
        set_model: Option<String>,
    },
    /// List the models offered in the settings picker
    Models,
}

impl Cli {
    /// Loaded settings with this session's overrides applied
    fn session_settings(&self, store: &SettingsStore) -> Settings {
        let mut settings = store.load();
        if let Some(key) = &self.api_key {
            settings.api_key = key.trim().to_string();
        }
        if let Some(endpoint) = &self.endpoint {
            settings.api_endpoint = endpoint.trim().to_string();
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        settings
    }
}

/// Log to a file: stdout/stderr belong to the TUI
fn init_logging() {
    let log_file = dirs::data_local_dir()
        .map(|dir| dir.join("mertgpt"))
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            std::fs::File::create(dir.join("mgpt.log")).ok()
        });

    let Some(log_file) = log_file else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let store = match &cli.config {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::default_location()?,
    };
    tracing::info!(path = %store.path().display(), "using settings file");

    let gateway = HttpGateway::with_timeout(Duration::from_secs(cli.timeout))
        .context("failed to build HTTP client")?;

    match &cli.command {
        None => {
            let settings = cli.session_settings(&store);
            run_tui(settings, store, Arc::new(gateway)).await
        }
        Some(Commands::Ask { question }) => {
            let settings = cli.session_settings(&store);
            ask(settings, &gateway, &question.join(" ")).await
        }
        Some(Commands::Config {
            set_key,
            set_endpoint,
            set_model,
        }) => configure(&store, set_key.clone(), set_endpoint.clone(), set_model.clone()),
        Some(Commands::Models) => {
            let current = cli.session_settings(&store).model;
            for model in KNOWN_MODELS {
                let marker = if *model == current { "*" } else { " " };
                println!("{} {}", marker, model);
            }
            Ok(())
        }
    }
}

async fn run_tui(settings: Settings, store: SettingsStore, gateway: Arc<dyn ChatGateway>) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(settings, store, gateway, events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

/// Prints the reply for one-shot questions; errors are kept for the exit status
#[derive(Default)]
struct PrintView {
    error: Option<String>,
}

impl ChatView for PrintView {
    fn render_user_turn(&mut self, _text: &str) {}

    fn render_assistant_turn(&mut self, text: &str, is_error: bool) {
        if is_error {
            self.error = Some(text.to_string());
        } else {
            println!("{}", text);
        }
    }

    fn show_typing_indicator(&mut self) {}

    fn clear_typing_indicator(&mut self) {}

    fn reset_conversation_view(&mut self) {}

    fn request_configuration(&mut self) {
        self.error = Some(
            "No API key or endpoint configured. Run `mgpt config --set-key <KEY>` or set MGPT_API_KEY."
                .to_string(),
        );
    }
}

async fn ask(settings: Settings, gateway: &HttpGateway, question: &str) -> Result<()> {
    let mut controller = ChatController::new(settings);
    let mut view = PrintView::default();

    let outcome = controller.submit(question, gateway, &mut view).await;

    if let Some(error) = view.error {
        return Err(anyhow!(error));
    }
    match outcome? {
        Some(_) => Ok(()),
        None => Err(anyhow!("question is empty")),
    }
}

fn configure(
    store: &SettingsStore,
    key: Option<String>,
    endpoint: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let mut settings = store.load();

    if key.is_none() && endpoint.is_none() && model.is_none() {
        let api_key = if settings.has_api_key() {
            settings.masked_api_key()
        } else {
            "(not set)".to_string()
        };
        println!("Settings file: {}", store.path().display());
        println!("API key:       {}", api_key);
        println!("API endpoint:  {}", settings.api_endpoint);
        println!("Model:         {}", settings.model);
        return Ok(());
    }

    if let Some(key) = key {
        settings.api_key = key;
    }
    if let Some(endpoint) = endpoint {
        settings.api_endpoint = endpoint;
    }
    if let Some(model) = model {
        settings.model = model;
    }

    let saved = store.save(settings)?;
    println!("Settings saved to {} (model: {})", store.path().display(), saved.model);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_session_overrides_are_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(&path);

        let cli = Cli::parse_from([
            "mgpt",
            "--config",
            path.to_str().unwrap(),
            "--api-key",
            " sk-session ",
            "--model",
            "deepseek-reasoner",
            "models",
        ]);
        let settings = cli.session_settings(&store);

        assert_eq!(settings.api_key, "sk-session");
        assert_eq!(settings.model, "deepseek-reasoner");
        assert!(!path.exists());
    }

    #[test]
    fn test_configure_validates_before_saving() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        assert!(configure(&store, None, Some("http://localhost/v1".to_string()), None).is_err());
        assert!(!store.path().exists());

        configure(&store, Some("sk-abc".to_string()), None, None).unwrap();
        assert_eq!(store.load().api_key, "sk-abc");
    }

    #[tokio::test]
    async fn test_ask_without_key_fails_before_any_request() {
        let gateway = HttpGateway::new().unwrap();
        let err = ask(Settings::default(), &gateway, "Hello").await.unwrap_err();
        assert!(err.to_string().contains("No API key or endpoint configured"));
    }

    #[tokio::test]
    async fn test_ask_with_blank_endpoint_fails_before_any_request() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let cli = Cli::parse_from(["mgpt", "--api-key", "sk-abc", "--endpoint", " ", "models"]);
        let settings = cli.session_settings(&store);
        assert_eq!(settings.api_endpoint, "");

        let gateway = HttpGateway::new().unwrap();
        let err = ask(settings, &gateway, "Hello").await.unwrap_err();
        assert!(err.to_string().contains("No API key or endpoint configured"));
    }
}
