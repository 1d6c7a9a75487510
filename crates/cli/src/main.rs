mod config;
mod error;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use notify::{NotificationSink, Notifier};
use runtime::{ConversationEngine, Message, ToolRegistry};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;

const CONFIG_FILE: &str = "twin.toml";

#[derive(Parser)]
#[command(name = "twin")]
#[command(about = "Chat as a persona that records leads and unanswered questions", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// Print the system instruction built from the persona files
    Prompt,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(&config).await,
        Some(Commands::Prompt) => cmd_prompt(&config),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path)?.with_env()?;
    tracing::debug!(path = %path.display(), provider = %config.provider(), "configuration loaded");
    Ok(config)
}

fn cmd_prompt(config: &Config) -> Result<()> {
    let persona = config.persona()?;
    println!("{}", persona.instruction());
    Ok(())
}

async fn cmd_chat(config: &Config) -> Result<()> {
    println!("twin v{}", env!("CARGO_PKG_VERSION"));

    let persona = Arc::new(config.persona()?);
    let backend = config.backend()?;

    let sink = NotificationSink::from_config(&config.mail);
    let mail_status = if sink.is_configured() {
        "enabled"
    } else {
        "disabled (missing configuration)"
    };
    let notifier: Arc<dyn Notifier> = Arc::new(sink);
    let tools = Arc::new(ToolRegistry::standard(notifier, config.mail.subject_tag()));

    println!("Persona: {}", persona.name());
    println!("Model: {backend}");
    println!("Notifications: {mail_status}");
    println!("Type 'quit' or Ctrl+D to exit. Ctrl+C cancels a reply, or exits at the prompt.\n");

    let engine =
        ConversationEngine::new(backend, persona, tools).with_options(config.engine.options());
    let mut history: Vec<Message> = Vec::new();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => break,
        };
        // EOF
        let Some(line) = line else { break };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }

        let outcome = tokio::select! {
            outcome = engine.chat(input, &history) => outcome,
            _ = tokio::signal::ctrl_c() => {
                println!("\n(cancelled)\n");
                continue;
            }
        };

        match outcome {
            Ok(reply) => {
                println!("\n{reply}\n");
                record_exchange(&mut history, input, reply);
            }
            Err(e) => {
                println!("\n{}\n", apology(&e));
            }
        }
    }

    println!("\nGoodbye.");
    Ok(())
}

/// Append a completed exchange. An empty reply is left out along with its
/// question, so no blank assistant turn is replayed to the model.
fn record_exchange(history: &mut Vec<Message>, input: &str, reply: String) {
    if reply.trim().is_empty() {
        return;
    }
    history.push(Message::user(input));
    history.push(Message::assistant(reply));
}

/// What the user sees when a turn fails. History is left as it was.
fn apology(error: &runtime::Error) -> &'static str {
    match error {
        runtime::Error::BackendUnavailable { .. } => {
            "Sorry, I can't reach my language model right now. Please try again in a moment."
        }
        runtime::Error::ToolLoopExceeded { .. } => {
            "Sorry, I got stuck working on that. Could you ask it another way?"
        }
        _ => "Sorry, something went wrong on my end. Please try again.",
    }
}
