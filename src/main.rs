//! PageBrain CLI - structured webpage summaries
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments, wiring logging, printing results and handling
//! top-level errors.

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use pagebrain::preferences::{self, API_KEY};
use pagebrain::{ui, Config, LengthPreference, PreferenceStore, Storage, Summarizer, Summary};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "pagebrain.log";

#[derive(Parser)]
#[command(name = "pagebrain")]
#[command(author, version, about = "Structured webpage summaries from the terminal", long_about = None)]
struct Cli {
    /// Config file to use instead of the standard locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a webpage by URL
    #[command(visible_alias = "summarize")]
    Summarise {
        /// URL to summarise
        url: String,
        /// Summary length for this run only
        #[arg(long, value_enum)]
        length: Option<LengthPreference>,
        /// Show raw extracted text instead of summary
        #[arg(long)]
        raw: bool,
        /// Print the summary as JSON
        #[arg(long, conflicts_with = "raw")]
        json: bool,
    },
    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Show or set the default summary length
    Length {
        #[arg(value_enum)]
        value: Option<LengthPreference>,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Save an API key (prompts when omitted)
    Set { key: Option<String> },
    /// Show the stored key, masked
    Show,
    /// Delete the stored key
    Remove,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "pagebrain", &mut std::io::stdout());
        return Ok(());
    }

    if !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if cli.command.is_none() {
        init_file_logging(&config.storage.path)?;
    } else {
        init_stderr_logging();
    }

    let storage = Storage::open(config.storage.path.join("preferences"))
        .with_context(|| format!("opening preferences in {}", config.storage.path.display()))?;
    let summarizer = Summarizer::new(config, storage)?;

    match cli.command {
        Some(Commands::Summarise {
            url,
            length,
            raw,
            json,
        }) => {
            if raw {
                let page = summarizer.extract(&url).await?;
                println!("\n=== {} ===\n", page.title);
                println!("{}", page.text);
                println!("\n--- Extracted {} characters ---", page.text.chars().count());
                return Ok(());
            }

            if !json {
                println!("Summarising {}...\n", url);
            }
            let summary = match summarizer.summarize_url(&url, length).await {
                Ok(summary) => summary,
                Err(err) => {
                    tracing::error!(kind = err.kind(), "summarisation failed");
                    return Err(err.into());
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Some(Commands::Key { action }) => handle_key(&summarizer, action)?,
        Some(Commands::Length { value }) => match value {
            Some(length) => {
                summarizer.set_length(length)?;
                println!("Summary length set to {}", length.to_string().bold());
            }
            None => println!("{}", summarizer.length()?),
        },
        Some(Commands::Completions { .. }) => {}
        None => {
            // Default: Launch the TUI
            ui::run(Arc::new(summarizer)).await?;
        }
    }

    Ok(())
}

fn handle_key(summarizer: &Summarizer<Storage>, action: KeyAction) -> anyhow::Result<()> {
    let store = summarizer.store();
    match action {
        KeyAction::Set { key } => {
            let key = match key {
                Some(key) => key,
                None => dialoguer::Password::new()
                    .with_prompt("Anthropic API key")
                    .interact()?,
            };
            let saved = preferences::save_api_key(store, &key)?;
            println!("API key saved ({})", saved.masked());
        }
        KeyAction::Show => match store.get_entry(API_KEY)? {
            Some(entry) => {
                let masked = pagebrain::ApiKey::new(entry.value)
                    .map(|key| key.masked())
                    .unwrap_or_else(|| "****".to_string());
                println!(
                    "{} (saved {})",
                    masked,
                    entry.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
            None => println!("No API key saved."),
        },
        KeyAction::Remove => {
            if preferences::remove_api_key(store)? {
                println!("API key removed.");
            } else {
                println!("No API key saved.");
            }
        }
    }

    if std::env::var(pagebrain::config::API_KEY_ENV).is_ok() {
        println!(
            "{}",
            format!(
                "Note: {} is set and takes precedence over the stored key.",
                pagebrain::config::API_KEY_ENV
            )
            .dimmed()
        );
    }
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("{}", "📌 Key Points:".bold());
    print_list(&summary.key_points);

    println!("\n{}", "✅ Action Items:".bold());
    print_list(&summary.action_items);

    println!("\n{}", "💡 Main Takeaway:".bold());
    if summary.takeaway.is_empty() {
        println!("  {}", "None identified.".dimmed().italic());
    } else {
        for line in summary.takeaway.lines() {
            println!("  {}", line);
        }
    }
}

fn print_list(items: &[String]) {
    if items.is_empty() {
        println!("  {}", "None identified.".dimmed().italic());
    }
    for item in items {
        println!("  • {}", item);
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The TUI owns the terminal, so its logs go to a file
fn init_file_logging(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
        .with_context(|| format!("opening log file in {}", dir.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
