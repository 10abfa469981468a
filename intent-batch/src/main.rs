//! intent-batch - Main entry point
//!
//! Command-line front end for customer-intent classification: sign in,
//! classify a single query, or upload a dataset and view/export the results.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use intent_batch::api;
use intent_batch::models::View;
use intent_batch::services::file_ingestor::UploadFile;
use intent_batch::services::session_gate::Navigation;
use intent_batch::{AppError, AppState};
use intent_common::config::{self as common_config, RootFolderResolver, TomlConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for intent-batch
#[derive(Parser, Debug)]
#[command(name = "intent-batch")]
#[command(about = "Classify customer comments into intents with a remote NLP service")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/intent-batch/config.toml)
    #[arg(short, long, env = "INTENT_BATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding persisted session state
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mark the session as signed in
    Login,
    /// Sign out
    Logout,
    /// Show whether the session is signed in
    Status,
    /// Classify a single query
    Query {
        /// Text to classify
        text: String,
    },
    /// Upload a CSV/JSON/TXT dataset and classify every row
    Upload {
        /// Dataset file
        file: PathBuf,
        /// Declared MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
        /// Also write the results as CSV to this path
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(common_config::default_config_path);
    let (toml_config, config_source) = common_config::load_config(config_path.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&toml_config);
    config_source.log();

    if let Command::Config {
        action: ConfigAction::Init { force },
    } = &args.command
    {
        let path = config_path.ok_or_else(|| anyhow!("No config directory on this platform; pass --config"))?;
        return config_init(&path, *force);
    }

    let root_folder = RootFolderResolver::new(args.root_folder.as_deref(), &toml_config).resolve();
    common_config::ensure_root_folder(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let state = AppState::from_config(&toml_config, &root_folder)
        .context("Failed to initialize application state")?;

    match args.command {
        Command::Login => {
            api::login(&state).await?;
            println!("Signed in.");
        }
        Command::Logout => {
            api::logout(&state).await?;
            println!("Signed out.");
        }
        Command::Status => {
            let session = api::session_status(&state).await;
            println!(
                "{}",
                if session.authenticated { "Signed in" } else { "Signed out" }
            );
        }
        Command::Query { text } => run_query(&state, &text).await?,
        Command::Upload { file, mime, export } => {
            let file = match mime {
                Some(mime) => UploadFile::with_mime(file, mime),
                None => UploadFile::new(file),
            };
            run_upload(&state, &file, export.as_deref()).await?;
        }
        Command::Config { .. } => {}
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level for this workspace's crates
fn init_tracing(config: &TomlConfig) {
    let level = &config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("intent_batch={level},intent_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    common_config::write_toml_config(&TomlConfig::default(), path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Gate check with the redirect the views perform
async fn enter(state: &AppState, view: View) -> bool {
    match api::navigate(state, view).await {
        Navigation::Allowed(_) => true,
        Navigation::Redirected { to, warning } => {
            eprintln!("{}", warning);
            eprintln!("Redirected to {}", to);
            false
        }
    }
}

async fn run_query(state: &AppState, text: &str) -> Result<()> {
    if !enter(state, View::SingleQuery).await {
        return Ok(());
    }

    let cancel = cancel_on_ctrl_c(state.clone());
    match api::submit_query(state, text, &cancel).await {
        Ok(Some(result)) => {
            println!("Query:            {}", result.input_text());
            println!("Predicted intent: {}", result.predicted_intent());
            Ok(())
        }
        Ok(None) => {
            println!("Nothing to classify: the query is empty.");
            Ok(())
        }
        Err(e) => report(e),
    }
}

async fn run_upload(state: &AppState, file: &UploadFile, export: Option<&Path>) -> Result<()> {
    if !enter(state, View::DatasetUpload).await {
        return Ok(());
    }

    eprintln!("Processing...");
    let cancel = cancel_on_ctrl_c(state.clone());
    let job = match api::upload_dataset(state, file, cancel).await {
        Ok(job) => job,
        Err(e) => return report(e),
    };
    println!("File processed successfully ({} rows).", job.results().len());

    if !enter(state, View::Results).await {
        return Ok(());
    }

    let results = api::results_snapshot(state).await?;
    let width = results
        .iter()
        .map(|r| r.input_text().chars().count())
        .max()
        .unwrap_or(0)
        .clamp("Query".len(), 60);

    println!();
    println!("{:<width$}  Predicted Intent", "Query");
    for result in results.iter() {
        let query: String = result.input_text().chars().take(width).collect();
        println!("{:<width$}  {}", query, result.predicted_intent());
    }

    println!();
    println!("Intent distribution:");
    for entry in api::intent_distribution(state).await? {
        let share = entry.count as f64 * 100.0 / results.len().max(1) as f64;
        println!("  {:<20} {:>5} ({:.1}%)", entry.intent, entry.count, share);
    }

    if let Some(path) = export {
        let rows = api::export_results(state, path).await?;
        println!();
        println!("Exported {} rows to {}", rows, path.display());
    }

    Ok(())
}

/// Print a user-facing error and exit non-zero
fn report(error: AppError) -> Result<()> {
    eprintln!("{}", error.user_message());
    if error.is_retryable() {
        eprintln!("You can try again.");
    }
    let code = error.code();
    Err(anyhow!(error).context(format!("Operation failed ({})", code)))
}

/// Token cancelled when the user presses Ctrl+C
///
/// A press with no batch in flight exits immediately with status 130.
fn cancel_on_ctrl_c(state: AppState) -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        while signal::ctrl_c().await.is_ok() {
            child.cancel();
            if state.cancel_all().await == 0 {
                warn!("Received Ctrl+C, exiting");
                std::process::exit(130);
            }
            warn!("Received Ctrl+C, cancelling batch");
        }
    });
    token
}
