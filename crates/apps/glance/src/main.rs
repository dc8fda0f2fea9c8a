//! Glance - a read-only Gmail viewer
//!
//! `glance serve` runs the HTTP API used by the web front end. The other
//! subcommands sign in from the terminal and print the most recent messages.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use mail::{GmailCredentials, LocalAuth, NormalizedMessage, Retriever, Session};

mod api;
mod server;
mod settings;

use api::ApiContext;
use settings::Settings;

#[derive(Parser)]
#[command(name = "glance")]
#[command(about = "Read-only Gmail viewer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Listen address, overrides settings
        #[arg(long)]
        addr: Option<String>,
    },

    /// Sign in to Gmail in the browser and store the session
    Login,

    /// Forget the stored session
    Logout,

    /// Print the most recent messages for the stored session
    List {
        /// Print the JSON envelope instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load()?;

    match cli.cmd.unwrap_or(Command::Serve { addr: None }) {
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| settings.listen_addr.clone());
            let summarizer = settings.summarizer();
            if summarizer.is_none() {
                warn!("OPENAI_API_KEY not set; /api/synthesis will fail");
            }
            let ctx = ApiContext {
                retriever: Retriever::new(settings.gmail_client())?,
                summarizer,
            };
            server::serve(&addr, ctx)
        }
        Command::Login => login(&settings),
        Command::Logout => {
            if Session::clear(&Session::default_path()?)? {
                println!("Signed out.");
            } else {
                println!("No stored session.");
            }
            Ok(())
        }
        Command::List { json } => list(&settings, json),
    }
}

fn login(settings: &Settings) -> Result<()> {
    let credentials = GmailCredentials::load().inspect_err(|_| {
        if let Some(path) = GmailCredentials::default_credentials_path() {
            warn!(
                "To configure Gmail sign-in, either:\n\
                 1. Place your Google OAuth credentials at: {}\n\
                 2. Or set environment variables: GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
                path.display()
            );
        }
    })?;

    let session = LocalAuth::new(credentials).login()?;
    let email = mail::verify_access_token(&settings.gmail_client(), &session.token())?;
    session.save(&Session::default_path()?)?;

    info!("Session stored");
    println!("Signed in as {}", email);
    Ok(())
}

fn list(settings: &Settings, as_json: bool) -> Result<()> {
    let session = Session::load(&Session::default_path()?)?
        .context("Not signed in (or session expired). Run `glance login` first.")?;

    let retriever = Retriever::new(settings.gmail_client())?;
    let report = retriever.fetch_recent_partial(Some(&session.token()))?;

    if as_json {
        let envelope = serde_json::json!({ "messages": report.messages });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        for message in &report.messages {
            println!("{}", format_row(message));
        }
    }

    for failure in &report.failures {
        eprintln!("Could not load message {}: {:#}", failure.id, failure.error);
    }
    Ok(())
}

/// One line of the `glance list` table
fn format_row(message: &NormalizedMessage) -> String {
    let when = message
        .received_at()
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string());
    let marker = if message.has_label("UNREAD") { '*' } else { ' ' };
    let sender = message.sender_address();

    format!(
        "{} {}  {:<24.24}  {}",
        marker,
        when,
        sender.short_display(),
        message.subject
    )
}
