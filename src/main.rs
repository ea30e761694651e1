//! Texnote - LaTeX notes from the command line
//!
//! Sign in, save and list notes, compile documents to PDF and query the
//! command autocomplete, all against the same backends the editor uses.

mod cli;

use clap::{Parser, Subcommand};
use cli::notes::NotesCommand;
use std::path::PathBuf;
use texnote_core::{editor::STARTER_TEMPLATE, error::Result, TexnoteConfig};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "texnote")]
#[command(about = "LaTeX note editor: notes, compile to PDF, command completion", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Config file (defaults to $XDG_CONFIG_HOME/texnote/config.toml)
    #[arg(long, env = "TEXNOTE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        /// Account email
        email: String,

        /// Password (prompted on stdin when not given)
        #[arg(long, env = "TEXNOTE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account
    Signup {
        /// Account email
        email: String,

        /// Password (prompted on stdin when not given)
        #[arg(long, env = "TEXNOTE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// End the session
    Logout,

    /// Send a password reset email
    ResetPassword {
        /// Account email
        email: String,
    },

    /// Manage saved notes
    Notes {
        #[command(subcommand)]
        command: NotesCommand,
    },

    /// Save a document as a note
    Save {
        /// LaTeX file (stdin when omitted or `-`)
        file: Option<PathBuf>,

        /// Note title (derived from the document when omitted)
        #[arg(short, long)]
        title: Option<String>,

        /// Update this note instead of creating one
        #[arg(long)]
        id: Option<String>,
    },

    /// Compile a document or saved note to PDF
    Compile {
        /// LaTeX file (stdin when omitted or `-`)
        file: Option<PathBuf>,

        /// Compile a saved note instead of a file
        #[arg(long, conflicts_with = "file")]
        note: Option<String>,

        /// Output PDF path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Complete a LaTeX command at the caret
    Complete {
        /// Text being edited
        text: String,

        /// Caret byte offset (defaults to end of text)
        #[arg(long)]
        caret: Option<usize>,

        /// Insert the candidate at this index and print the result
        #[arg(long)]
        apply: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the starter document
    Template {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Our crates at the chosen level, HTTP internals quieter
    let filter = EnvFilter::new(format!(
        "texnote={level},texnote_core={level},reqwest=warn,hyper=warn",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Texnote v{} starting...", env!("CARGO_PKG_VERSION"));

    let load_config = || TexnoteConfig::load(cli.config.as_deref());

    match cli.command {
        Commands::Login { email, password } => {
            cli::auth::login(&load_config()?, &email, password).await
        }
        Commands::Signup { email, password } => {
            cli::auth::signup(&load_config()?, &email, password).await
        }
        Commands::Logout => cli::auth::logout(&load_config()?).await,
        Commands::ResetPassword { email } => {
            cli::auth::reset_password(&load_config()?, &email).await
        }
        Commands::Notes { command } => cli::notes::handle(&load_config()?, command).await,
        Commands::Save { file, title, id } => {
            cli::notes::save(&load_config()?, file, title, id).await
        }
        Commands::Compile { file, note, output } => {
            cli::compile::handle(&load_config()?, file, note, output).await
        }
        Commands::Complete {
            text,
            caret,
            apply,
            json,
        } => cli::complete::handle(&text, caret, apply, json),
        Commands::Template { output } => match output {
            Some(path) => {
                std::fs::write(&path, STARTER_TEMPLATE)?;
                println!("✓ Wrote {}", path.display());
                Ok(())
            }
            None => {
                print!("{}", STARTER_TEMPLATE);
                Ok(())
            }
        },
    }
}
