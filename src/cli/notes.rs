//! Note commands: list, show, delete and save

use super::helpers::{self, Backend};
use clap::Subcommand;
use std::path::PathBuf;
use texnote_core::{
    error::{Result, TexnoteError},
    utils::string::preview_line,
    NoteId, TexnoteConfig,
};

const PREVIEW_CHARS: usize = 60;

#[derive(Subcommand)]
pub enum NotesCommand {
    /// List your notes, most recently updated first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a note's LaTeX source
    Show {
        /// Note ID
        id: String,
    },

    /// Delete a note
    Delete {
        /// Note ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn parse_id(id: &str) -> Result<NoteId> {
    NoteId::from_string(id)
        .map_err(|_| TexnoteError::Validation(format!("Not a valid note ID: {}", id)))
}

/// Handle `texnote notes ...`
pub async fn handle(config: &TexnoteConfig, command: NotesCommand) -> Result<()> {
    let backend = Backend::connect(config).await?;
    backend.require_login()?;

    match command {
        NotesCommand::List { json } => {
            let notes = backend.editor.refresh_notes().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else if notes.is_empty() {
                println!("No notes yet. Save one with `texnote save`.");
            } else {
                for note in &notes {
                    println!("{}  {}  {}", note.id, note.display_date(), note.title);
                    let preview = preview_line(note.body(), PREVIEW_CHARS);
                    if !preview.is_empty() {
                        println!("    {}", preview);
                    }
                }
            }
        }
        NotesCommand::Show { id } => {
            let note = backend.editor.open(parse_id(&id)?).await?;
            print!("{}", note.body());
            if !note.body().ends_with('\n') {
                println!();
            }
        }
        NotesCommand::Delete { id, yes } => {
            let note = backend.editor.open(parse_id(&id)?).await?;
            let question = format!("Delete \"{}\"?", note.title);
            if !yes && !helpers::confirm(&question) {
                println!("Cancelled.");
                return Ok(());
            }
            backend.editor.delete_current().await?;
            println!("✓ Deleted {}", note.id);
        }
    }

    backend.persist().await
}

/// Handle `texnote save`
///
/// Creates a note, or updates `id` when given. The title defaults to one
/// derived from the document.
pub async fn save(
    config: &TexnoteConfig,
    file: Option<PathBuf>,
    title: Option<String>,
    id: Option<String>,
) -> Result<()> {
    let source = helpers::read_source(file.as_deref())?;
    let backend = Backend::connect(config).await?;
    backend.require_login()?;

    if let Some(id) = id {
        backend.editor.open(parse_id(&id)?).await?;
    }
    backend.editor.set_text(source);

    let note = match title {
        Some(title) => backend.editor.save(&title).await?,
        None => backend.editor.save_suggested().await?,
    };
    backend.editor.shutdown();

    println!("✓ Saved \"{}\"", note.title);
    println!("  ID: {}", note.id);
    backend.persist().await
}
