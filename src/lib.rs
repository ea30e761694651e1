//! Texnote - LaTeX note editor core
//!
//! The editing engine behind a LaTeX note-taking app:
//! - Command autocomplete triggered by `\`
//! - Debounced auto-save of the loaded note
//! - Compile-to-PDF through a remote service, with preview lifecycle
//! - Cloud-backed notes scoped to the signed-in user
//!
//! # Architecture
//!
//! - **Types**: notes, sessions and auth events
//! - **Editor**: catalog, autocomplete engine, debouncer and the session
//!   controller that owns editor state
//! - **Services**: traits for the identity provider, notes store, compile
//!   service and artifact store, with HTTP and in-memory implementations
//!
//! # Example
//!
//! ```ignore
//! use texnote_core::{EditorSession, SessionDeps, SessionOptions, TexnoteConfig};
//!
//! #[tokio::main]
//! async fn main() -> texnote_core::Result<()> {
//!     let config = TexnoteConfig::load(None)?;
//!     let session = EditorSession::new(deps, SessionOptions::from(&config));
//!     let _listener = session.listen_for_auth_changes();
//!
//!     session.sign_in("ada@example.com", "secret").await?;
//!     session.input("\\documentclass{article}\n\\sec", 31);
//!     session.compile().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod editor;
pub mod error;
pub mod services;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::TexnoteConfig;
pub use editor::{
    AutocompleteEngine, AutocompleteState, CommandCatalog, Debouncer, EditorSession, Key,
    KeyOutcome, SessionDeps, SessionOptions, StatusKind, StatusMessage,
};
pub use error::{Result, TexnoteError};
pub use services::{ArtifactStore, CompileService, IdentityProvider, NotesStore};
pub use types::{AuthEvent, BearerToken, NewNote, Note, NoteId, NoteUpdate, Session, User};
