//! External collaborators of the editor session
//!
//! - **Identity provider**: sign-in/out, current session, auth-change events
//! - **Notes store**: note CRUD, scoped to the signed-in user
//! - **Compile service**: LaTeX source to PDF bytes
//! - **Artifact store**: owns the rendered PDFs shown in the preview
//!
//! Each is a trait so the session can be driven by the HTTP clients in
//! production and by the in-memory fakes in [`memory`] under test.

pub mod artifacts;
pub mod compile;
pub mod events;
pub mod memory;
pub mod supabase;

use crate::error::Result;
use crate::types::{BearerToken, NewNote, Note, NoteId, NoteUpdate, Session};
use async_trait::async_trait;

pub use artifacts::{ArtifactHandle, DirArtifactStore, MemoryArtifactStore};
pub use compile::{CompileClient, CompileConfig};
pub use events::{AuthEventBus, AuthSubscription};
pub use supabase::{SupabaseAuth, SupabaseConfig, SupabaseNotes};

/// Identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account. Returns a session when the backend signs the
    /// user in immediately, `None` when email confirmation is pending.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>>;

    /// Password sign-in; publishes [`crate::types::AuthEvent::SignedIn`]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// End the session; publishes [`crate::types::AuthEvent::SignedOut`]
    async fn sign_out(&self) -> Result<()>;

    /// The current session, if any
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Send a password reset email
    async fn reset_password(&self, email: &str) -> Result<()>;

    /// Subscribe to auth state changes
    fn subscribe(&self) -> AuthSubscription;
}

/// Notes store. Every call is made on behalf of `session`.
#[async_trait]
pub trait NotesStore: Send + Sync {
    async fn create(&self, session: &Session, note: &NewNote) -> Result<Note>;

    async fn update(&self, session: &Session, id: NoteId, update: &NoteUpdate) -> Result<Note>;

    /// The user's notes, most recently updated first
    async fn list(&self, session: &Session) -> Result<Vec<Note>>;

    async fn get(&self, session: &Session, id: NoteId) -> Result<Note>;

    async fn delete(&self, session: &Session, id: NoteId) -> Result<()>;
}

/// Remote LaTeX compiler
#[async_trait]
pub trait CompileService: Send + Sync {
    /// Compile `source` to PDF bytes
    async fn compile(&self, source: &str, credential: &BearerToken) -> Result<Vec<u8>>;
}

/// Owner of rendered preview artifacts
pub trait ArtifactStore: Send + Sync {
    /// Take ownership of a rendered PDF and hand back a handle to it
    fn publish(&self, pdf: Vec<u8>) -> Result<ArtifactHandle>;

    /// Free the artifact behind `handle`
    fn release(&self, handle: &ArtifactHandle) -> Result<()>;
}
