//! Common test utilities and helpers

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use texnote_core::services::memory::{MemoryCompiler, MemoryIdentity, MemoryNotesStore};
use texnote_core::services::MemoryArtifactStore;
use texnote_core::{EditorSession, Session, SessionDeps, SessionOptions};

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "analytical";

/// Auto-save window used by the harness
pub const WINDOW: Duration = Duration::from_millis(2000);

/// An editor session wired to in-memory collaborators
pub struct Harness {
    pub editor: EditorSession,
    pub identity: Arc<MemoryIdentity>,
    pub notes: Arc<MemoryNotesStore>,
    pub compiler: Arc<MemoryCompiler>,
    pub artifacts: Arc<MemoryArtifactStore>,
}

impl Harness {
    pub fn new() -> Self {
        let identity = Arc::new(MemoryIdentity::new().with_account(EMAIL, PASSWORD));
        let notes = Arc::new(MemoryNotesStore::new());
        let compiler = Arc::new(MemoryCompiler::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());

        let editor = EditorSession::new(
            SessionDeps {
                identity: identity.clone(),
                notes: notes.clone(),
                compiler: compiler.clone(),
                artifacts: artifacts.clone(),
            },
            SessionOptions {
                autosave_window: WINDOW,
                ..Default::default()
            },
        );

        Self {
            editor,
            identity,
            notes,
            compiler,
            artifacts,
        }
    }

    /// Harness with the editor already signed in; returns the session too
    pub async fn signed_in() -> (Self, Session) {
        let harness = Self::new();
        harness
            .editor
            .sign_in(EMAIL, PASSWORD)
            .await
            .expect("sign in");
        let session = harness
            .identity
            .active_session()
            .expect("session after sign in");
        (harness, session)
    }
}

/// Let spawned tasks make progress
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
