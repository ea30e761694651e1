//! Editor session controller
//!
//! Owns the document, the autocomplete engine, the auth state and the
//! rendered preview, and brokers every call to the external collaborators.
//!
//! # Concurrency
//!
//! `EditorSession` is a cheap handle over shared state. State is only ever
//! locked for short synchronous sections; no lock is held across a
//! collaborator call. Results that come back after the user has moved to a
//! different note are detected with a generation counter and dropped.

use super::autocomplete::{AutocompleteEngine, AutocompleteState, Key, KeyOutcome, Splice};
use super::catalog::CommandCatalog;
use super::debounce::Debouncer;
use super::document::{suggest_title, EditorDocument, STARTER_TEMPLATE};
use crate::config::TexnoteConfig;
use crate::error::{Result, TexnoteError};
use crate::services::{
    ArtifactHandle, ArtifactStore, AuthSubscription, CompileService, IdentityProvider, NotesStore,
};
use crate::types::{AuthEvent, NewNote, Note, NoteId, NoteUpdate, Session, User};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Collaborators the session talks to
#[derive(Clone)]
pub struct SessionDeps {
    pub identity: Arc<dyn IdentityProvider>,
    pub notes: Arc<dyn NotesStore>,
    pub compiler: Arc<dyn CompileService>,
    pub artifacts: Arc<dyn ArtifactStore>,
}

/// Tunables for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub autosave_window: Duration,
    pub status_ttl: Duration,
    pub catalog: Arc<CommandCatalog>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&TexnoteConfig::default())
    }
}

impl From<&TexnoteConfig> for SessionOptions {
    fn from(config: &TexnoteConfig) -> Self {
        Self {
            autosave_window: config.autosave_window(),
            status_ttl: config.status_ttl(),
            catalog: Arc::new(CommandCatalog::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
    Info,
}

/// User-visible outcome of the last operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    pub issued_at: Instant,
}

struct EditorState {
    document: EditorDocument,
    autocomplete: AutocompleteEngine,
    session: Option<Session>,
    notes: Vec<Note>,
    artifact: Option<ArtifactHandle>,
    status: Option<StatusMessage>,
    /// Bumped whenever the editor switches to a different note
    generation: u64,
    compiling: bool,
    saving: bool,
}

impl EditorState {
    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
            issued_at: Instant::now(),
        });
    }
}

struct Inner {
    deps: SessionDeps,
    options: SessionOptions,
    state: Mutex<EditorState>,
    autosave: Debouncer,
    /// Live [`AuthListener`]s
    listeners: AtomicUsize,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().artifact.take() {
            if let Err(e) = self.deps.artifacts.release(&handle) {
                warn!("Failed to release preview on teardown: {}", e);
            }
        }
    }
}

/// Handle to the background auth-event listener
///
/// Dropping it, or calling [`AuthListener::unsubscribe`], stops listening.
pub struct AuthListener {
    handle: JoinHandle<()>,
    inner: Weak<Inner>,
}

impl AuthListener {
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for AuthListener {
    fn drop(&mut self) {
        self.handle.abort();
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Editor session controller
#[derive(Clone)]
pub struct EditorSession {
    inner: Arc<Inner>,
}

impl EditorSession {
    pub fn new(deps: SessionDeps, options: SessionOptions) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let autosave = Debouncer::new(options.autosave_window, move || {
                let weak = weak.clone();
                async move {
                    match weak.upgrade() {
                        Some(inner) => EditorSession { inner }.auto_save().await.map(|_| ()),
                        None => Ok(()),
                    }
                }
            });

            Inner {
                state: Mutex::new(EditorState {
                    document: EditorDocument::new(),
                    autocomplete: AutocompleteEngine::new(Arc::clone(&options.catalog)),
                    session: None,
                    notes: Vec::new(),
                    artifact: None,
                    status: None,
                    generation: 0,
                    compiling: false,
                    saving: false,
                }),
                deps,
                options,
                autosave,
                listeners: AtomicUsize::new(0),
            }
        });

        Self { inner }
    }

    // ---- startup and auth -------------------------------------------------

    /// Pick up an existing session and load its notes
    pub async fn init(&self) {
        match self.inner.deps.identity.current_session().await {
            Ok(Some(session)) => {
                debug!("Resuming session for user {}", session.user.id);
                self.inner.state.lock().session = Some(session);
                let _ = self.refresh_notes().await;
            }
            Ok(None) => debug!("No existing session"),
            Err(e) => warn!("Auth check failed: {}", e),
        }
    }

    /// Start applying auth events from the identity provider
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen_for_auth_changes(&self) -> AuthListener {
        let subscription = self.inner.deps.identity.subscribe();
        let weak = Arc::downgrade(&self.inner);
        self.inner.listeners.fetch_add(1, Ordering::AcqRel);
        AuthListener {
            handle: tokio::spawn(pump_auth_events(subscription, weak.clone())),
            inner: weak,
        }
    }

    /// Apply one auth state change
    ///
    /// Every `SignedIn` refetches the listing, even for the session already held.
    pub async fn handle_auth_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => {
                self.inner.state.lock().session = Some(session);
                let _ = self.refresh_notes().await;
            }
            AuthEvent::SignedOut => {
                let mut state = self.inner.state.lock();
                state.session = None;
                state.notes.clear();
                state.document.note_id = None;
                state.document.title.clear();
                state.generation += 1;
                self.inner.autosave.cancel();
                debug!("Signed out; cleared cached notes");
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        match self.inner.deps.identity.sign_in(email, password).await {
            Ok(session) => {
                let user = session.user.clone();
                self.adopt_session(session).await;
                self.report(StatusKind::Success, "Signed in successfully.");
                Ok(user)
            }
            Err(e) => self.fail(Some("Sign in failed: "), e),
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<User>> {
        match self.inner.deps.identity.sign_up(email, password).await {
            Ok(Some(session)) => {
                let user = session.user.clone();
                self.adopt_session(session).await;
                self.report(StatusKind::Success, "Account created.");
                Ok(Some(user))
            }
            Ok(None) => {
                self.report(
                    StatusKind::Info,
                    "Check your email to confirm your account.",
                );
                Ok(None)
            }
            Err(e) => self.fail(Some("Sign up failed: "), e),
        }
    }

    /// Take on a session obtained through this editor
    ///
    /// The provider publishes `SignedIn` for it. An attached listener applies
    /// that event and refetches; without one it is applied here, so the
    /// listing is fetched exactly once either way.
    async fn adopt_session(&self, session: Session) {
        if self.inner.listeners.load(Ordering::Acquire) > 0 {
            self.inner.state.lock().session = Some(session);
        } else {
            self.handle_auth_event(AuthEvent::SignedIn(session)).await;
        }
    }

    pub async fn sign_out(&self) -> Result<()> {
        match self.inner.deps.identity.sign_out().await {
            Ok(()) => {
                self.handle_auth_event(AuthEvent::SignedOut).await;
                self.report(StatusKind::Success, "Logged out successfully.");
                Ok(())
            }
            Err(e) => self.fail(Some("Logout failed: "), e),
        }
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return self.fail(
                None,
                TexnoteError::Validation("Please enter your email address.".to_string()),
            );
        }
        match self.inner.deps.identity.reset_password(email).await {
            Ok(()) => {
                self.report(StatusKind::Success, "Password reset email sent.");
                Ok(())
            }
            Err(e) => self.fail(Some("Password reset failed: "), e),
        }
    }

    // ---- editing ----------------------------------------------------------

    /// Replace the buffer and schedule an auto-save
    ///
    /// Closes the dropdown; [`EditorSession::input`] re-checks at the caret.
    /// Must be called from within a tokio runtime.
    pub fn set_text(&self, text: impl Into<String>) {
        let should_autosave = {
            let mut state = self.inner.state.lock();
            state.document.set_text(text.into());
            state.autocomplete.deactivate();
            state.session.is_some() && !state.document.is_blank()
        };
        if should_autosave {
            self.inner.autosave.trigger();
        }
    }

    /// Text changed at `caret`: update the buffer and re-run autocomplete
    pub fn input(&self, text: impl Into<String>, caret: usize) -> AutocompleteState {
        self.set_text(text);
        self.set_caret(caret)
    }

    /// Caret moved: re-run autocomplete at the new position
    ///
    /// A caret past the end or inside a character finds no trigger; only the
    /// stored caret is clamped.
    pub fn set_caret(&self, caret: usize) -> AutocompleteState {
        let mut state = self.inner.state.lock();
        let EditorState {
            document,
            autocomplete,
            ..
        } = &mut *state;
        let found = autocomplete.check(&document.text, caret).clone();
        document.set_caret(caret);
        found
    }

    /// Key press while the dropdown may be open
    pub fn key(&self, key: Key) -> KeyOutcome {
        let outcome = {
            let mut state = self.inner.state.lock();
            let EditorState {
                document,
                autocomplete,
                ..
            } = &mut *state;
            autocomplete.handle_key(key, &document.text)
        };
        if let KeyOutcome::Applied(splice) = &outcome {
            self.adopt_splice(splice);
        }
        outcome
    }

    /// Insert a candidate picked with the pointer
    pub fn choose_candidate(&self, candidate: &str) -> Option<Splice> {
        let splice = {
            let mut state = self.inner.state.lock();
            let EditorState {
                document,
                autocomplete,
                ..
            } = &mut *state;
            autocomplete.apply(candidate, &document.text)
        }?;
        self.adopt_splice(&splice);
        Some(splice)
    }

    fn adopt_splice(&self, splice: &Splice) {
        self.set_text(splice.text.clone());
        self.inner.state.lock().document.set_caret(splice.caret);
    }

    // ---- compile ----------------------------------------------------------

    /// Compile the buffer and swap in the new preview
    ///
    /// Returns `None` when the result arrived after the editor had moved on
    /// to another note; that artifact is released immediately.
    pub async fn compile(&self) -> Result<Option<ArtifactHandle>> {
        let (text, generation) = {
            let mut state = self.inner.state.lock();
            if state.document.is_blank() {
                drop(state);
                return self.fail(
                    None,
                    TexnoteError::Validation("Please enter some LaTeX content first.".to_string()),
                );
            }
            if state.session.is_none() {
                drop(state);
                return self.fail(
                    None,
                    TexnoteError::AuthRequired(
                        "Please log in to compile LaTeX documents.".to_string(),
                    ),
                );
            }
            state.compiling = true;
            state.status = None;
            (state.document.text.clone(), state.generation)
        };

        let result = self.compile_text(&text).await;
        self.inner.state.lock().compiling = false;

        let pdf = match result {
            Ok(pdf) => pdf,
            Err(e) => return self.fail(Some("Compilation failed: "), e),
        };
        let handle = match self.inner.deps.artifacts.publish(pdf) {
            Ok(handle) => handle,
            Err(e) => return self.fail(Some("Compilation failed: "), e),
        };

        let previous = {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                None
            } else {
                state.set_status(StatusKind::Success, "LaTeX compiled successfully!");
                Some(state.artifact.replace(handle.clone()))
            }
        };

        match previous {
            Some(old) => {
                if let Some(old) = old {
                    self.release(&old);
                }
                info!("Preview updated ({} bytes)", handle.size);
                Ok(Some(handle))
            }
            None => {
                debug!("Discarding compile result for a note that is no longer loaded");
                self.release(&handle);
                Ok(None)
            }
        }
    }

    async fn compile_text(&self, text: &str) -> Result<Vec<u8>> {
        let session = self
            .inner
            .deps
            .identity
            .current_session()
            .await?
            .ok_or_else(|| {
                TexnoteError::AuthRequired("Authentication required. Please log in.".to_string())
            })?;
        self.inner
            .deps
            .compiler
            .compile(text, &session.access_token)
            .await
    }

    // ---- persistence ------------------------------------------------------

    /// Save under `title`: update the loaded note, or create a new one
    pub async fn save(&self, title: &str) -> Result<Note> {
        let title = title.trim().to_string();
        let (session, note_id, text, revision, generation) = {
            let mut state = self.inner.state.lock();
            let checked = if title.is_empty() {
                Err(TexnoteError::Validation(
                    "Please enter a title for your note.".to_string(),
                ))
            } else if state.document.is_blank() {
                Err(TexnoteError::Validation(
                    "Nothing to save. Please enter some content first.".to_string(),
                ))
            } else {
                state.session.clone().ok_or_else(|| {
                    TexnoteError::AuthRequired("Please log in to save notes.".to_string())
                })
            };
            let session = match checked {
                Ok(session) => session,
                Err(e) => {
                    drop(state);
                    return self.fail(None, e);
                }
            };
            state.saving = true;
            (
                session,
                state.document.note_id,
                state.document.text.clone(),
                state.document.revision,
                state.generation,
            )
        };

        let result = match note_id {
            Some(id) => {
                self.inner
                    .deps
                    .notes
                    .update(&session, id, &NoteUpdate::title_and_body(&title, &text))
                    .await
            }
            None => {
                self.inner
                    .deps
                    .notes
                    .create(&session, &NewNote::new(&title, &text))
                    .await
            }
        };
        self.inner.state.lock().saving = false;

        let note = match result {
            Ok(note) => note,
            Err(e) => return self.fail(Some("Failed to save note: "), e),
        };

        {
            let mut state = self.inner.state.lock();
            if state.generation == generation {
                state.document.note_id = Some(note.id);
                state.document.title = note.title.clone();
                if state.document.revision == revision {
                    state.document.dirty = false;
                }
                let message = if note_id.is_some() {
                    "Note updated successfully!"
                } else {
                    "Note saved successfully!"
                };
                state.set_status(StatusKind::Success, message);
            } else {
                debug!("Note {} saved after the editor moved on", note.id);
            }
        }
        info!("Saved note {} ({})", note.id, note.title);

        let _ = self.refresh_notes().await;
        Ok(note)
    }

    /// Save under the current title, or one derived from the text
    pub async fn save_suggested(&self) -> Result<Note> {
        let title = {
            let state = self.inner.state.lock();
            if state.document.title.trim().is_empty() {
                suggest_title(&state.document.text)
            } else {
                state.document.title.clone()
            }
        };
        self.save(&title).await
    }

    /// Push the buffer to the loaded note
    ///
    /// Does nothing unless signed in, the text is non-blank and the note
    /// already exists. Never creates a note. Returns whether an update was
    /// sent.
    pub async fn auto_save(&self) -> Result<bool> {
        let (session, id, update, revision, generation) = {
            let state = self.inner.state.lock();
            let (Some(session), Some(id)) = (state.session.clone(), state.document.note_id) else {
                return Ok(false);
            };
            if state.document.is_blank() {
                return Ok(false);
            }
            (
                session,
                id,
                NoteUpdate::title_and_body(&state.document.title, &state.document.text),
                state.document.revision,
                state.generation,
            )
        };

        debug!("Auto-saving note {}", id);
        let note = match self.inner.deps.notes.update(&session, id, &update).await {
            Ok(note) => note,
            Err(e) => {
                warn!("Auto-save error: {}", e);
                return Err(e);
            }
        };

        let mut state = self.inner.state.lock();
        if state.generation != generation || state.document.note_id != Some(id) {
            debug!("Auto-save of {} finished after the editor moved on", id);
            return Ok(true);
        }
        if state.document.revision == revision {
            state.document.dirty = false;
        }
        if let Some(cached) = state.notes.iter_mut().find(|n| n.id == id) {
            *cached = note;
        }
        Ok(true)
    }

    /// Re-fetch the signed-in user's notes
    pub async fn refresh_notes(&self) -> Result<Vec<Note>> {
        let Some(session) = self.inner.state.lock().session.clone() else {
            return Ok(Vec::new());
        };

        match self.inner.deps.notes.list(&session).await {
            Ok(notes) => {
                let mut state = self.inner.state.lock();
                let still_signed_in = state
                    .session
                    .as_ref()
                    .is_some_and(|s| s.user.id == session.user.id);
                if still_signed_in {
                    state.notes = notes.clone();
                }
                Ok(notes)
            }
            Err(e) => {
                self.inner.state.lock().notes.clear();
                warn!("Error loading notes: {}", e);
                self.fail_as("Failed to load notes. Please try again.".to_string(), e)
            }
        }
    }

    /// Replace the editor contents with `note`
    pub fn load(&self, note: &Note) {
        let old = {
            let mut state = self.inner.state.lock();
            state.document = EditorDocument::from_note(note);
            state.autocomplete.reset();
            state.generation += 1;
            state.set_status(StatusKind::Success, format!("Loaded note: {}", note.title));
            state.artifact.take()
        };
        self.inner.autosave.cancel();
        if let Some(old) = old {
            self.release(&old);
        }
        info!("Loaded note {}", note.id);
    }

    /// Fetch a note by id and load it
    pub async fn open(&self, id: NoteId) -> Result<Note> {
        let session = self.require_session("Please log in to open notes.")?;
        match self.inner.deps.notes.get(&session, id).await {
            Ok(note) => {
                self.load(&note);
                Ok(note)
            }
            Err(e) => self.fail(Some("Failed to open note: "), e),
        }
    }

    /// Delete a note; resets the editor when it was the loaded one
    pub async fn delete(&self, id: NoteId) -> Result<()> {
        let session = self.require_session("Please log in to delete notes.")?;
        if let Err(e) = self.inner.deps.notes.delete(&session, id).await {
            return self.fail(Some("Failed to delete note: "), e);
        }

        let was_current = self.inner.state.lock().document.note_id == Some(id);
        if was_current {
            self.reset_document();
        }
        info!("Deleted note {}", id);
        let _ = self.refresh_notes().await;
        self.report(StatusKind::Success, "Note deleted successfully.");
        Ok(())
    }

    /// Delete the loaded note
    pub async fn delete_current(&self) -> Result<()> {
        let current = self.inner.state.lock().document.note_id;
        match current {
            Some(id) => self.delete(id).await,
            None => self.fail(
                Some("Failed to delete note: "),
                TexnoteError::NotFound("no note is loaded".to_string()),
            ),
        }
    }

    /// Start a new note
    ///
    /// `confirm` is asked only when there is text to lose; returns whether
    /// the editor was cleared.
    pub fn clear(&self, confirm: impl FnOnce() -> bool) -> bool {
        let blank = self.inner.state.lock().document.is_blank();
        if !blank && !confirm() {
            return false;
        }
        self.reset_document();
        if self.is_authenticated() {
            self.report(StatusKind::Success, "Ready to create a new note!");
        } else {
            self.report(StatusKind::Info, "Please log in to save your notes.");
        }
        true
    }

    /// Load the starter template as a new, unsaved note
    pub fn load_example(&self) {
        self.reset_document();
        {
            let mut state = self.inner.state.lock();
            state.document.set_text(STARTER_TEMPLATE.to_string());
            state.document.dirty = false;
        }
        self.report(
            StatusKind::Success,
            "Example content loaded. Click \"Compile PDF\" to see the result.",
        );
    }

    /// Release the preview and stop pending work
    pub fn shutdown(&self) {
        self.inner.autosave.cancel();
        let old = self.inner.state.lock().artifact.take();
        if let Some(old) = old {
            self.release(&old);
        }
    }

    fn reset_document(&self) {
        let old = {
            let mut state = self.inner.state.lock();
            state.document = EditorDocument::new();
            state.autocomplete.reset();
            state.generation += 1;
            state.status = None;
            state.artifact.take()
        };
        self.inner.autosave.cancel();
        if let Some(old) = old {
            self.release(&old);
        }
    }

    fn release(&self, handle: &ArtifactHandle) {
        if let Err(e) = self.inner.deps.artifacts.release(handle) {
            warn!("Failed to release preview {}: {}", handle.id, e);
        }
    }

    fn require_session(&self, message: &str) -> Result<Session> {
        let session = self.inner.state.lock().session.clone();
        match session {
            Some(session) => Ok(session),
            None => self.fail(None, TexnoteError::AuthRequired(message.to_string())),
        }
    }

    fn report(&self, kind: StatusKind, text: &str) {
        self.inner.state.lock().set_status(kind, text);
    }

    /// Record `err` as the status message and hand it back
    fn fail<T>(&self, prefix: Option<&str>, err: TexnoteError) -> Result<T> {
        let text = format!("{}{}", prefix.unwrap_or(""), err);
        warn!("{}", text);
        self.fail_as(text, err)
    }

    fn fail_as<T>(&self, text: String, err: TexnoteError) -> Result<T> {
        self.inner.state.lock().set_status(StatusKind::Error, text);
        Err(err)
    }

    // ---- accessors --------------------------------------------------------

    pub fn text(&self) -> String {
        self.inner.state.lock().document.text.clone()
    }

    pub fn caret(&self) -> usize {
        self.inner.state.lock().document.caret
    }

    pub fn document(&self) -> EditorDocument {
        self.inner.state.lock().document.clone()
    }

    pub fn note_id(&self) -> Option<NoteId> {
        self.inner.state.lock().document.note_id
    }

    pub fn title(&self) -> String {
        self.inner.state.lock().document.title.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state.lock().document.dirty
    }

    pub fn notes(&self) -> Vec<Note> {
        self.inner.state.lock().notes.clone()
    }

    pub fn autocomplete(&self) -> AutocompleteState {
        self.inner.state.lock().autocomplete.state().clone()
    }

    pub fn artifact(&self) -> Option<ArtifactHandle> {
        self.inner.state.lock().artifact.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.lock().session.as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().session.is_some()
    }

    pub fn is_compiling(&self) -> bool {
        self.inner.state.lock().compiling
    }

    pub fn is_saving(&self) -> bool {
        self.inner.state.lock().saving
    }

    pub fn autosave_pending(&self) -> bool {
        self.inner.autosave.is_pending()
    }

    /// Current status message, if it has not expired
    pub fn status(&self) -> Option<StatusMessage> {
        let ttl = self.inner.options.status_ttl;
        self.inner
            .state
            .lock()
            .status
            .clone()
            .filter(|s| s.issued_at.elapsed() < ttl)
    }
}

async fn pump_auth_events(mut subscription: AuthSubscription, weak: Weak<Inner>) {
    while let Some(event) = subscription.recv().await {
        let Some(inner) = weak.upgrade() else {
            break;
        };
        EditorSession { inner }.handle_auth_event(event).await;
    }
    debug!("Auth listener stopped");
}
