//! In-process collaborators
//!
//! Stand-ins for the identity provider, notes store and compile service
//! that keep everything in memory and record each call, so the session
//! can be exercised without a network.

use super::{AuthEventBus, AuthSubscription, CompileService, IdentityProvider, NotesStore};
use crate::error::{Result, TexnoteError};
use crate::types::{AuthEvent, BearerToken, NewNote, Note, NoteId, NoteUpdate, Session, User};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// In-memory identity provider with password accounts
#[derive(Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, (String, User)>>,
    session: Mutex<Option<Session>>,
    events: AuthEventBus,
    resets: Mutex<Vec<String>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account up front
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.add_account(email, password);
        self
    }

    pub fn add_account(&self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
        };
        self.accounts
            .lock()
            .insert(email.to_string(), (password.to_string(), user.clone()));
        user
    }

    /// The live session, without going through the async trait
    pub fn active_session(&self) -> Option<Session> {
        self.session.lock().clone()
    }

    /// Emails a password reset was requested for
    pub fn reset_requests(&self) -> Vec<String> {
        self.resets.lock().clone()
    }

    /// Publish an event as if it came from elsewhere (another tab, expiry)
    pub fn push_event(&self, event: AuthEvent) {
        if let AuthEvent::SignedIn(session) = &event {
            *self.session.lock() = Some(session.clone());
        } else {
            *self.session.lock() = None;
        }
        self.events.publish(event);
    }

    fn open_session(&self, user: User) -> Session {
        let mut session = Session::new(user, BearerToken::new(format!("token-{}", Uuid::new_v4())));
        session.expires_at = Some(Utc::now() + ChronoDuration::hours(1));
        *self.session.lock() = Some(session.clone());
        self.events.publish(AuthEvent::SignedIn(session.clone()));
        session
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>> {
        if password.len() < 6 {
            return Err(TexnoteError::collaborator(
                "identity",
                "Password should be at least 6 characters",
            ));
        }
        if self.accounts.lock().contains_key(email) {
            return Err(TexnoteError::collaborator("identity", "User already registered"));
        }
        let user = self.add_account(email, password);
        Ok(Some(self.open_session(user)))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let user = match self.accounts.lock().get(email) {
            Some((stored, user)) if stored == password => user.clone(),
            _ => {
                return Err(TexnoteError::collaborator(
                    "identity",
                    "Invalid login credentials",
                ))
            }
        };
        Ok(self.open_session(user))
    }

    async fn sign_out(&self) -> Result<()> {
        *self.session.lock() = None;
        self.events.publish(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().clone().filter(|s| !s.is_expired()))
    }

    async fn reset_password(&self, email: &str) -> Result<()> {
        self.resets.lock().push(email.to_string());
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

/// A recorded notes store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create(String),
    Update(NoteId),
    List,
    Get(NoteId),
    Delete(NoteId),
}

/// In-memory notes store, scoped per user
#[derive(Default)]
pub struct MemoryNotesStore {
    notes: Mutex<HashMap<NoteId, Note>>,
    calls: Mutex<Vec<StoreCall>>,
    failure: Mutex<Option<String>>,
    update_delay: Mutex<Option<Duration>>,
    clock: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryNotesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn note(&self, id: NoteId) -> Option<Note> {
        self.notes.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.notes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.lock().is_empty()
    }

    /// Make every following call fail with `message` until cleared
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }

    /// Slow down updates, to exercise in-flight auto-saves
    pub fn delay_updates(&self, delay: Option<Duration>) {
        *self.update_delay.lock() = delay;
    }

    /// Seed a note owned by `session`'s user
    pub fn insert(&self, session: &Session, title: &str, content: &str) -> Note {
        let now = self.tick();
        let note = Note {
            id: NoteId::new(),
            title: title.to_string(),
            content: content.to_string(),
            latex_content: Some(content.to_string()),
            user_id: Some(session.user.id.clone()),
            created_at: now,
            updated_at: now,
        };
        self.notes.lock().insert(note.id, note.clone());
        note
    }

    /// Strictly increasing timestamps so list order is deterministic
    fn tick(&self) -> DateTime<Utc> {
        let mut clock = self.clock.lock();
        let now = Utc::now();
        let next = match *clock {
            Some(last) if now <= last => last + ChronoDuration::microseconds(1),
            _ => now,
        };
        *clock = Some(next);
        next
    }

    fn begin(&self, session: &Session, call: StoreCall) -> Result<()> {
        self.calls.lock().push(call);
        if session.access_token.expose().is_empty() || session.is_expired() {
            return Err(TexnoteError::AuthRequired(
                "Authentication required. Please log in.".to_string(),
            ));
        }
        if let Some(message) = self.failure.lock().clone() {
            return Err(TexnoteError::collaborator("notes", message));
        }
        Ok(())
    }

    fn owned(&self, session: &Session, id: NoteId) -> Result<Note> {
        self.notes
            .lock()
            .get(&id)
            .filter(|n| n.user_id.as_deref() == Some(session.user.id.as_str()))
            .cloned()
            .ok_or_else(|| TexnoteError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl NotesStore for MemoryNotesStore {
    async fn create(&self, session: &Session, note: &NewNote) -> Result<Note> {
        self.begin(session, StoreCall::Create(note.title.clone()))?;
        let now = self.tick();
        let stored = Note {
            id: NoteId::new(),
            title: note.title.clone(),
            content: note.content.clone(),
            latex_content: Some(note.latex_content.clone()),
            user_id: Some(session.user.id.clone()),
            created_at: now,
            updated_at: now,
        };
        self.notes.lock().insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, session: &Session, id: NoteId, update: &NoteUpdate) -> Result<Note> {
        self.begin(session, StoreCall::Update(id))?;
        let delay = *self.update_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut note = self.owned(session, id)?;
        if let Some(title) = &update.title {
            note.title = title.clone();
        }
        if let Some(content) = &update.content {
            note.content = content.clone();
        }
        if let Some(latex) = &update.latex_content {
            note.latex_content = Some(latex.clone());
        }
        note.updated_at = self.tick();
        self.notes.lock().insert(id, note.clone());
        Ok(note)
    }

    async fn list(&self, session: &Session) -> Result<Vec<Note>> {
        self.begin(session, StoreCall::List)?;
        let mut notes: Vec<Note> = self
            .notes
            .lock()
            .values()
            .filter(|n| n.user_id.as_deref() == Some(session.user.id.as_str()))
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    async fn get(&self, session: &Session, id: NoteId) -> Result<Note> {
        self.begin(session, StoreCall::Get(id))?;
        self.owned(session, id)
    }

    async fn delete(&self, session: &Session, id: NoteId) -> Result<()> {
        self.begin(session, StoreCall::Delete(id))?;
        self.owned(session, id)?;
        self.notes.lock().remove(&id);
        Ok(())
    }
}

/// Compile service that "renders" by prefixing a PDF header
#[derive(Default)]
pub struct MemoryCompiler {
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<String>>,
}

impl MemoryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources compiled so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }
}

#[async_trait]
impl CompileService for MemoryCompiler {
    async fn compile(&self, source: &str, credential: &BearerToken) -> Result<Vec<u8>> {
        self.calls.lock().push(source.to_string());
        if credential.expose().is_empty() {
            return Err(TexnoteError::AuthRequired(
                "Authentication required. Please log in.".to_string(),
            ));
        }
        if let Some(message) = self.failure.lock().clone() {
            return Err(TexnoteError::collaborator("compile", message));
        }
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend_from_slice(source.as_bytes());
        Ok(pdf)
    }
}
