//! Shared helper functions for CLI commands
//!
//! Session persistence between invocations, wiring an [`EditorSession`]
//! to the HTTP collaborators, and reading input from files or stdin.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use texnote_core::{
    error::{Result, TexnoteError},
    services::{
        CompileClient, CompileConfig, DirArtifactStore, SupabaseAuth, SupabaseConfig,
        SupabaseNotes,
    },
    BearerToken, EditorSession, IdentityProvider, Session, SessionDeps, SessionOptions,
    TexnoteConfig, User,
};
use tracing::{debug, warn};

/// Where the signed-in session is kept (`$XDG_DATA_HOME/texnote/session.json`)
pub fn session_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("texnote")
        .join("session.json")
}

/// Scratch directory for rendered previews
pub fn preview_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("texnote")
        .join("previews")
}

/// On-disk form of a [`Session`]
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredSession {
    pub user: User,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            user: session.user.clone(),
            access_token: session.access_token.expose().to_string(),
            refresh_token: session.refresh_token.as_ref().map(|t| t.expose().to_string()),
            expires_at: session.expires_at,
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            user: stored.user,
            access_token: BearerToken::new(stored.access_token),
            refresh_token: stored.refresh_token.map(BearerToken::new),
            expires_at: stored.expires_at,
        }
    }
}

pub fn load_session(path: &Path) -> Result<Option<Session>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let stored: StoredSession = serde_json::from_str(&raw)?;
    Ok(Some(stored.into()))
}

pub fn store_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&StoredSession::from(session))?;
    std::fs::write(path, json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    debug!("Stored session at {}", path.display());
    Ok(())
}

pub fn forget_session(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// A session controller talking to the configured backends
pub struct Backend {
    pub editor: EditorSession,
    pub auth: Arc<SupabaseAuth>,
}

impl Backend {
    /// Wire up the HTTP collaborators and resume any stored session
    pub async fn connect(config: &TexnoteConfig) -> Result<Self> {
        let supabase = SupabaseConfig::from_config(config)?;
        let auth = Arc::new(SupabaseAuth::new(supabase.clone())?);
        if let Some(session) = load_session(&session_path())? {
            auth.restore(session);
        }

        let editor = EditorSession::new(
            SessionDeps {
                identity: auth.clone(),
                notes: Arc::new(SupabaseNotes::new(supabase)?),
                compiler: Arc::new(CompileClient::new(CompileConfig::from(config))?),
                artifacts: Arc::new(DirArtifactStore::new(preview_dir())?),
            },
            SessionOptions::from(config),
        );
        editor.init().await;

        Ok(Self { editor, auth })
    }

    /// Fail unless a session is active
    pub fn require_login(&self) -> Result<User> {
        self.editor.user().ok_or_else(|| {
            TexnoteError::AuthRequired("Not logged in. Run `texnote login` first.".to_string())
        })
    }

    /// Persist the identity provider's current session, which may have been
    /// refreshed during this run
    pub async fn persist(&self) -> Result<()> {
        match self.auth.current_session().await {
            Ok(Some(session)) => store_session(&session_path(), &session),
            Ok(None) => forget_session(&session_path()),
            Err(e) => {
                warn!("Could not read session to persist: {}", e);
                Ok(())
            }
        }
    }
}

/// Read a document from `path`, or stdin for `None` / `-`
pub fn read_source(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => Ok(std::fs::read_to_string(p)?),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// Password from the flag/env value, or a line from stdin
pub fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    eprint!("Password: ");
    std::io::Write::flush(&mut std::io::stderr())?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Ask a yes/no question on stderr
pub fn confirm(prompt: &str) -> bool {
    eprint!("{} [y/N]: ", prompt);
    if std::io::Write::flush(&mut std::io::stderr()).is_err() {
        return false;
    }
    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("y")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        assert!(load_session(&path).unwrap().is_none());

        let mut session = Session::new(
            User {
                id: "user-1".into(),
                email: Some("ada@example.com".into()),
            },
            BearerToken::new("access"),
        );
        session.refresh_token = Some(BearerToken::new("refresh"));
        store_session(&path, &session).unwrap();

        let loaded = load_session(&path).unwrap().unwrap();
        assert_eq!(loaded.user, session.user);
        assert_eq!(loaded.access_token.expose(), "access");
        assert_eq!(loaded.refresh_token.unwrap().expose(), "refresh");

        forget_session(&path).unwrap();
        assert!(!path.exists());
        forget_session(&path).unwrap();
    }
}
