//! Supabase-backed identity provider and notes store
//!
//! Talks to the project's GoTrue auth endpoints (`/auth/v1/*`) and to the
//! PostgREST API for the `notes` table (`/rest/v1/notes`). Row-level
//! security on the table scopes every query to the bearer's user.

use super::{AuthEventBus, AuthSubscription, IdentityProvider, NotesStore};
use crate::config::TexnoteConfig;
use crate::error::{Result, TexnoteError};
use crate::types::{AuthEvent, BearerToken, NewNote, Note, NoteId, NoteUpdate, Session, User};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection settings shared by the auth and notes clients
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, without trailing slash
    pub url: String,
    /// Public anon key
    pub anon_key: Arc<SecretString>,
    pub timeout: Duration,
}

impl SupabaseConfig {
    pub fn from_config(config: &TexnoteConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: Arc::clone(&config.supabase_anon_key),
            timeout: config.request_timeout(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }
}

/// GoTrue error bodies use several shapes depending on endpoint and version
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Best human-readable message from an error body
pub(crate) fn backend_error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error_description.or(b.msg).or(b.message).or(b.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("Request failed with status {}", status)
            } else {
                body.to_string()
            }
        })
}

async fn ensure_success(response: Response, service: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = backend_error_message(&body, status);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TexnoteError::AuthRequired(message)),
        _ => Err(TexnoteError::collaborator(service, message)),
    }
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|secs| Utc::now() + ChronoDuration::seconds(secs)));
        Session {
            user: self.user,
            access_token: BearerToken::new(self.access_token),
            refresh_token: self.refresh_token.map(BearerToken::new),
            expires_at,
        }
    }
}

/// GoTrue identity provider
pub struct SupabaseAuth {
    config: SupabaseConfig,
    client: reqwest::Client,
    session: RwLock<Option<Session>>,
    events: AuthEventBus,
}

impl SupabaseAuth {
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let client = config.client()?;
        Ok(Self {
            config,
            client,
            session: RwLock::new(None),
            events: AuthEventBus::default(),
        })
    }

    /// Adopt a session obtained earlier (e.g. persisted by the CLI)
    pub fn restore(&self, session: Session) {
        *self.session.write() = Some(session);
    }

    fn public(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.config.anon_key.expose_secret();
        builder.header("apikey", key).bearer_auth(key)
    }

    async fn token_request<T: Serialize + ?Sized>(&self, grant_type: &str, body: &T) -> Result<Session> {
        let url = self.config.endpoint("/auth/v1/token");
        debug!("POST {} (grant_type={})", url, grant_type);

        let response = self
            .public(self.client.post(&url))
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await?;
        let token: TokenResponse = ensure_success(response, "identity").await?.json().await?;
        Ok(token.into_session())
    }

    async fn refresh(&self, refresh_token: &BearerToken) -> Result<Session> {
        #[derive(Serialize)]
        struct Refresh<'a> {
            refresh_token: &'a str,
        }
        self.token_request(
            "refresh_token",
            &Refresh {
                refresh_token: refresh_token.expose(),
            },
        )
        .await
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>> {
        let url = self.config.endpoint("/auth/v1/signup");
        debug!("POST {}", url);

        let response = self
            .public(self.client.post(&url))
            .json(&Credentials { email, password })
            .send()
            .await?;
        let body: serde_json::Value = ensure_success(response, "identity").await?.json().await?;

        // With email confirmation enabled the backend returns only the user
        if body.get("access_token").is_none() {
            info!("Sign-up for {} awaiting email confirmation", email);
            return Ok(None);
        }
        let session = serde_json::from_value::<TokenResponse>(body)?.into_session();
        *self.session.write() = Some(session.clone());
        self.events.publish(AuthEvent::SignedIn(session.clone()));
        Ok(Some(session))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self
            .token_request("password", &Credentials { email, password })
            .await?;
        info!("Signed in as {}", session.user.email.as_deref().unwrap_or(&session.user.id));

        *self.session.write() = Some(session.clone());
        self.events.publish(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        let current = self.session.write().take();
        if let Some(session) = current {
            let url = self.config.endpoint("/auth/v1/logout");
            debug!("POST {}", url);
            let response = self
                .client
                .post(&url)
                .header("apikey", self.config.anon_key.expose_secret())
                .bearer_auth(session.access_token.expose())
                .send()
                .await?;
            // An already-invalid token still counts as signed out locally
            if let Err(e) = ensure_success(response, "identity").await {
                warn!("Logout request failed: {}", e);
            }
        }
        self.events.publish(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        let current = self.session.read().clone();
        let Some(session) = current else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            *self.session.write() = None;
            return Ok(None);
        };
        match self.refresh(&refresh_token).await {
            Ok(fresh) => {
                debug!("Refreshed expired session");
                *self.session.write() = Some(fresh.clone());
                Ok(Some(fresh))
            }
            Err(e) => {
                warn!("Session refresh failed: {}", e);
                *self.session.write() = None;
                self.events.publish(AuthEvent::SignedOut);
                Ok(None)
            }
        }
    }

    async fn reset_password(&self, email: &str) -> Result<()> {
        #[derive(Serialize)]
        struct Recover<'a> {
            email: &'a str,
        }
        let url = self.config.endpoint("/auth/v1/recover");
        debug!("POST {}", url);

        let response = self
            .public(self.client.post(&url))
            .json(&Recover { email })
            .send()
            .await?;
        ensure_success(response, "identity").await?;
        info!("Password reset requested for {}", email);
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    #[serde(flatten)]
    note: &'a NewNote,
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct PatchRow<'a> {
    #[serde(flatten)]
    update: &'a NoteUpdate,
    updated_at: DateTime<Utc>,
}

/// PostgREST notes store
pub struct SupabaseNotes {
    config: SupabaseConfig,
    client: reqwest::Client,
}

impl SupabaseNotes {
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let client = config.client()?;
        Ok(Self { config, client })
    }

    fn table(&self) -> String {
        self.config.endpoint("/rest/v1/notes")
    }

    fn authorized(&self, builder: RequestBuilder, session: &Session) -> Result<RequestBuilder> {
        let token = session.access_token.expose();
        if token.is_empty() || session.is_expired() {
            return Err(TexnoteError::AuthRequired(
                "Authentication required. Please log in.".to_string(),
            ));
        }
        Ok(builder
            .header("apikey", self.config.anon_key.expose_secret())
            .bearer_auth(token))
    }

    async fn rows(&self, builder: RequestBuilder, session: &Session) -> Result<Vec<Note>> {
        let response = self.authorized(builder, session)?.send().await?;
        Ok(ensure_success(response, "notes").await?.json().await?)
    }
}

fn first_row(rows: Vec<Note>, id: impl std::fmt::Display) -> Result<Note> {
    rows.into_iter()
        .next()
        .ok_or_else(|| TexnoteError::NotFound(id.to_string()))
}

#[async_trait]
impl NotesStore for SupabaseNotes {
    async fn create(&self, session: &Session, note: &NewNote) -> Result<Note> {
        debug!("POST {}", self.table());
        let builder = self
            .client
            .post(self.table())
            .header("Prefer", "return=representation")
            .json(&[InsertRow {
                note,
                user_id: &session.user.id,
            }]);
        first_row(self.rows(builder, session).await?, "new note")
    }

    async fn update(&self, session: &Session, id: NoteId, update: &NoteUpdate) -> Result<Note> {
        debug!("PATCH {} id={}", self.table(), id);
        let builder = self
            .client
            .patch(self.table())
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&PatchRow {
                update,
                updated_at: Utc::now(),
            });
        first_row(self.rows(builder, session).await?, id)
    }

    async fn list(&self, session: &Session) -> Result<Vec<Note>> {
        debug!("GET {}", self.table());
        let builder = self.client.get(self.table()).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", session.user.id)),
            ("order", "updated_at.desc".to_string()),
        ]);
        self.rows(builder, session).await
    }

    async fn get(&self, session: &Session, id: NoteId) -> Result<Note> {
        debug!("GET {} id={}", self.table(), id);
        let builder = self
            .client
            .get(self.table())
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]);
        first_row(self.rows(builder, session).await?, id)
    }

    async fn delete(&self, session: &Session, id: NoteId) -> Result<()> {
        debug!("DELETE {} id={}", self.table(), id);
        let builder = self
            .client
            .delete(self.table())
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation");
        first_row(self.rows(builder, session).await?, id).map(|_| ())
    }
}
