//! Auth state changes pushed by the identity provider

mod common;

use common::{settle, Harness, EMAIL, PASSWORD};
use std::time::Duration;
use texnote_core::services::memory::StoreCall;
use texnote_core::{AuthEvent, IdentityProvider};

#[tokio::test]
async fn test_signed_in_event_fetches_listing() {
    let h = Harness::new();
    let listener = h.editor.listen_for_auth_changes();
    assert!(listener.is_active());

    // Sign in behind the editor's back, as another window would
    let session = h.identity.sign_in(EMAIL, PASSWORD).await.unwrap();
    h.notes.insert(&session, "Shared", "\\section{Shared}");
    settle().await;

    assert!(h.editor.is_authenticated());
    assert_eq!(h.editor.user().unwrap().id, session.user.id);
    assert_eq!(h.editor.notes().len(), 1);
    assert_eq!(h.notes.count(|c| matches!(c, StoreCall::List)), 1);
}

#[tokio::test]
async fn test_signed_out_event_clears_cached_notes() {
    let (h, session) = Harness::signed_in().await;
    let _listener = h.editor.listen_for_auth_changes();
    let note = h.notes.insert(&session, "Private", "\\section{Private}");
    h.editor.refresh_notes().await.unwrap();
    h.editor.load(&note);

    h.identity.push_event(AuthEvent::SignedOut);
    settle().await;

    assert!(!h.editor.is_authenticated());
    assert!(h.editor.notes().is_empty());
    assert!(h.editor.note_id().is_none());
    assert_eq!(h.editor.title(), "");
}

#[tokio::test]
async fn test_sign_in_with_listener_fetches_once() {
    let h = Harness::new();
    let _listener = h.editor.listen_for_auth_changes();

    h.editor.sign_in(EMAIL, PASSWORD).await.unwrap();
    settle().await;

    assert!(h.editor.is_authenticated());
    assert_eq!(h.notes.count(|c| matches!(c, StoreCall::List)), 1);
}

#[tokio::test]
async fn test_sign_up_with_listener_fetches_once() {
    let h = Harness::new();
    let _listener = h.editor.listen_for_auth_changes();

    h.editor
        .sign_up("grace@example.com", "cobol1959")
        .await
        .unwrap()
        .unwrap();
    settle().await;

    assert_eq!(h.notes.count(|c| matches!(c, StoreCall::List)), 1);
    assert_eq!(h.editor.status().unwrap().text, "Account created.");
}

#[tokio::test]
async fn test_repeated_signed_in_refetches_listing() {
    let (h, session) = Harness::signed_in().await;
    assert_eq!(h.notes.count(|c| matches!(c, StoreCall::List)), 1);

    // Another window saved a note and the provider re-announced the session
    h.notes.insert(&session, "Elsewhere", "\\section{Elsewhere}");
    h.editor
        .handle_auth_event(AuthEvent::SignedIn(session.clone()))
        .await;

    assert_eq!(h.notes.count(|c| matches!(c, StoreCall::List)), 2);
    assert_eq!(h.editor.notes()[0].title, "Elsewhere");
}

#[tokio::test]
async fn test_pushed_signed_in_for_held_session_refetches() {
    let (h, session) = Harness::signed_in().await;
    let _listener = h.editor.listen_for_auth_changes();

    h.identity.push_event(AuthEvent::SignedIn(session));
    settle().await;

    assert_eq!(h.notes.count(|c| matches!(c, StoreCall::List)), 2);
}

#[tokio::test]
async fn test_unsubscribed_listener_ignores_events() {
    let h = Harness::new();
    let listener = h.editor.listen_for_auth_changes();
    listener.unsubscribe();

    h.identity.sign_in(EMAIL, PASSWORD).await.unwrap();
    settle().await;

    assert!(!h.editor.is_authenticated());
    assert!(h.notes.calls().is_empty());
}

#[tokio::test]
async fn test_listener_stops_when_editor_dropped() {
    let h = Harness::new();
    let listener = h.editor.listen_for_auth_changes();
    let identity = h.identity.clone();
    drop(h);

    identity.push_event(AuthEvent::SignedOut);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!listener.is_active());
}

#[tokio::test]
async fn test_init_resumes_existing_session() {
    let h = Harness::new();
    let session = h.identity.sign_in(EMAIL, PASSWORD).await.unwrap();
    h.notes.insert(&session, "Resumed", "x");

    h.editor.init().await;

    assert!(h.editor.is_authenticated());
    assert_eq!(h.editor.notes()[0].title, "Resumed");
}

#[tokio::test]
async fn test_sign_out_through_editor() {
    let (h, _) = Harness::signed_in().await;
    h.editor.set_text("\\section{A}");
    h.editor.save("A").await.unwrap();

    h.editor.sign_out().await.unwrap();

    assert!(!h.editor.is_authenticated());
    assert!(h.editor.note_id().is_none());
    assert_eq!(h.editor.status().unwrap().text, "Logged out successfully.");
    assert!(h.identity.current_session().await.unwrap().is_none());
}
