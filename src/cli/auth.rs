//! Account commands: login, logout, signup, reset-password

use super::helpers::{self, Backend};
use texnote_core::{error::Result, StatusMessage, TexnoteConfig};
use tracing::info;

fn print_status(status: Option<StatusMessage>) {
    if let Some(status) = status {
        println!("{}", status.text);
    }
}

/// Handle `texnote login`
pub async fn login(config: &TexnoteConfig, email: &str, password: Option<String>) -> Result<()> {
    let password = helpers::read_password(password)?;
    let backend = Backend::connect(config).await?;

    let user = backend.editor.sign_in(email, &password).await?;
    backend.persist().await?;

    info!("Signed in as {}", user.id);
    println!(
        "✓ Logged in as {}",
        user.email.as_deref().unwrap_or(user.id.as_str())
    );
    println!("  {} note(s) available", backend.editor.notes().len());
    Ok(())
}

/// Handle `texnote signup`
pub async fn signup(config: &TexnoteConfig, email: &str, password: Option<String>) -> Result<()> {
    let password = helpers::read_password(password)?;
    let backend = Backend::connect(config).await?;

    backend.editor.sign_up(email, &password).await?;
    backend.persist().await?;
    print_status(backend.editor.status());
    Ok(())
}

/// Handle `texnote logout`
pub async fn logout(config: &TexnoteConfig) -> Result<()> {
    let backend = Backend::connect(config).await?;
    if backend.editor.is_authenticated() {
        backend.editor.sign_out().await?;
    }
    helpers::forget_session(&helpers::session_path())?;
    println!("✓ Logged out");
    Ok(())
}

/// Handle `texnote reset-password`
pub async fn reset_password(config: &TexnoteConfig, email: &str) -> Result<()> {
    let backend = Backend::connect(config).await?;
    backend.editor.reset_password(email).await?;
    print_status(backend.editor.status());
    Ok(())
}
