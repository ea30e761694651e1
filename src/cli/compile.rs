//! `texnote compile`: render a document to PDF through the compile service

use super::helpers::{self, Backend};
use anyhow::Context;
use std::path::{Path, PathBuf};
use texnote_core::{
    error::{Result, TexnoteError},
    TexnoteConfig,
};
use tracing::debug;

/// Output path next to the input, or `document.pdf` for stdin
fn default_output(file: Option<&Path>) -> PathBuf {
    match file {
        Some(p) if p != Path::new("-") => p.with_extension("pdf"),
        _ => PathBuf::from("document.pdf"),
    }
}

/// Handle `texnote compile`
pub async fn handle(
    config: &TexnoteConfig,
    file: Option<PathBuf>,
    note: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let backend = Backend::connect(config).await?;
    backend.require_login()?;

    match note {
        Some(id) => {
            let id = texnote_core::NoteId::from_string(&id)
                .map_err(|_| TexnoteError::Validation(format!("Not a valid note ID: {}", id)))?;
            backend.editor.open(id).await?;
        }
        None => backend.editor.set_text(helpers::read_source(file.as_deref())?),
    }

    let result = backend.editor.compile().await;
    let written = match result {
        Ok(Some(handle)) => {
            let output = output.unwrap_or_else(|| default_output(file.as_deref()));
            match &handle.path {
                Some(path) => {
                    debug!("Copying preview {} to {}", path.display(), output.display());
                    std::fs::copy(path, &output)
                        .with_context(|| format!("Failed to write {}", output.display()))
                        .map(|_| (output, handle.size))
                        .map_err(TexnoteError::from)
                }
                None => Err(anyhow::anyhow!("Compiled PDF was not written to disk").into()),
            }
        }
        Ok(None) => Err(anyhow::anyhow!("Compile result was discarded").into()),
        Err(e) => Err(e),
    };
    backend.editor.shutdown();
    backend.persist().await?;

    let (output, size) = written?;
    if let Some(status) = backend.editor.status() {
        println!("{}", status.text);
    }
    println!("✓ Wrote {} ({} bytes)", output.display(), size);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Some(Path::new("notes/paper.tex"))),
            PathBuf::from("notes/paper.pdf")
        );
        assert_eq!(default_output(None), PathBuf::from("document.pdf"));
        assert_eq!(
            default_output(Some(Path::new("-"))),
            PathBuf::from("document.pdf")
        );
    }
}
