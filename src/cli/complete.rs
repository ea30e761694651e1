//! `texnote complete`: offline command completion
//!
//! Runs the autocomplete engine over a piece of text, for editor
//! integrations that shell out.

use serde::Serialize;
use std::sync::Arc;
use texnote_core::{
    editor::AutocompleteEngine,
    error::{Result, TexnoteError},
    CommandCatalog,
};

#[derive(Debug, Serialize)]
struct Completion {
    active: bool,
    trigger_offset: usize,
    search_term: String,
    candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<Applied>,
}

#[derive(Debug, Serialize)]
struct Applied {
    text: String,
    caret: usize,
}

fn complete(
    catalog: Arc<CommandCatalog>,
    text: &str,
    caret: Option<usize>,
    apply: Option<usize>,
) -> Result<Completion> {
    let caret = caret.unwrap_or(text.len());
    let mut engine = AutocompleteEngine::new(catalog);
    let state = engine.check(text, caret).clone();

    let applied = match apply {
        Some(index) => {
            let candidate = state.candidates.get(index).ok_or_else(|| {
                TexnoteError::Validation(format!(
                    "No candidate at index {} ({} available)",
                    index,
                    state.candidates.len()
                ))
            })?;
            engine.apply(candidate, text).map(|splice| Applied {
                text: splice.text,
                caret: splice.caret,
            })
        }
        None => None,
    };

    Ok(Completion {
        active: state.active,
        trigger_offset: state.trigger_offset,
        search_term: state.search_term,
        candidates: state.candidates,
        applied,
    })
}

/// Handle `texnote complete`
pub fn handle(text: &str, caret: Option<usize>, apply: Option<usize>, json: bool) -> Result<()> {
    let completion = complete(Arc::new(CommandCatalog::default()), text, caret, apply)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&completion)?);
        return Ok(());
    }

    if let Some(applied) = &completion.applied {
        println!("{}", applied.text);
        eprintln!("caret: {}", applied.caret);
    } else if completion.active {
        for (i, candidate) in completion.candidates.iter().enumerate() {
            println!("{:>2}. {}", i, candidate);
        }
    } else {
        eprintln!("No completions");
    }
    Ok(())
}
