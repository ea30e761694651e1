//! Command autocomplete, standalone and through the editor session

mod common;

use common::Harness;
use texnote_core::editor::catalog::DEFAULT_COMMANDS;
use texnote_core::editor::AutocompleteEngine;
use texnote_core::{Key, KeyOutcome};

#[test]
fn test_doc_prefix_matches_documentclass_only() {
    let mut engine = AutocompleteEngine::default();
    let state = engine.check("\\doc", 4);

    assert!(state.active);
    assert_eq!(state.search_term, "\\doc");
    assert!(state
        .candidates
        .contains(&"\\documentclass{article}".to_string()));
    assert!(state.candidates.iter().all(|c| c.starts_with("\\documentclass")));
    assert!(!state.candidates.contains(&"\\maketitle".to_string()));
}

#[test]
fn test_bare_marker_offers_first_ten_commands() {
    let mut engine = AutocompleteEngine::default();
    let state = engine.check("\\", 1);

    assert!(state.active);
    assert_eq!(state.trigger_offset, 0);
    assert_eq!(state.selected, None);
    assert_eq!(state.candidates, DEFAULT_COMMANDS[..10].to_vec());
}

#[test]
fn test_frac_apply_places_caret_in_first_braces() {
    let mut engine = AutocompleteEngine::default();
    engine.check("\\frac", 5);

    let splice = engine.apply("\\frac{}{}", "\\frac").unwrap();
    assert_eq!(splice.text, "\\frac{}{}");
    assert_eq!(splice.caret, 6);
    assert_eq!(splice.replaced, 0..5);
    assert!(!engine.is_active());
    assert!(!engine.check(&splice.text, splice.caret).active);
}

#[test]
fn test_apply_without_placeholder_puts_caret_after_candidate() {
    let text = "Intro \\maket and more";
    let mut engine = AutocompleteEngine::default();
    engine.check(text, 12);

    let splice = engine.apply("\\maketitle", text).unwrap();
    assert_eq!(splice.text, "Intro \\maketitle and more");
    assert_eq!(splice.caret, 16);
}

#[test]
fn test_stop_characters_block_trigger() {
    let mut engine = AutocompleteEngine::default();
    assert!(!engine.check("\\sec tion", 9).active);
    assert!(!engine.check("\\frac{ab", 8).active);
    assert!(!engine.check("\\x}y", 4).active);
    assert!(!engine.check("\\al$x", 5).active);
    assert!(engine.check("$\\al", 4).active);
}

#[test]
fn test_caret_out_of_range_is_inactive() {
    let mut engine = AutocompleteEngine::default();
    assert!(!engine.check("\\sec", 40).active);
    assert!(!engine.check("", 0).active);
}

#[test]
fn test_key_navigation_bounds() {
    let mut engine = AutocompleteEngine::default();
    let text = "\\doc";
    let count = engine.check(text, 4).candidates.len();
    assert!(count >= 2);

    assert_eq!(engine.handle_key(Key::Up, text), KeyOutcome::Moved(None));
    for _ in 0..count + 3 {
        engine.handle_key(Key::Down, text);
    }
    assert_eq!(engine.state().selected, Some(count - 1));

    engine.handle_key(Key::Up, text);
    assert_eq!(engine.state().selected, Some(count - 2));

    assert_eq!(engine.handle_key(Key::Other, text), KeyOutcome::Ignored);
    assert!(engine.is_active());

    assert_eq!(engine.handle_key(Key::Escape, text), KeyOutcome::Dismissed);
    assert!(!engine.is_active());
    assert_eq!(engine.handle_key(Key::Enter, text), KeyOutcome::Ignored);
}

#[test]
fn test_tab_applies_selected_candidate() {
    let mut engine = AutocompleteEngine::default();
    let text = "\\doc";
    let second = engine.check(text, 4).candidates[1].clone();

    engine.handle_key(Key::Down, text);
    engine.handle_key(Key::Down, text);
    match engine.handle_key(Key::Tab, text) {
        KeyOutcome::Applied(splice) => assert_eq!(splice.inserted, second),
        other => panic!("expected an apply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_session_keystrokes_drive_autocomplete() {
    let h = Harness::new();

    let state = h.editor.input("\\begin{document}\n\\sec", 21);
    assert!(state.active);
    assert_eq!(state.trigger_offset, 17);

    assert_eq!(h.editor.key(Key::Down), KeyOutcome::Moved(Some(0)));
    let outcome = h.editor.key(Key::Enter);
    assert!(outcome.consumed());

    assert_eq!(h.editor.text(), "\\begin{document}\n\\section{}");
    assert_eq!(h.editor.caret(), 26);
    assert!(!h.editor.autocomplete().active);
}

#[tokio::test]
async fn test_session_pointer_choice() {
    let h = Harness::new();
    h.editor.input("x \\tex", 6);

    let splice = h.editor.choose_candidate("\\textbf{}").unwrap();
    assert_eq!(splice.text, "x \\textbf{}");
    assert_eq!(h.editor.caret(), 10);
    assert!(h.editor.choose_candidate("\\textbf{}").is_none());
}

#[tokio::test]
async fn test_session_caret_past_end_finds_no_trigger() {
    let h = Harness::new();

    let state = h.editor.input("\\doc", 99);
    assert!(!state.active);
    assert!(!h.editor.autocomplete().active);
    assert_eq!(h.editor.caret(), 4);
    assert_eq!(h.editor.key(Key::Enter), KeyOutcome::Ignored);
    assert_eq!(h.editor.text(), "\\doc");
}

#[tokio::test]
async fn test_session_caret_inside_character_finds_no_trigger() {
    let h = Harness::new();

    // "é" is two bytes; offset 2 falls between them
    let state = h.editor.input("\\é\\sec", 2);
    assert!(!state.active);
    assert!(h.editor.set_caret(7).active);
}

#[tokio::test]
async fn test_replacing_text_closes_dropdown() {
    let h = Harness::new();
    assert!(h.editor.input("\\sec", 4).active);

    h.editor.set_text("plain text");

    assert!(!h.editor.autocomplete().active);
    assert_eq!(h.editor.key(Key::Enter), KeyOutcome::Ignored);
    assert_eq!(h.editor.text(), "plain text");
}
