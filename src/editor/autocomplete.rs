//! LaTeX command autocomplete
//!
//! Drives the suggestion dropdown:
//! - Backward scan from the caret to find the trigger marker
//! - Case-insensitive substring filtering against the command catalog
//! - Keyboard navigation of the candidate list
//! - Splicing the chosen candidate into the text
//!
//! The engine never owns the text buffer. It reads the text it is handed
//! and returns a [`Splice`] describing the edit; the session applies it.
//! Offsets are UTF-8 byte offsets.

use super::catalog::{CommandCatalog, TRIGGER_MARKER};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Upper bound on candidates shown at once
pub const MAX_CANDIDATES: usize = 10;

/// Characters that end the backward scan without a trigger
const STOP_CHARS: [char; 3] = ['{', '}', '$'];

/// Placeholder pairs the caret jumps into after an apply
const PLACEHOLDERS: [&str; 2] = ["{}", "[]"];

/// Keys the engine reacts to while active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Tab,
    Escape,
    /// Anything else; autocomplete state is left alone
    Other,
}

/// Snapshot of the dropdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutocompleteState {
    pub active: bool,
    /// Matching commands, catalog order, at most [`MAX_CANDIDATES`]
    pub candidates: Vec<String>,
    /// `None` means no explicit selection
    pub selected: Option<usize>,
    /// Where the trigger marker sits in the text
    pub trigger_offset: usize,
    /// `text[trigger_offset..caret]`
    pub search_term: String,
}

/// Text edit produced by applying a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    /// Full text after the edit
    pub text: String,
    /// Caret after the edit
    pub caret: usize,
    /// Span of the original text that was replaced
    pub replaced: Range<usize>,
    /// Candidate that was inserted
    pub inserted: String,
}

/// Result of feeding a key to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not consumed; the host handles the key normally
    Ignored,
    /// Selection moved
    Moved(Option<usize>),
    /// A candidate was inserted
    Applied(Splice),
    /// Dropdown closed without inserting
    Dismissed,
}

impl KeyOutcome {
    /// Whether the host should swallow the key
    pub fn consumed(&self) -> bool {
        !matches!(self, KeyOutcome::Ignored)
    }
}

/// Find the trigger marker governing `caret`
///
/// Scans backward from `caret - 1`, stopping at whitespace, braces or `$`.
/// Returns `None` when the caret is out of range or off a char boundary.
pub fn detect_trigger(text: &str, caret: usize) -> Option<usize> {
    let before = text.get(..caret)?;
    for (idx, ch) in before.char_indices().rev() {
        if ch == TRIGGER_MARKER {
            return Some(idx);
        }
        if ch.is_whitespace() || STOP_CHARS.contains(&ch) {
            return None;
        }
    }
    None
}

/// Caret offset inside `candidate` for its first empty placeholder pair
pub fn placeholder_offset(candidate: &str) -> Option<usize> {
    PLACEHOLDERS
        .iter()
        .filter_map(|pair| candidate.find(pair))
        .min()
        .map(|at| at + 1)
}

/// Autocomplete state machine
pub struct AutocompleteEngine {
    catalog: Arc<CommandCatalog>,
    state: AutocompleteState,
    /// Caret seen by the last detection
    caret: usize,
    /// (text length, caret) produced by the last apply; detection there
    /// stays inactive until the text or caret moves
    suppressed: Option<(usize, usize)>,
}

impl Default for AutocompleteEngine {
    fn default() -> Self {
        Self::new(Arc::new(CommandCatalog::default()))
    }
}

impl AutocompleteEngine {
    pub fn new(catalog: Arc<CommandCatalog>) -> Self {
        Self {
            catalog,
            state: AutocompleteState::default(),
            caret: 0,
            suppressed: None,
        }
    }

    pub fn state(&self) -> &AutocompleteState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Caret the current state was computed for
    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn catalog(&self) -> &Arc<CommandCatalog> {
        &self.catalog
    }

    /// Re-run trigger detection after the text or caret changed
    pub fn check(&mut self, text: &str, caret: usize) -> &AutocompleteState {
        if let Some(mark) = self.suppressed.take() {
            if mark == (text.len(), caret) {
                self.suppressed = Some(mark);
                self.deactivate();
                return &self.state;
            }
        }

        let Some(offset) = detect_trigger(text, caret) else {
            self.deactivate();
            return &self.state;
        };

        let term = &text[offset..caret];
        if term.is_empty() {
            self.deactivate();
            return &self.state;
        }

        let candidates = self.catalog.filter(term, MAX_CANDIDATES);
        if candidates.is_empty() {
            self.deactivate();
            return &self.state;
        }

        self.caret = caret;
        self.state = AutocompleteState {
            active: true,
            candidates,
            selected: None,
            trigger_offset: offset,
            search_term: term.to_string(),
        };
        &self.state
    }

    /// Feed a key press; only acts while active
    pub fn handle_key(&mut self, key: Key, text: &str) -> KeyOutcome {
        if !self.state.active {
            return KeyOutcome::Ignored;
        }

        match key {
            Key::Down => {
                let last = self.state.candidates.len().saturating_sub(1);
                let next = match self.state.selected {
                    None => 0,
                    Some(i) => (i + 1).min(last),
                };
                self.state.selected = Some(next);
                KeyOutcome::Moved(self.state.selected)
            }
            Key::Up => {
                self.state.selected = match self.state.selected {
                    None | Some(0) => None,
                    Some(i) => Some(i - 1),
                };
                KeyOutcome::Moved(self.state.selected)
            }
            Key::Enter | Key::Tab => {
                let index = self.state.selected.unwrap_or(0);
                let Some(candidate) = self.state.candidates.get(index).cloned() else {
                    return KeyOutcome::Ignored;
                };
                match self.apply(&candidate, text) {
                    Some(splice) => KeyOutcome::Applied(splice),
                    None => KeyOutcome::Dismissed,
                }
            }
            Key::Escape => {
                self.deactivate();
                KeyOutcome::Dismissed
            }
            Key::Other => KeyOutcome::Ignored,
        }
    }

    /// Replace `text[trigger_offset..caret]` with `candidate`
    ///
    /// Deactivates in every case. Returns `None` when nothing is active or
    /// the recorded span no longer fits `text`.
    pub fn apply(&mut self, candidate: &str, text: &str) -> Option<Splice> {
        let was_active = self.state.active;
        let start = self.state.trigger_offset;
        let end = self.caret;
        self.deactivate();

        if !was_active || start > end || text.get(start..end).is_none() {
            return None;
        }

        let mut spliced = String::with_capacity(text.len() - (end - start) + candidate.len());
        spliced.push_str(&text[..start]);
        spliced.push_str(candidate);
        spliced.push_str(&text[end..]);

        let caret = start + placeholder_offset(candidate).unwrap_or(candidate.len());
        self.suppressed = Some((spliced.len(), caret));
        debug!("Applied completion {} at {}..{}", candidate, start, end);

        Some(Splice {
            text: spliced,
            caret,
            replaced: start..end,
            inserted: candidate.to_string(),
        })
    }

    /// Close the dropdown without applying
    pub fn deactivate(&mut self) {
        self.state = AutocompleteState::default();
    }

    /// Forget everything, including apply suppression
    pub fn reset(&mut self) {
        self.deactivate();
        self.caret = 0;
        self.suppressed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine() -> AutocompleteEngine {
        AutocompleteEngine::default()
    }

    #[test]
    fn test_doc_prefix_matches_documentclass_only() {
        let mut engine = engine();
        let state = engine.check("\\doc", 4).clone();

        assert!(state.active);
        assert_eq!(state.trigger_offset, 0);
        assert_eq!(state.search_term, "\\doc");
        assert!(state.candidates.iter().all(|c| c.starts_with("\\documentclass")));
        assert!(state.candidates.contains(&"\\documentclass{article}".to_string()));
        assert!(!state.candidates.contains(&"\\maketitle".to_string()));
        assert_eq!(state.selected, None);
    }

    #[test]
    fn test_bare_marker_shows_first_ten() {
        let mut engine = engine();
        let state = engine.check("\\", 1).clone();

        assert!(state.active);
        assert_eq!(state.candidates.len(), MAX_CANDIDATES);
        assert_eq!(state.candidates, engine.catalog().entries()[..10].to_vec());
    }

    #[test]
    fn test_stop_characters_block_trigger() {
        let mut engine = engine();
        for text in ["\\frac{ab", "\\sec tion", "$x", "\\a}b", "plain"] {
            assert!(!engine.check(text, text.len()).active, "{text}");
        }
    }

    #[test]
    fn test_trigger_mid_document() {
        let mut engine = engine();
        let text = "Some text \\sec more";
        let state = engine.check(text, 14).clone();
        assert!(state.active);
        assert_eq!(state.trigger_offset, 10);
        assert_eq!(state.search_term, "\\sec");
    }

    #[test]
    fn test_no_match_is_inactive() {
        let mut engine = engine();
        assert!(!engine.check("\\zzz", 4).active);
    }

    #[test]
    fn test_bad_caret_is_inactive() {
        let mut engine = engine();
        assert!(!engine.check("\\doc", 99).active);
        // 'é' is two bytes; offset 2 splits it
        assert!(!engine.check("\\é", 2).active);
        assert!(!engine.check("", 0).active);
    }

    #[test]
    fn test_navigation_bounds() {
        let mut engine = engine();
        engine.check("\\doc", 4);
        let count = engine.state().candidates.len();
        assert_eq!(count, 3);

        assert_eq!(engine.handle_key(Key::Up, "\\doc"), KeyOutcome::Moved(None));
        assert_eq!(engine.handle_key(Key::Down, "\\doc"), KeyOutcome::Moved(Some(0)));
        for _ in 0..5 {
            engine.handle_key(Key::Down, "\\doc");
        }
        assert_eq!(engine.state().selected, Some(count - 1));
        engine.handle_key(Key::Up, "\\doc");
        assert_eq!(engine.state().selected, Some(count - 2));
    }

    #[test]
    fn test_enter_without_selection_applies_first() {
        let mut engine = engine();
        engine.check("\\doc", 4);
        match engine.handle_key(Key::Enter, "\\doc") {
            KeyOutcome::Applied(splice) => {
                assert_eq!(splice.text, "\\documentclass{article}");
                assert_eq!(splice.caret, splice.text.len());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!engine.is_active());
    }

    #[test]
    fn test_tab_applies_selected() {
        let mut engine = engine();
        engine.check("\\doc", 4);
        engine.handle_key(Key::Down, "\\doc");
        engine.handle_key(Key::Down, "\\doc");
        match engine.handle_key(Key::Tab, "\\doc") {
            KeyOutcome::Applied(splice) => assert_eq!(splice.inserted, "\\documentclass{report}"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_escape_dismisses() {
        let mut engine = engine();
        engine.check("\\doc", 4);
        assert_eq!(engine.handle_key(Key::Escape, "\\doc"), KeyOutcome::Dismissed);
        assert!(!engine.is_active());
        assert_eq!(engine.handle_key(Key::Enter, "\\doc"), KeyOutcome::Ignored);
    }

    #[test]
    fn test_other_key_leaves_state() {
        let mut engine = engine();
        engine.check("\\doc", 4);
        let before = engine.state().clone();
        assert_eq!(engine.handle_key(Key::Other, "\\doc"), KeyOutcome::Ignored);
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_apply_frac_places_caret_in_first_brace() {
        let mut engine = engine();
        engine.check("\\frac", 5);
        let splice = engine.apply("\\frac{}{}", "\\frac").unwrap();
        assert_eq!(splice.text, "\\frac{}{}");
        assert_eq!(splice.caret, 6);
        assert_eq!(splice.replaced, 0..5);
    }

    #[test]
    fn test_apply_preserves_surroundings() {
        let mut engine = engine();
        let text = "a \\tex b";
        engine.check(text, 6);
        let splice = engine.apply("\\textbf{}", text).unwrap();
        assert_eq!(splice.text, "a \\textbf{} b");
        assert_eq!(splice.caret, 10);
    }

    #[test]
    fn test_apply_square_placeholder_first() {
        assert_eq!(placeholder_offset("\\usepackage[]{}"), Some(12));
        assert_eq!(placeholder_offset("\\usepackage{}"), Some(12));
        assert_eq!(placeholder_offset("\\maketitle"), None);
    }

    #[test]
    fn test_apply_when_inactive_is_none() {
        let mut engine = engine();
        assert!(engine.apply("\\item", "text").is_none());
    }

    #[test]
    fn test_recheck_after_apply_is_inactive() {
        let mut engine = engine();
        engine.check("\\maket", 6);
        let splice = engine.apply("\\maketitle", "\\maket").unwrap();
        assert!(!engine.check(&splice.text, splice.caret).active);
        assert!(!engine.check(&splice.text, splice.caret).active);

        // Typing on lifts the suppression
        let typed = format!("{}\\s", splice.text);
        assert!(engine.check(&typed, typed.len()).active);
    }

    proptest! {
        #[test]
        fn prop_no_marker_means_inactive(text in "[a-z {}$]{0,40}", cut in 0usize..41) {
            let mut engine = engine();
            let caret = cut.min(text.len());
            prop_assert!(!engine.check(&text, caret).active);
        }

        #[test]
        fn prop_candidates_are_filtered_catalog(term in "\\\\[a-zA-Z]{0,4}") {
            let mut engine = engine();
            let expected: Vec<String> = engine
                .catalog()
                .entries()
                .iter()
                .filter(|e| e.to_lowercase().contains(&term.to_lowercase()))
                .take(MAX_CANDIDATES)
                .cloned()
                .collect();
            let state = engine.check(&term, term.len()).clone();
            prop_assert_eq!(state.active, !expected.is_empty());
            prop_assert_eq!(state.candidates, expected);
        }

        #[test]
        fn prop_apply_replaces_exact_span(prefix in "[a-z ]{0,10}", term in "\\\\[a-z]{0,3}", suffix in "[ a-z]{0,10}") {
            let mut engine = engine();
            let text = format!("{prefix}{term}{suffix}");
            let caret = prefix.len() + term.len();
            if engine.check(&text, caret).active {
                let offset = engine.state().trigger_offset;
                let candidate = engine.state().candidates[0].clone();
                let splice = engine.apply(&candidate, &text).unwrap();
                prop_assert_eq!(splice.replaced.clone(), offset..caret);
                prop_assert_eq!(splice.text.len(), text.len() - (caret - offset) + candidate.len());
                prop_assert!(splice.text.starts_with(&text[..offset]));
                prop_assert!(splice.text.ends_with(&text[caret..]));
                prop_assert!(!engine.check(&splice.text, splice.caret).active);
            }
        }
    }
}
