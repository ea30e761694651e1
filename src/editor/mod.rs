//! The editor core
//!
//! - [`catalog`]: the LaTeX command vocabulary
//! - [`autocomplete`]: trigger detection, filtering and candidate insertion
//! - [`debounce`]: trailing-edge debouncer used for auto-save
//! - [`document`]: the text buffer and the note it belongs to
//! - [`session`]: the controller tying these to the external services

pub mod autocomplete;
pub mod catalog;
pub mod debounce;
pub mod document;
pub mod session;

pub use autocomplete::{AutocompleteEngine, AutocompleteState, Key, KeyOutcome, Splice};
pub use catalog::CommandCatalog;
pub use debounce::{debounce, Debouncer};
pub use document::{suggest_title, EditorDocument, STARTER_TEMPLATE};
pub use session::{
    AuthListener, EditorSession, SessionDeps, SessionOptions, StatusKind, StatusMessage,
};
