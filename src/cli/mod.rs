//! CLI command handlers
//!
//! Each subcommand group is implemented in its own module. Network commands
//! all go through an [`texnote_core::EditorSession`] built by
//! [`helpers::Backend`].

pub mod auth;
pub mod compile;
pub mod complete;
pub mod helpers;
pub mod notes;
