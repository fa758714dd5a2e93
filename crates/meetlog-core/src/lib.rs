//! # meetlog-core
//!
//! Core types, traits, and abstractions for the meetlog service.
//!
//! This crate provides the foundational data structures, the note
//! validation module, and the repository trait that other meetlog
//! crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, Result, ValidationErrors};
pub use models::{Note, NoteDraft};
pub use traits::{NoteFilter, NoteRepository};
pub use validation::{duration_minutes, is_valid_time, validate, ValidFields};
