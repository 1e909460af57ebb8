//! Domain layer types and invariants.

pub mod document;
pub mod embeds;
pub mod error;
