//! Application services: codec, editor, display processing and embeds.

pub mod codec;
pub mod content;
pub mod editor;
pub mod embeds;
pub mod error;
