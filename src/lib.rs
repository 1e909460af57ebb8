//! Content pipeline for a technical blog.
//!
//! Stored posts are HTML produced from a typed rich-text [`domain::document::Document`].
//! On the way out, stored HTML is post-processed for display and its embeds
//! are resolved per instance.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
