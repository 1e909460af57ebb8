use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{codec::DocumentError, embeds::EmbedError},
    infra::error::InfraError,
};

/// Flattened error chain, outermost message first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Short description of the failing subsystem, for operator output.
    pub fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Document(_) => "Input could not be processed",
            AppError::Infra(InfraError::Configuration { .. }) => "Misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure",
            AppError::Embed(_) => "Embeds could not be resolved",
            AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_walks_the_source_chain() {
        let io = std::io::Error::other("disk on fire");
        let error = AppError::from(InfraError::Io(io));
        let report = error.report();
        assert_eq!(report.messages.first().map(String::as_str), Some("io error: disk on fire"));
        assert_eq!(error.presentation_message(), "I/O failure");
    }

    #[test]
    fn invalid_documents_are_input_errors() {
        let error = AppError::from(
            crate::application::codec::document_from_json("not json").expect_err("invalid"),
        );
        assert_eq!(error.presentation_message(), "Input could not be processed");
    }
}
