//! Failure taxonomy for a single request.
//!
//! Only [`FetchError::InvalidInput`] ever reaches a caller of the
//! orchestrator; everything else is logged and turned into an absent result.

use thiserror::Error;

const MAX_BODY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    InvalidInput,
    Network,
    HttpStatus,
    Parse,
    MissingData,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request to {url} failed with status {status}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse {what} JSON: {message}")]
    Parse { what: &'static str, message: String },

    #[error("Response has no {what}")]
    MissingData { what: &'static str },
}

impl FetchError {
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn network<U: Into<String>, S: Into<String>>(url: U, message: S) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn http_status<U: Into<String>>(url: U, status: u16, body: &str) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            body: truncate_body(body),
        }
    }

    pub fn parse(what: &'static str, source: &serde_json::Error) -> Self {
        Self::Parse {
            what,
            message: source.to_string(),
        }
    }

    pub fn missing(what: &'static str) -> Self {
        Self::MissingData { what }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidInput { .. } => FetchErrorKind::InvalidInput,
            FetchError::Network { .. } => FetchErrorKind::Network,
            FetchError::HttpStatus { .. } => FetchErrorKind::HttpStatus,
            FetchError::Parse { .. } => FetchErrorKind::Parse,
            FetchError::MissingData { .. } => FetchErrorKind::MissingData,
        }
    }

    /// Status code of a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_BODY {
        let cut = (0..=MAX_BODY)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
