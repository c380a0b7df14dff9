use serde::{Deserialize, Serialize};

use crate::session::Session;

// ============================================================================
// Success envelopes
// ============================================================================

/// `{ "user": { ... } }` returned by login, register and me
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: Session,
}

/// Informational answer, e.g. from forgot/reset password
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Error envelope
// ============================================================================

/// Error body shape used by the remote service for 4xx/5xx answers
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Extract a human-readable message from an error response body, if any
pub fn error_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}
