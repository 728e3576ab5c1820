use thiserror::Error;

use crate::domain::Payload;

/// Failure of a back-office call as seen by the code that issued it
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },

    #[error("server responded with status {status}{}", status_suffix(.payload))]
    Status { status: u16, payload: Payload },

    #[error("session expired, log in again")]
    Unauthorized { payload: Payload },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("captcha cancelled")]
    Cancelled,

    #[error("request was challenged {rounds} times in a row, giving up")]
    ChallengeLimit { rounds: u32 },

    #[error("captcha challenge was dropped before it settled")]
    Abandoned,

    #[error("{0}")]
    Precondition(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// The user declined the captcha, as opposed to something breaking
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            ApiError::Status { payload, .. } | ApiError::Unauthorized { payload } => Some(payload),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

fn status_suffix(payload: &Payload) -> String {
    server_message(payload)
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

pub(crate) fn server_message(payload: &Payload) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<String>,
    }

    let body: ErrorBody = payload.decode_json().ok()?;
    body.message.or(body.error)
}
