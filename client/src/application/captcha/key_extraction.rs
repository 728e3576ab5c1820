use shared::protocol::ChallengeKeyPayload;

use crate::domain::{ChallengeKey, Payload};
use crate::error::ApiError;

/// Returns the challenge key when `error` is the reserved challenge signal
/// and its body carries one. Anything else yields `None` so the caller
/// propagates the original error.
pub fn extract_challenge_key(error: &ApiError, challenge_status: u16) -> Option<ChallengeKey> {
    match error {
        ApiError::Status { status, payload } if *status == challenge_status => {
            key_from_payload(payload)
        }
        _ => None,
    }
}

/// Normalizes structured and binary bodies into one key
pub fn key_from_payload(payload: &Payload) -> Option<ChallengeKey> {
    let body: ChallengeKeyPayload = payload.decode_json().ok()?;
    ChallengeKey::new(body.key).ok()
}
