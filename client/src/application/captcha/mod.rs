// Captcha-gated requests: a guarded client that suspends any call into a
// shared challenge coordinator and replays it once the captcha is solved

pub mod coordinator;
pub mod guarded_client;
pub mod image_registry;
pub mod key_extraction;

#[cfg(test)]
pub mod test_support;

pub use coordinator::{ChallengeCoordinator, ChallengeTicket, RetryFn, SubmitOutcome};
pub use guarded_client::GuardedClient;
pub use image_registry::ImageRegistry;
pub use key_extraction::{extract_challenge_key, key_from_payload};

use serde::Deserialize;

/// Wire constants and limits for the captcha protocol
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaptchaPolicy {
    /// Status the back office reserves for "solve a captcha, then retry"
    pub challenge_status: u16,
    pub image_path: String,
    pub solve_path: String,
    /// Challenge rounds allowed for one logical request
    pub max_rounds: u32,
}

impl Default for CaptchaPolicy {
    fn default() -> Self {
        Self {
            challenge_status: 501,
            image_path: "/custom/captcha".to_string(),
            solve_path: "/custom/login".to_string(),
            max_rounds: 3,
        }
    }
}
