use serde::{Deserialize, Serialize};

/// Which step of a challenge is in flight; governs which controls are enabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengePhase {
    #[default]
    Idle,
    LoadingImage,
    SubmittingSolution,
}

impl ChallengePhase {
    pub fn is_busy(&self) -> bool {
        !matches!(self, ChallengePhase::Idle)
    }
}
