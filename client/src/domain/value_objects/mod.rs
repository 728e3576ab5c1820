pub mod challenge_key;
pub mod challenge_notice;
pub mod challenge_phase;
pub mod period;

pub use challenge_key::ChallengeKey;
pub use challenge_notice::ChallengeNotice;
pub use challenge_phase::ChallengePhase;
pub use period::Period;
