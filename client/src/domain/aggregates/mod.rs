pub mod challenge_session;

pub use challenge_session::{ChallengeSession, ChallengeView};
