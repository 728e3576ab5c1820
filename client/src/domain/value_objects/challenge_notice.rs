use std::fmt;

/// Dialog-level message shown while a challenge stays open.
///
/// Each kind renders differently so the user can tell a typo apart from
/// portal credentials that need fixing in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeNotice {
    InvalidCaptcha(Option<String>),
    InvalidCredentials(Option<String>),
    Rejected(String),
    ImageUnavailable(String),
    SubmissionFailed(String),
}

impl ChallengeNotice {
    pub fn is_recoverable_rejection(&self) -> bool {
        matches!(
            self,
            ChallengeNotice::InvalidCaptcha(_)
                | ChallengeNotice::InvalidCredentials(_)
                | ChallengeNotice::Rejected(_)
        )
    }
}

impl fmt::Display for ChallengeNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeNotice::InvalidCaptcha(Some(msg)) => write!(f, "{}", msg),
            ChallengeNotice::InvalidCaptcha(None) => {
                write!(f, "Invalid captcha, please try again")
            }
            ChallengeNotice::InvalidCredentials(Some(msg)) => {
                write!(f, "{} (update the portal login under configuration)", msg)
            }
            ChallengeNotice::InvalidCredentials(None) => write!(
                f,
                "Portal rejected the stored credentials; update them under configuration"
            ),
            ChallengeNotice::Rejected(msg) => write!(f, "{}", msg),
            ChallengeNotice::ImageUnavailable(msg) => {
                write!(f, "Failed to load captcha: {}", msg)
            }
            ChallengeNotice::SubmissionFailed(msg) => write!(f, "{}", msg),
        }
    }
}
