use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body carried by a challenge-required response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeKeyPayload {
    pub key: String,
}

/// Request for a fresh captcha image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaImageRequest {
    pub key: String,
}

/// Solution submitted for an open challenge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveChallengeRequest {
    pub key: String,
    /// The back office names this field `captcha`
    #[serde(rename = "captcha")]
    pub solution: String,
}

/// Verdict on a submitted solution.
///
/// Anything other than an explicit `ok: false` counts as acceptance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveChallengeResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub error: Option<SolveFailureKind>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SolveChallengeResponse {
    pub fn is_rejected(&self) -> bool {
        self.ok == Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveFailureKind {
    InvalidCaptcha,
    InvalidCredentials,
    #[serde(other)]
    Unknown,
}

/// Every report endpoint takes the same body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRequest {
    pub period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

/// One stored portal login as listed by `GET /usersession`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalUser {
    pub user: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// `GET /usersession` body: portal logins grouped by portal key
pub type PortalSessions = BTreeMap<String, Vec<PortalUser>>;

/// Portal login stored server-side and used when a captcha is solved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalCredentials {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Numbers come back either as JSON numbers or preformatted strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    pub fn as_f64(&self) -> f64 {
        match self {
            Amount::Number(n) => *n,
            Amount::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Number(n) => write!(f, "{:.2}", n),
            Amount::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstSummaryRow {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "GST Type")]
    pub gst_type: String,
    #[serde(rename = "Invoice Type")]
    pub invoice_type: String,
    #[serde(rename = "Taxable Value")]
    pub taxable_value: Amount,
    #[serde(rename = "CGST")]
    pub cgst: Amount,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GstGenerateResponse {
    #[serde(default)]
    pub summary: Option<Vec<GstSummaryRow>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageCompanyStats {
    #[serde(default)]
    pub amt: Option<Amount>,
    #[serde(default)]
    pub filed: Option<Amount>,
    #[serde(default)]
    pub not_filed: Option<Amount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DamageStatsResponse {
    #[serde(default)]
    pub stats: Option<BTreeMap<String, DamageCompanyStats>>,
}
