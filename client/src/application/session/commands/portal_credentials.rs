use shared::protocol::{PortalCredentials, PortalSessions};
use tracing::info;

use crate::application::ports::HttpTransport;
use crate::domain::{Payload, RequestDescriptor};
use crate::error::ApiError;

const PATH: &str = "/usersession";

/// Every stored portal login, grouped by portal key
pub async fn fetch(transport: &dyn HttpTransport) -> Result<PortalSessions, ApiError> {
    let response = transport.send(&RequestDescriptor::get(PATH)).await?;
    if matches!(&response.payload, Payload::Json(value) if value.is_null()) {
        return Ok(PortalSessions::new());
    }
    Ok(response.decode()?)
}

/// Picks one login; a missing key or user falls back to the first one listed
pub fn select(
    sessions: &PortalSessions,
    key: Option<&str>,
    user: Option<&str>,
) -> Option<PortalCredentials> {
    let (key, users) = match key {
        Some(key) => sessions.get_key_value(key)?,
        None => sessions.iter().next()?,
    };
    let entry = match user {
        Some(user) => users.iter().find(|u| u.user == user)?,
        None => users.first()?,
    };

    Some(PortalCredentials {
        key: key.clone(),
        user: entry.user.clone(),
        username: entry.username.clone(),
        password: entry.password.clone(),
    })
}

/// Stores the portal login the back office uses when a captcha is solved
pub async fn update(
    transport: &dyn HttpTransport,
    credentials: &PortalCredentials,
) -> Result<(), ApiError> {
    if credentials.username.trim().is_empty() {
        return Err(ApiError::Precondition("Portal username is required".to_string()));
    }
    let request = RequestDescriptor::post_json(PATH, credentials).map_err(ApiError::Decode)?;
    transport.send(&request).await?;
    info!(key = %credentials.key, user = %credentials.user, "portal credentials updated");
    Ok(())
}
