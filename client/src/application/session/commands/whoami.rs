use shared::protocol::{SessionUser, WhoAmIResponse};

use crate::application::ports::HttpTransport;
use crate::domain::RequestDescriptor;
use crate::error::ApiError;

/// Returns the logged-in user, or `None` when the cookie is missing or stale
pub async fn execute(transport: &dyn HttpTransport) -> Result<Option<SessionUser>, ApiError> {
    let response = transport.send(&RequestDescriptor::get("/me")).await?;
    let me: WhoAmIResponse = response.decode()?;
    Ok(me.user.filter(|_| me.authenticated))
}
