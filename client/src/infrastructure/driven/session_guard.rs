use std::sync::Mutex;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::warn;

use crate::application::ports::SessionGuard;
use crate::domain::RequestDescriptor;

pub const LOGIN_PATH: &str = "/login";

/// Sends the user back to the login page when the session expires,
/// remembering where they were
#[derive(Default)]
pub struct LoginRedirectGuard {
    last_redirect: Mutex<Option<String>>,
}

impl LoginRedirectGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent redirect target, if a 401 has been seen
    pub fn last_redirect(&self) -> Option<String> {
        self.last_redirect
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
    }
}

/// `None` when the request already targets the login page
pub fn redirect_target(location: &str) -> Option<String> {
    if location == LOGIN_PATH || location.starts_with("/login?") {
        return None;
    }
    Some(format!(
        "{}?next={}",
        LOGIN_PATH,
        utf8_percent_encode(location, NON_ALPHANUMERIC)
    ))
}

impl SessionGuard for LoginRedirectGuard {
    fn on_unauthorized(&self, request: &RequestDescriptor) {
        let Some(target) = redirect_target(&request.path) else {
            return;
        };
        warn!(request = %request, redirect = %target, "session expired, log in again");
        if let Ok(mut slot) = self.last_redirect.lock() {
            *slot = Some(target);
        }
    }
}
