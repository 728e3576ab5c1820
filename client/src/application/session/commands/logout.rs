use tracing::debug;

use crate::application::ports::HttpTransport;
use crate::domain::RequestDescriptor;

/// Best effort; the local session is dropped either way
pub async fn execute(transport: &dyn HttpTransport) {
    if let Err(e) = transport.send(&RequestDescriptor::post("/logout")).await {
        debug!(error = %e, "logout request failed");
    }
}
