// Driven port - outbound HTTP to the back office

use async_trait::async_trait;

use crate::domain::{ApiResponse, RequestDescriptor};
use crate::error::ApiError;

/// Issues one request, no retries.
///
/// Non-2xx responses come back as `ApiError::Status`, 401 as
/// `ApiError::Unauthorized`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse, ApiError>;
}
