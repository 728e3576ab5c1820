use serde::Deserialize;
use shared::protocol::{LoginRequest, LoginResponse, SessionUser};
use tracing::info;

use crate::application::ports::HttpTransport;
use crate::domain::RequestDescriptor;
use crate::error::ApiError;

pub async fn execute(
    transport: &dyn HttpTransport,
    username: &str,
    password: &str,
) -> Result<SessionUser, ApiError> {
    let body = LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    };
    let request = RequestDescriptor::post_json("/login", &body).map_err(ApiError::Decode)?;

    let response = match transport.send(&request).await {
        Ok(response) => response,
        Err(e) if rejected_credentials(&e) => return Err(ApiError::InvalidCredentials),
        Err(e) => return Err(e),
    };

    let login: LoginResponse = response.decode()?;
    let user = login.user.ok_or_else(|| {
        ApiError::Precondition(login.error.unwrap_or_else(|| "Login failed".to_string()))
    })?;

    info!(user = %user.username, "logged in");
    Ok(user)
}

fn rejected_credentials(error: &ApiError) -> bool {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        error: Option<String>,
    }

    error
        .payload()
        .and_then(|p| p.decode_json::<ErrorBody>().ok())
        .and_then(|body| body.error)
        .is_some_and(|code| code == "invalid_credentials")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockHttpTransport;
    use crate::domain::{ApiResponse, Payload};
    use serde_json::json;

    #[tokio::test]
    async fn test_login_returns_user() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.path == "/login"
                    && r.body == Some(json!({ "username": "asha", "password": "pw" }))
            })
            .times(1)
            .returning(|_| {
                Ok(ApiResponse::json(
                    200,
                    json!({ "user": { "id": 7, "username": "asha" } }),
                ))
            });

        let user = execute(&mock, "asha", "pw").await.unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.username, "asha");
    }

    #[tokio::test]
    async fn test_invalid_credentials_is_reported_as_such() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(|_| {
            Err(ApiError::Unauthorized {
                payload: Payload::Json(json!({ "error": "invalid_credentials" })),
            })
        });

        let err = execute(&mock, "asha", "wrong").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_missing_user_is_a_failed_login() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Ok(ApiResponse::json(200, json!({}))));

        let err = execute(&mock, "asha", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }
}
