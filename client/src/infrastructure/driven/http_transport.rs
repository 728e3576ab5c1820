use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::application::ports::{HttpTransport, SessionGuard};
use crate::domain::{ApiResponse, HttpMethod, Payload, RequestDescriptor, ResponseMode};
use crate::error::ApiError;

/// Talks to the back office with a cookie-carrying reqwest client
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    guard: Arc<dyn SessionGuard>,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, guard: Arc<dyn SessionGuard>) -> Result<Self, ApiError> {
        url::Url::parse(base_url)
            .map_err(|e| ApiError::Precondition(format!("invalid base url {}: {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Transport {
                path: base_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            guard,
        })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse, ApiError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, self.url_for(&request.path));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let transport_error = |e: reqwest::Error| ApiError::Transport {
            path: request.path.clone(),
            message: e.to_string(),
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!(request = %request, status, bytes = body.len(), "response received");
        classify(request, status, headers, body, self.guard.as_ref())
    }
}

/// Turns a raw response into the payload shape the caller asked for and
/// sorts it into success, expired session, or plain failure
fn classify(
    request: &RequestDescriptor,
    status: u16,
    headers: BTreeMap<String, String>,
    body: Bytes,
    guard: &dyn SessionGuard,
) -> Result<ApiResponse, ApiError> {
    let success = (200..300).contains(&status);
    let payload = decode_payload(request.response_mode, success, body)?;

    if status == 401 {
        warn!(request = %request, "session rejected");
        guard.on_unauthorized(request);
        return Err(ApiError::Unauthorized { payload });
    }
    if !success {
        return Err(ApiError::Status { status, payload });
    }

    Ok(ApiResponse {
        status,
        headers,
        payload,
    })
}

fn decode_payload(mode: ResponseMode, success: bool, body: Bytes) -> Result<Payload, ApiError> {
    match mode {
        ResponseMode::Binary => Ok(Payload::Binary(body)),
        ResponseMode::Json if body.is_empty() => Ok(Payload::Json(serde_json::Value::Null)),
        ResponseMode::Json => match serde_json::from_slice(&body) {
            Ok(value) => Ok(Payload::Json(value)),
            // Error pages are often HTML; keep them for the error message
            Err(_) if !success => Ok(Payload::Binary(body)),
            Err(e) => Err(ApiError::Decode(e.to_string())),
        },
    }
}
