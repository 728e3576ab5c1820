// In-memory transport fake for multi-step captcha flows

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, watch};

use crate::application::ports::HttpTransport;
use crate::domain::{ApiResponse, ChallengeKey, ChallengeView, Payload, RequestDescriptor};
use crate::error::ApiError;

enum Scripted {
    Ready(Result<ApiResponse, ApiError>),
    Gated(Result<ApiResponse, ApiError>, oneshot::Receiver<()>),
}

/// Answers each path from its own FIFO of canned responses and records
/// every request it sees
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    sent: Mutex<Vec<RequestDescriptor>>,
    completed: Mutex<HashMap<String, usize>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(self: Arc<Self>, path: &str, response: Result<ApiResponse, ApiError>) -> Arc<Self> {
        self.push(path, Scripted::Ready(response));
        self
    }

    /// The response is held back until the returned sender fires or drops
    pub fn respond_gated(
        self: Arc<Self>,
        path: &str,
        response: Result<ApiResponse, ApiError>,
    ) -> (Arc<Self>, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        self.push(path, Scripted::Gated(response, rx));
        (self, tx)
    }

    pub fn sent(&self) -> Vec<RequestDescriptor> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, path: &str) -> Vec<RequestDescriptor> {
        self.sent().into_iter().filter(|r| r.path == path).collect()
    }

    /// Waits until `count` requests to `path` have been issued, answered or not
    pub async fn wait_for_sent(&self, path: &str, count: usize) {
        poll_until(|| self.sent_to(path).len() >= count, "timed out waiting for scripted requests")
            .await;
    }

    pub async fn wait_for_completed(&self, path: &str, count: usize) {
        poll_until(
            || self.completed.lock().unwrap().get(path).copied().unwrap_or(0) >= count,
            "timed out waiting for scripted calls",
        )
        .await;
    }

    fn push(&self, path: &str, scripted: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(scripted);
    }
}

async fn poll_until(mut done: impl FnMut() -> bool, message: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect(message);
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse, ApiError> {
        self.sent.lock().unwrap().push(request.clone());
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.path)
            .and_then(|queue| queue.pop_front());

        let result = match next {
            Some(Scripted::Ready(result)) => result,
            Some(Scripted::Gated(result, gate)) => {
                let _ = gate.await;
                result
            }
            None => Err(ApiError::Transport {
                path: request.path.clone(),
                message: "no scripted response left".to_string(),
            }),
        };

        *self
            .completed
            .lock()
            .unwrap()
            .entry(request.path.clone())
            .or_default() += 1;
        result
    }
}

pub fn key(k: &str) -> ChallengeKey {
    ChallengeKey::new(k).unwrap()
}

pub fn image_response(bytes: &'static [u8]) -> ApiResponse {
    ApiResponse::binary(200, bytes).with_header("Content-Type", "image/png")
}

pub fn solve_response(body: serde_json::Value) -> ApiResponse {
    ApiResponse::json(200, body)
}

pub fn challenge_required(k: &str) -> ApiError {
    ApiError::Status {
        status: 501,
        payload: Payload::Json(json!({ "key": k })),
    }
}

pub async fn wait_until(
    views: &mut watch::Receiver<ChallengeView>,
    predicate: impl FnMut(&ChallengeView) -> bool,
) -> ChallengeView {
    let view = tokio::time::timeout(Duration::from_secs(5), views.wait_for(predicate))
        .await
        .expect("timed out waiting for captcha view")
        .expect("coordinator dropped");
    (*view).clone()
}
