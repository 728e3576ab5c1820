use futures_util::future::BoxFuture;
use serde::Serialize;
use shared::protocol::{
    CaptchaImageRequest, SolveChallengeRequest, SolveChallengeResponse, SolveFailureKind,
};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{oneshot, watch, Mutex};
use tracing::{debug, info, warn};

use super::image_registry::ImageRegistry;
use super::CaptchaPolicy;
use crate::application::ports::HttpTransport;
use crate::domain::{
    ApiResponse, ChallengeKey, ChallengeNotice, ChallengeSession, ChallengeView, Payload,
    RequestDescriptor,
};
use crate::error::ApiError;

pub type RetryFuture = BoxFuture<'static, Result<ApiResponse, ApiError>>;

/// Re-issues the interrupted request; never inspected by the coordinator
pub type RetryFn = Box<dyn FnOnce() -> RetryFuture + Send>;

type Settlement = oneshot::Sender<Result<ApiResponse, ApiError>>;

struct PendingChallenge {
    key: ChallengeKey,
    retry: RetryFn,
    settle: Settlement,
}

/// Resolves once with the replayed response, or with the failure that ended
/// the challenge
pub struct ChallengeTicket {
    rx: oneshot::Receiver<Result<ApiResponse, ApiError>>,
}

impl Future for ChallengeTicket {
    type Output = Result<ApiResponse, ApiError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|settled| settled.unwrap_or(Err(ApiError::Abandoned)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// No open challenge, or the dialog was busy
    Ignored,
    /// Wrong answer; a fresh image was requested under the same key
    Rejected(ChallengeNotice),
    /// The solve call itself failed; dialog stays open
    Failed,
    /// The challenge moved on while the submission was in flight
    Stale,
    Accepted { retried_ok: bool },
}

#[derive(Default)]
struct CoordinatorState {
    session: ChallengeSession,
    active: Option<PendingChallenge>,
    /// Set between a programmatic close and the end of the replay
    retrying: bool,
    queue: VecDeque<PendingChallenge>,
    images: ImageRegistry,
}

/// Process-wide captcha dialog state.
///
/// One challenge is open at a time; challenges raised meanwhile wait in FIFO
/// order. The state lock is never held across a network call.
pub struct ChallengeCoordinator {
    transport: Arc<dyn HttpTransport>,
    policy: CaptchaPolicy,
    state: Mutex<CoordinatorState>,
    view_tx: watch::Sender<ChallengeView>,
}

impl ChallengeCoordinator {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: CaptchaPolicy) -> Arc<Self> {
        let (view_tx, _) = watch::channel(ChallengeView::default());
        Arc::new(Self {
            transport,
            policy,
            state: Mutex::new(CoordinatorState::default()),
            view_tx,
        })
    }

    pub fn policy(&self) -> &CaptchaPolicy {
        &self.policy
    }

    pub fn subscribe(&self) -> watch::Receiver<ChallengeView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> ChallengeView {
        self.view_tx.borrow().clone()
    }

    pub async fn live_images(&self) -> usize {
        self.state.lock().await.images.live_count()
    }

    pub async fn queued(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    /// Registers a challenge and returns without waiting for the user.
    ///
    /// If another challenge is open the new one is queued behind it.
    pub async fn challenge(self: &Arc<Self>, key: ChallengeKey, retry: RetryFn) -> ChallengeTicket {
        let (settle, rx) = oneshot::channel();
        let pending = PendingChallenge { key, retry, settle };

        let mut state = self.state.lock().await;
        if state.active.is_some() || state.retrying {
            debug!(
                key = %pending.key,
                waiting = state.queue.len() + 1,
                "challenge queued behind the open one"
            );
            state.queue.push_back(pending);
        } else {
            self.activate(&mut state, pending);
        }

        ChallengeTicket { rx }
    }

    /// Fetches a fresh image for the open challenge, replacing the old one
    pub async fn fetch_image(self: &Arc<Self>, key: ChallengeKey, generation: u64) {
        {
            let mut state = self.state.lock().await;
            if !state.session.is_current(generation, &key) {
                return;
            }
            if let Some(stale) = state.session.begin_image_fetch() {
                state.images.revoke(stale);
            }
            self.publish(&state);
        }

        let body = CaptchaImageRequest {
            key: key.to_string(),
        };
        let result = match json_request(&self.policy.image_path, &body) {
            Ok(request) => self.transport.send(&request.binary()).await,
            Err(e) => Err(e),
        };

        let mut state = self.state.lock().await;
        if !state.session.is_current(generation, &key) {
            debug!(key = %key, "discarding captcha image for a challenge that moved on");
            return;
        }

        match result {
            Ok(response) => {
                let content_type = response
                    .header("content-type")
                    .unwrap_or("image/png")
                    .to_string();
                match response.payload {
                    Payload::Binary(bytes) if !bytes.is_empty() => {
                        let image = state.images.create(content_type, bytes);
                        debug!(key = %key, handle = %image.handle, "captcha image ready");
                        if let Some(stale) = state.session.image_loaded(image) {
                            state.images.revoke(stale);
                        }
                    }
                    _ => state.session.image_failed(ChallengeNotice::ImageUnavailable(
                        "server returned no image".to_string(),
                    )),
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "failed to load captcha image");
                state
                    .session
                    .image_failed(ChallengeNotice::ImageUnavailable(e.to_string()));
            }
        }
        self.publish(&state);
    }

    /// Binds the input field without submitting
    pub async fn set_solution_input(&self, text: impl Into<String>) {
        let mut state = self.state.lock().await;
        if state.session.is_open() && !state.session.phase().is_busy() {
            state.session.set_solution_input(text);
            self.publish(&state);
        }
    }

    pub async fn submit_solution(self: &Arc<Self>, solution: impl Into<String>) -> SubmitOutcome {
        let solution = solution.into();

        let (key, generation) = {
            let mut state = self.state.lock().await;
            let ready =
                state.active.is_some() && !state.retrying && !state.session.phase().is_busy();
            let key = match state.session.key() {
                Some(key) if ready => key.clone(),
                _ => return SubmitOutcome::Ignored,
            };
            state.session.begin_submit(solution.clone());
            self.publish(&state);
            (key, state.session.generation())
        };

        let body = SolveChallengeRequest {
            key: key.to_string(),
            solution,
        };
        let result = match json_request(&self.policy.solve_path, &body) {
            Ok(request) => self.transport.send(&request).await,
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let mut state = self.state.lock().await;
                if !state.session.is_current(generation, &key) {
                    return SubmitOutcome::Stale;
                }
                warn!(key = %key, error = %e, "captcha submission failed");
                state
                    .session
                    .submit_failed(ChallengeNotice::SubmissionFailed(e.to_string()));
                self.publish(&state);
                return SubmitOutcome::Failed;
            }
        };

        // An unreadable verdict counts as acceptance, like a missing `ok`
        let verdict: SolveChallengeResponse = response.decode().unwrap_or_default();

        if verdict.is_rejected() {
            let notice = rejection_notice(verdict);
            {
                let mut state = self.state.lock().await;
                if !state.session.is_current(generation, &key) {
                    return SubmitOutcome::Stale;
                }
                warn!(key = %key, notice = %notice, "captcha solution rejected");
                state.session.solution_rejected(notice.clone());
                self.publish(&state);
            }
            self.fetch_image(key, generation).await;
            return SubmitOutcome::Rejected(notice);
        }

        let pending = {
            let mut state = self.state.lock().await;
            if !state.session.is_current(generation, &key) {
                return SubmitOutcome::Stale;
            }
            let Some(pending) = state.active.take() else {
                return SubmitOutcome::Stale;
            };
            state.retrying = true;
            if let Some(stale) = state.session.close() {
                state.images.revoke(stale);
            }
            self.publish(&state);
            pending
        };

        info!(key = %key, "captcha accepted, replaying original request");
        let PendingChallenge { retry, settle, .. } = pending;
        let outcome = retry().await;
        let retried_ok = outcome.is_ok();
        if settle.send(outcome).is_err() {
            debug!(key = %key, "caller stopped waiting for the replayed request");
        }

        let mut state = self.state.lock().await;
        state.retrying = false;
        self.activate_next(&mut state);

        SubmitOutcome::Accepted { retried_ok }
    }

    /// User dismissed the dialog.
    ///
    /// Returns false when nothing was cancelled, including the programmatic
    /// close that precedes a replay.
    pub async fn cancel(self: &Arc<Self>) -> bool {
        let mut state = self.state.lock().await;
        if state.retrying || !state.session.is_open() {
            return false;
        }

        let pending = state.active.take();
        if let Some(stale) = state.session.close() {
            state.images.revoke(stale);
        }
        if let Some(pending) = pending {
            info!(key = %pending.key, "captcha cancelled by user");
            let _ = pending.settle.send(Err(ApiError::Cancelled));
        }

        self.activate_next(&mut state);
        true
    }

    fn activate(self: &Arc<Self>, state: &mut CoordinatorState, pending: PendingChallenge) {
        let key = pending.key.clone();
        let (generation, stale) = state.session.open(key.clone());
        if let Some(stale) = stale {
            state.images.revoke(stale);
        }
        state.active = Some(pending);
        self.publish(state);
        info!(key = %key, "captcha challenge opened");

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.fetch_image(key, generation).await;
        });
    }

    fn activate_next(self: &Arc<Self>, state: &mut CoordinatorState) {
        while let Some(next) = state.queue.pop_front() {
            if next.settle.is_closed() {
                debug!(key = %next.key, "dropping queued challenge nobody waits for");
                continue;
            }
            self.activate(state, next);
            return;
        }
        self.publish(state);
    }

    fn publish(&self, state: &CoordinatorState) {
        self.view_tx.send_replace(state.session.view());
    }
}

fn json_request<T: Serialize>(path: &str, body: &T) -> Result<RequestDescriptor, ApiError> {
    RequestDescriptor::post_json(path, body).map_err(ApiError::Decode)
}

fn rejection_notice(verdict: SolveChallengeResponse) -> ChallengeNotice {
    match verdict.error {
        Some(SolveFailureKind::InvalidCaptcha) => ChallengeNotice::InvalidCaptcha(verdict.message),
        Some(SolveFailureKind::InvalidCredentials) => {
            ChallengeNotice::InvalidCredentials(verdict.message)
        }
        _ => ChallengeNotice::Rejected(
            verdict
                .message
                .unwrap_or_else(|| "Invalid captcha, please try again".to_string()),
        ),
    }
}
