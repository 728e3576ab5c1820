use std::sync::Arc;
use tracing::{debug, warn};

use super::coordinator::{ChallengeCoordinator, RetryFn};
use super::key_extraction::extract_challenge_key;
use crate::application::ports::HttpTransport;
use crate::domain::{ApiResponse, RequestDescriptor};
use crate::error::ApiError;

/// Issues requests so that a captcha interruption is handled transparently.
///
/// Each interruption hands a replay of the same request to the shared
/// coordinator. A replay that is interrupted again starts another round,
/// up to the policy's `max_rounds`.
#[derive(Clone)]
pub struct GuardedClient {
    transport: Arc<dyn HttpTransport>,
    coordinator: Arc<ChallengeCoordinator>,
}

impl GuardedClient {
    pub fn new(transport: Arc<dyn HttpTransport>, coordinator: Arc<ChallengeCoordinator>) -> Self {
        Self {
            transport,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<ChallengeCoordinator> {
        &self.coordinator
    }

    /// Plain request for endpoints that are never captcha-gated
    pub async fn perform(&self, request: &RequestDescriptor) -> Result<ApiResponse, ApiError> {
        self.transport.send(request).await
    }

    pub async fn perform_guarded(&self, request: RequestDescriptor) -> Result<ApiResponse, ApiError> {
        let policy = self.coordinator.policy();
        let mut outcome = self.transport.send(&request).await;
        let mut rounds = 0u32;

        loop {
            let error = match outcome {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            let Some(key) = extract_challenge_key(&error, policy.challenge_status) else {
                return Err(error);
            };

            if rounds >= policy.max_rounds {
                warn!(request = %request, rounds, "giving up after repeated captcha challenges");
                return Err(ApiError::ChallengeLimit { rounds });
            }
            rounds += 1;
            debug!(request = %request, key = %key, round = rounds, "request interrupted by captcha");

            let transport = Arc::clone(&self.transport);
            let replay = request.clone();
            let retry: RetryFn = Box::new(move || {
                Box::pin(async move { transport.send(&replay).await })
            });

            outcome = self.coordinator.challenge(key, retry).await.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::captcha::test_support::{
        challenge_required, image_response, key, solve_response, wait_until, ScriptedTransport,
    };
    use crate::application::captcha::{CaptchaPolicy, SubmitOutcome};
    use crate::application::ports::MockHttpTransport;
    use crate::domain::{ChallengeNotice, Payload};
    use bytes::Bytes;
    use serde_json::json;

    fn guarded(transport: Arc<ScriptedTransport>, policy: CaptchaPolicy) -> GuardedClient {
        let coordinator = ChallengeCoordinator::new(transport.clone(), policy);
        GuardedClient::new(transport, coordinator)
    }

    fn generate_request() -> RequestDescriptor {
        RequestDescriptor::post("/gst/generate")
            .with_header("Content-Type", "application/json")
            .with_body(json!({ "period": "072024" }))
    }

    #[tokio::test]
    async fn test_success_passes_through_unchanged() {
        let mut mock = MockHttpTransport::new();
        let expected = ApiResponse::json(200, json!({ "summary": [] })).with_header("X-Trace", "t-1");
        let returned = expected.clone();
        mock.expect_send()
            .withf(|r| r.path == "/gst/generate")
            .times(1)
            .returning(move |_| Ok(returned.clone()));

        let transport: Arc<dyn HttpTransport> = Arc::new(mock);
        let coordinator = ChallengeCoordinator::new(transport.clone(), CaptchaPolicy::default());
        let client = GuardedClient::new(transport, coordinator.clone());

        let response = client.perform_guarded(generate_request()).await.unwrap();
        assert_eq!(response, expected);
        assert!(!coordinator.view().open);
    }

    #[tokio::test]
    async fn test_ordinary_failure_passes_through_unchanged() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(|_| {
            Err(ApiError::Status {
                status: 500,
                payload: Payload::Json(json!({ "message": "boom" })),
            })
        });

        let transport: Arc<dyn HttpTransport> = Arc::new(mock);
        let coordinator = ChallengeCoordinator::new(transport.clone(), CaptchaPolicy::default());
        let client = GuardedClient::new(transport, coordinator.clone());

        let err = client.perform_guarded(generate_request()).await.unwrap_err();
        match err {
            ApiError::Status { status, payload } => {
                assert_eq!(status, 500);
                assert_eq!(payload, Payload::Json(json!({ "message": "boom" })));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!coordinator.view().open);
    }

    #[tokio::test]
    async fn test_unauthorized_never_opens_a_challenge() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(|_| {
            Err(ApiError::Unauthorized {
                payload: Payload::Json(serde_json::Value::Null),
            })
        });

        let transport: Arc<dyn HttpTransport> = Arc::new(mock);
        let coordinator = ChallengeCoordinator::new(transport.clone(), CaptchaPolicy::default());
        let client = GuardedClient::new(transport, coordinator.clone());

        let err = client.perform_guarded(generate_request()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
        assert!(!coordinator.view().open);
    }

    #[tokio::test]
    async fn test_challenge_without_key_fails_closed() {
        let transport = ScriptedTransport::new().respond(
            "/gst/generate",
            Err(ApiError::Status {
                status: 501,
                payload: Payload::Json(json!({ "detail": "captcha" })),
            }),
        );
        let client = guarded(transport.clone(), CaptchaPolicy::default());

        let err = client.perform_guarded(generate_request()).await.unwrap_err();
        assert_eq!(err.status(), Some(501));
        assert!(!client.coordinator().view().open);
        assert!(transport.sent_to("/custom/captcha").is_empty());
    }

    #[tokio::test]
    async fn test_correct_solution_replays_original_request() {
        let transport = ScriptedTransport::new()
            .respond("/gst/generate", Err(challenge_required("abc")))
            .respond(
                "/gst/generate",
                Ok(ApiResponse::json(200, json!({ "summary": [{ "Company": "Acme" }] }))),
            )
            .respond("/custom/captcha", Ok(image_response(b"img-1")))
            .respond("/custom/login", Ok(solve_response(json!({ "ok": true }))));
        let client = guarded(transport.clone(), CaptchaPolicy::default());
        let coordinator = client.coordinator().clone();
        let mut views = coordinator.subscribe();

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.perform_guarded(generate_request()).await })
        };

        let view = wait_until(&mut views, |v| v.awaiting_input()).await;
        assert_eq!(view.key, Some(key("abc")));
        assert_eq!(
            coordinator.submit_solution("7GQ2").await,
            SubmitOutcome::Accepted { retried_ok: true }
        );

        let response = task.await.unwrap().unwrap();
        assert_eq!(
            response.payload,
            Payload::Json(json!({ "summary": [{ "Company": "Acme" }] }))
        );

        let generates = transport.sent_to("/gst/generate");
        assert_eq!(generates.len(), 2);
        assert_eq!(generates[0], generates[1]);
        assert_eq!(generates[1].body, Some(json!({ "period": "072024" })));

        let solves = transport.sent_to("/custom/login");
        assert_eq!(solves[0].body, Some(json!({ "key": "abc", "captcha": "7GQ2" })));
        assert!(!coordinator.view().open);
    }

    #[tokio::test]
    async fn test_wrong_then_right_settles_once() {
        let transport = ScriptedTransport::new()
            .respond("/gst/generate", Err(challenge_required("abc")))
            .respond("/gst/generate", Ok(ApiResponse::json(200, json!({ "summary": [] }))))
            .respond("/custom/captcha", Ok(image_response(b"img-1")))
            .respond("/custom/captcha", Ok(image_response(b"img-2")))
            .respond(
                "/custom/login",
                Ok(solve_response(json!({ "ok": false, "error": "invalid_captcha" }))),
            )
            .respond("/custom/login", Ok(solve_response(json!({ "ok": true }))));
        let client = guarded(transport.clone(), CaptchaPolicy::default());
        let coordinator = client.coordinator().clone();
        let mut views = coordinator.subscribe();

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.perform_guarded(generate_request()).await })
        };

        let first = wait_until(&mut views, |v| v.awaiting_input()).await;
        assert_eq!(
            coordinator.submit_solution("0000").await,
            SubmitOutcome::Rejected(ChallengeNotice::InvalidCaptcha(None))
        );

        let second = coordinator.view();
        assert!(second.open);
        assert_eq!(second.key, Some(key("abc")));
        assert_eq!(second.solution_input, "");
        assert_ne!(
            second.image.as_ref().map(|i| i.handle),
            first.image.as_ref().map(|i| i.handle)
        );
        assert!(!task.is_finished());

        coordinator.submit_solution("7GQ2").await;
        let response = task.await.unwrap().unwrap();
        assert_eq!(response.payload, Payload::Json(json!({ "summary": [] })));
        assert_eq!(transport.sent_to("/gst/generate").len(), 2);
        assert_eq!(transport.sent_to("/custom/captcha").len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_rejects_guarded_call() {
        let transport = ScriptedTransport::new()
            .respond("/gst/generate", Err(challenge_required("abc")))
            .respond("/custom/captcha", Ok(image_response(b"img-1")));
        let client = guarded(transport.clone(), CaptchaPolicy::default());
        let coordinator = client.coordinator().clone();
        let mut views = coordinator.subscribe();

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.perform_guarded(generate_request()).await })
        };

        wait_until(&mut views, |v| v.awaiting_input()).await;
        assert!(coordinator.cancel().await);

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(!coordinator.view().open);
        assert_eq!(transport.sent_to("/gst/generate").len(), 1);
    }

    #[tokio::test]
    async fn test_binary_challenge_body_extracts_key() {
        let transport = ScriptedTransport::new()
            .respond(
                "/gst/summary",
                Err(ApiError::Status {
                    status: 501,
                    payload: Payload::Binary(Bytes::from_static(br#"{"key":"xyz"}"#)),
                }),
            )
            .respond("/custom/captcha", Ok(image_response(b"img-1")));
        let client = guarded(transport.clone(), CaptchaPolicy::default());
        let coordinator = client.coordinator().clone();
        let mut views = coordinator.subscribe();

        let request = RequestDescriptor::post("/gst/summary")
            .with_body(json!({ "period": "072024" }))
            .binary();
        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.perform_guarded(request).await })
        };

        let view = wait_until(&mut views, |v| v.awaiting_input()).await;
        assert_eq!(view.key, Some(key("xyz")));
        assert_eq!(
            transport.sent_to("/custom/captcha")[0].body,
            Some(json!({ "key": "xyz" }))
        );

        coordinator.cancel().await;
        assert!(task.await.unwrap().unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_rechallenged_replay_opens_another_round() {
        let transport = ScriptedTransport::new()
            .respond("/gst/generate", Err(challenge_required("abc")))
            .respond("/gst/generate", Err(challenge_required("def")))
            .respond("/gst/generate", Ok(ApiResponse::json(200, json!({ "summary": [] }))))
            .respond("/custom/captcha", Ok(image_response(b"img-1")))
            .respond("/custom/captcha", Ok(image_response(b"img-2")))
            .respond("/custom/login", Ok(solve_response(json!({ "ok": true }))))
            .respond("/custom/login", Ok(solve_response(json!({ "ok": true }))));
        let client = guarded(transport.clone(), CaptchaPolicy::default());
        let coordinator = client.coordinator().clone();
        let mut views = coordinator.subscribe();

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.perform_guarded(generate_request()).await })
        };

        wait_until(&mut views, |v| v.awaiting_input() && v.key == Some(key("abc"))).await;
        coordinator.submit_solution("AAAA").await;

        wait_until(&mut views, |v| v.awaiting_input() && v.key == Some(key("def"))).await;
        coordinator.submit_solution("BBBB").await;

        let response = task.await.unwrap().unwrap();
        assert_eq!(response.payload, Payload::Json(json!({ "summary": [] })));
        assert_eq!(transport.sent_to("/gst/generate").len(), 3);
        assert_eq!(coordinator.live_images().await, 0);
    }

    #[tokio::test]
    async fn test_round_limit_stops_endless_challenges() {
        let transport = ScriptedTransport::new()
            .respond("/gst/generate", Err(challenge_required("abc")))
            .respond("/gst/generate", Err(challenge_required("abc")))
            .respond("/custom/captcha", Ok(image_response(b"img-1")))
            .respond("/custom/login", Ok(solve_response(json!({ "ok": true }))));
        let policy = CaptchaPolicy {
            max_rounds: 1,
            ..CaptchaPolicy::default()
        };
        let client = guarded(transport.clone(), policy);
        let coordinator = client.coordinator().clone();
        let mut views = coordinator.subscribe();

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.perform_guarded(generate_request()).await })
        };

        wait_until(&mut views, |v| v.awaiting_input()).await;
        coordinator.submit_solution("7GQ2").await;

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, ApiError::ChallengeLimit { rounds: 1 }));
        assert!(!coordinator.view().open);
    }

    #[tokio::test]
    async fn test_concurrent_guarded_calls_are_served_in_turn() {
        let transport = ScriptedTransport::new()
            .respond("/gst/generate", Err(challenge_required("abc")))
            .respond("/gst/generate", Ok(ApiResponse::json(200, json!({ "summary": [] }))))
            .respond("/einvoice/damage/stats", Err(challenge_required("def")))
            .respond("/einvoice/damage/stats", Ok(ApiResponse::json(200, json!({ "stats": {} }))))
            .respond("/custom/captcha", Ok(image_response(b"img-1")))
            .respond("/custom/captcha", Ok(image_response(b"img-2")))
            .respond("/custom/login", Ok(solve_response(json!({ "ok": true }))))
            .respond("/custom/login", Ok(solve_response(json!({ "ok": true }))));
        let client = guarded(transport.clone(), CaptchaPolicy::default());
        let coordinator = client.coordinator().clone();
        let mut views = coordinator.subscribe();

        let gst = {
            let client = client.clone();
            tokio::spawn(async move { client.perform_guarded(generate_request()).await })
        };
        let first = wait_until(&mut views, |v| v.awaiting_input()).await;
        assert_eq!(first.key, Some(key("abc")));

        let stats = {
            let client = client.clone();
            tokio::spawn(async move {
                let request = RequestDescriptor::post("/einvoice/damage/stats")
                    .with_body(json!({ "period": "072024" }));
                client.perform_guarded(request).await
            })
        };
        transport.wait_for_completed("/einvoice/damage/stats", 1).await;
        assert_eq!(coordinator.view().key, first.key);

        coordinator.submit_solution("AAAA").await;
        wait_until(&mut views, |v| v.awaiting_input() && v.key == Some(key("def"))).await;
        coordinator.submit_solution("BBBB").await;

        assert!(gst.await.unwrap().is_ok());
        assert!(stats.await.unwrap().is_ok());
    }
}
