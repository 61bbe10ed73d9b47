use std::sync::Arc;
use std::time::{Duration, Instant};

use agro_core::{AuthUser, CacheKey, CacheValue, Effect, InterestRequest, SessionPhase};
use agro_engine::{
    ApiErrorKind, ApiSettings, EngineEvent, EngineHandle, LocalIdentityBackend,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn next_event(engine: &EngineHandle) -> EngineEvent {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(event) = engine.try_recv() {
            return event;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for engine event"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn assert_quiet(engine: &EngineHandle, window: Duration) {
    let deadline = Instant::now() + window;
    while Instant::now() < deadline {
        if let Some(event) = engine.try_recv() {
            panic!("unexpected engine event: {event:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn engine_for(server: &MockServer) -> EngineHandle {
    EngineHandle::new(
        ApiSettings::with_base_url(server.uri()),
        Arc::new(LocalIdentityBackend::new()),
    )
    .expect("engine")
}

#[tokio::test]
async fn startup_reports_the_session_before_anything_else() {
    let server = MockServer::start().await;
    let engine = engine_for(&server);
    assert_eq!(
        next_event(&engine).await,
        EngineEvent::SessionChanged(SessionPhase::SignedOut)
    );
}

#[tokio::test]
async fn fetch_lands_with_its_epoch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/crops/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let _ = next_event(&engine).await;

    engine.dispatch(Effect::Fetch {
        key: CacheKey::Latest,
        epoch: 3,
    });
    match next_event(&engine).await {
        EngineEvent::FetchCompleted { key, epoch, result } => {
            assert_eq!(key, CacheKey::Latest);
            assert_eq!(epoch, 3);
            assert_eq!(result, Ok(CacheValue::Crops(Vec::new())));
        }
        other => panic!("expected fetch completion, got {other:?}"),
    }
}

#[tokio::test]
async fn repeat_fetches_for_a_key_each_resolve() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/crops/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let _ = next_event(&engine).await;

    // A fetch dispatched after the previous one resolved must not inherit
    // that fetch's spent cancellation state.
    for epoch in 1..=3 {
        engine.dispatch(Effect::Fetch {
            key: CacheKey::Latest,
            epoch,
        });
        match next_event(&engine).await {
            EngineEvent::FetchCompleted {
                epoch: seen,
                result,
                ..
            } => {
                assert_eq!(seen, epoch);
                assert!(result.is_ok());
            }
            other => panic!("expected fetch completion, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn superseded_fetch_emits_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/crops/latest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let _ = next_event(&engine).await;

    engine.dispatch(Effect::Fetch {
        key: CacheKey::Latest,
        epoch: 1,
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.dispatch(Effect::Fetch {
        key: CacheKey::Latest,
        epoch: 2,
    });

    // Only the superseding fetch resolves; the first was cancelled.
    match next_event(&engine).await {
        EngineEvent::FetchCompleted { epoch, result, .. } => {
            assert_eq!(epoch, 2);
            assert!(result.is_ok());
        }
        other => panic!("expected fetch completion, got {other:?}"),
    }
    assert_quiet(&engine, Duration::from_millis(600)).await;
}

#[tokio::test]
async fn cancelled_fetch_emits_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/crops/latest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let _ = next_event(&engine).await;

    engine.dispatch(Effect::Fetch {
        key: CacheKey::Latest,
        epoch: 1,
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.dispatch(Effect::CancelFetch {
        key: CacheKey::Latest,
    });

    assert_quiet(&engine, Duration::from_millis(600)).await;
}

#[tokio::test]
async fn reads_are_retried_once_after_a_timeout() {
    let server = MockServer::start().await;
    // First attempt stalls past the client timeout, the retry succeeds.
    Mock::given(method("GET"))
        .and(path("/api/crops/latest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/crops/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut settings = ApiSettings::with_base_url(server.uri());
    settings.request_timeout = Duration::from_millis(250);
    let engine =
        EngineHandle::new(settings, Arc::new(LocalIdentityBackend::new())).expect("engine");
    let _ = next_event(&engine).await;

    engine.dispatch(Effect::Fetch {
        key: CacheKey::Latest,
        epoch: 1,
    });
    match next_event(&engine).await {
        EngineEvent::FetchCompleted { result, .. } => assert!(result.is_ok()),
        other => panic!("expected fetch completion, got {other:?}"),
    }
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn mutations_are_attempted_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/interests"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut settings = ApiSettings::with_base_url(server.uri());
    settings.request_timeout = Duration::from_millis(250);
    let engine =
        EngineHandle::new(settings, Arc::new(LocalIdentityBackend::new())).expect("engine");
    let _ = next_event(&engine).await;

    engine.dispatch(Effect::SubmitInterest {
        request: InterestRequest {
            crop_id: "c1".to_string(),
            user_email: "buyer@example.com".to_string(),
            user_name: "buyer".to_string(),
            user_photo: None,
            quantity: 2,
            message: String::new(),
        },
    });
    match next_event(&engine).await {
        EngineEvent::InterestSubmitted { crop_id, result } => {
            assert_eq!(crop_id, "c1");
            assert_eq!(result.unwrap_err().kind, ApiErrorKind::Timeout);
        }
        other => panic!("expected submission outcome, got {other:?}"),
    }
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn profile_sync_failure_downgrades_to_a_warning() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "db down" })),
        )
        .mount(&server)
        .await;

    let backend = Arc::new(LocalIdentityBackend::new());
    backend.seed_account("buyer@example.com", "Secret1", AuthUser::new("buyer@example.com"));
    let engine = EngineHandle::new(ApiSettings::with_base_url(server.uri()), backend)
        .expect("engine");
    let _ = next_event(&engine).await;

    engine.dispatch(Effect::SignIn {
        email: "buyer@example.com".to_string(),
        password: "Secret1".to_string(),
    });

    match next_event(&engine).await {
        EngineEvent::AuthCompleted { result } => {
            assert_eq!(result.expect("signed in").email, "buyer@example.com");
        }
        other => panic!("expected auth completion, got {other:?}"),
    }
    match next_event(&engine).await {
        EngineEvent::ProfileSyncFailed { message } => assert_eq!(message, "db down"),
        other => panic!("expected sync warning, got {other:?}"),
    }
}

#[tokio::test]
async fn sign_out_round_trips_through_the_engine() {
    let server = MockServer::start().await;
    let backend = Arc::new(LocalIdentityBackend::new());
    backend.seed_account("buyer@example.com", "Secret1", AuthUser::new("buyer@example.com"));
    let engine = EngineHandle::new(ApiSettings::with_base_url(server.uri()), backend)
        .expect("engine");
    let _ = next_event(&engine).await;

    engine.dispatch(Effect::SignOut);
    assert_eq!(next_event(&engine).await, EngineEvent::SignedOut);
}

#[tokio::test]
async fn failed_sign_in_reports_the_provider_message() {
    let server = MockServer::start().await;
    let engine = engine_for(&server);
    let _ = next_event(&engine).await;

    engine.dispatch(Effect::SignIn {
        email: "nobody@example.com".to_string(),
        password: "Secret1".to_string(),
    });
    match next_event(&engine).await {
        EngineEvent::AuthCompleted { result } => {
            assert_eq!(
                result.unwrap_err().to_string(),
                "No account found for this email"
            );
        }
        other => panic!("expected auth completion, got {other:?}"),
    }
    // No request left the process for a backend-rejected sign-in.
    assert!(server
        .received_requests()
        .await
        .expect("recorded requests")
        .is_empty());
}
