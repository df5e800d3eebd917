//! API 통합 테스트
//!
//! 미들웨어가 적용된 전체 라우터에 요청을 보내고,
//! 알림은 mockito 서버로 대체한 Telegram Bot API로 확인합니다.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use goldbach_api::{create_app, ApiConfig, AppState};
use goldbach_notification::{NotificationManager, TelegramConfig, TelegramSender};
use mockito::Matcher;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

// ============================================================================
// 테스트 헬퍼 함수
// ============================================================================

fn telegram_manager(server: &mockito::Server) -> NotificationManager {
    let sender = TelegramSender::new(
        TelegramConfig::new("TOKEN".to_string(), "42".to_string()).with_api_base(server.url()),
    );
    let mut manager = NotificationManager::new();
    manager.add_sender(Arc::new(sender));
    manager
}

fn setup_app(notifications: NotificationManager) -> (Arc<AppState>, Router) {
    let state = Arc::new(AppState::new(
        ApiConfig::default().with_scheduler(false),
        notifications,
    ));
    (state.clone(), create_app(state))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ============================================================================
// 시그널 + 알림
// ============================================================================

#[tokio::test]
async fn test_signal_with_notification() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/botTOKEN/sendMessage")
        .match_body(Matcher::Regex("GOLDBACH SIGNAL".to_string()))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .expect(1)
        .create_async()
        .await;

    let (state, app) = setup_app(telegram_manager(&server));

    let response = app
        .oneshot(post_json(
            "/api/signal",
            json!({"price": 21160, "symbol": "NQ", "send_notification": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["notification_sent"], true);
    assert_eq!(json["signal"]["bias"], "BULLISH");
    assert_eq!(state.signals.len().await, 1);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_signal_notification_failure_is_not_fatal() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/botTOKEN/sendMessage")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let (_, app) = setup_app(telegram_manager(&server));

    let response = app
        .oneshot(post_json(
            "/api/signal",
            json!({"price": 21160, "send_notification": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["notification_sent"], false);
}

// ============================================================================
// 웹훅 → 가격 알림 → 스케줄러
// ============================================================================

#[tokio::test]
async fn test_webhook_triggers_price_alert() {
    let mut server = mockito::Server::new_async().await;
    let alert_mock = server
        .mock("POST", "/botTOKEN/sendMessage")
        .match_body(Matcher::Regex("PRICE ALERT".to_string()))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .expect(1)
        .create_async()
        .await;
    let _signal_mock = server
        .mock("POST", "/botTOKEN/sendMessage")
        .match_body(Matcher::Regex("GOLDBACH SIGNAL".to_string()))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let (state, app) = setup_app(telegram_manager(&server));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/alerts",
            json!({"id": "nq_cross", "symbol": "NQ", "condition": "cross", "price": 21150}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 첫 가격은 직전 가격이 없어 cross 판정 불가
    for price in [21140, 21160] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/webhook/tradingview",
                json!({"symbol": "NQ", "close": price}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert!(state.alerts.list().await["nq_cross"].triggered);
    assert_eq!(state.prices.latest("NQ").await, Some(dec!(21160)));
    alert_mock.assert_async().await;
}

#[tokio::test]
async fn test_run_job_uses_cached_price() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/botTOKEN/sendMessage")
        .match_body(Matcher::Regex("GOLDBACH SIGNAL".to_string()))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .expect(1)
        .create_async()
        .await;

    // 웹훅 없이 가격만 캐시에 넣어 알림은 스케줄러 실행에서만 발생
    let (state, app) = setup_app(telegram_manager(&server));
    state.prices.update("NQ", dec!(21160)).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/scheduler/jobs",
            json!({
                "id": "nq_analysis",
                "job_type": "analysis",
                "schedule": "daily",
                "config": {"symbols": ["NQ", "ES"]}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/scheduler/run/nq_analysis")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    mock.assert_async().await;
}

// ============================================================================
// 미들웨어
// ============================================================================

#[tokio::test]
async fn test_not_found_envelope() {
    let (_, app) = setup_app(NotificationManager::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Not found", "code": "NOT_FOUND"})
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let (_, app) = setup_app(NotificationManager::new());

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/analyze")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_health() {
    let (_, app) = setup_app(NotificationManager::new());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
