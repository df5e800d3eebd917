//! TradingView 웹훅 라우트
//!
//! TradingView 알림 메시지 예시:
//!
//! ```json
//! {"symbol": "{{ticker}}", "price": {{close}}, "action": "{{strategy.order.action}}", "time": "{{time}}"}
//! ```
//!
//! 시크릿이 설정되어 있으면 `X-TV-Secret` 헤더가 일치해야 합니다.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::NaiveDateTime;
use goldbach_notification::NotificationEvent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::decimal_from_json;
use crate::state::AppState;

/// 시크릿 헤더 이름
pub const SECRET_HEADER: &str = "X-TV-Secret";

/// 정규화된 TradingView 알림
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingViewAlert {
    pub symbol: String,
    pub price: Decimal,
    pub action: String,
    pub time: String,
    pub raw: Value,
}

impl TradingViewAlert {
    /// 페이로드 정규화.
    ///
    /// 가격은 `price`, 없으면 `close`를 사용하며 둘 다 없으면 0입니다.
    /// 가격 값이 숫자로 해석되지 않으면 `None`.
    pub fn from_payload(payload: Value, now: NaiveDateTime) -> Option<Self> {
        let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);

        let price = match payload.get("price").or_else(|| payload.get("close")) {
            Some(value) => decimal_from_json(value)?,
            None => Decimal::ZERO,
        };

        Some(Self {
            symbol: text("symbol").unwrap_or_else(|| "UNKNOWN".to_string()),
            price,
            action: text("action").unwrap_or_default(),
            time: text("time").unwrap_or_else(|| now.format("%Y-%m-%dT%H:%M:%S").to_string()),
            raw: payload,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub processed: bool,
}

impl WebhookResponse {
    fn rejected() -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(Self {
                status: "error".to_string(),
                processed: false,
            }),
        )
            .into_response()
    }

    fn processed() -> Response {
        Json(Self {
            status: "ok".to_string(),
            processed: true,
        })
        .into_response()
    }
}

/// TradingView 웹훅 수신.
///
/// POST /api/webhook/tradingview
pub async fn tradingview_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let received = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !state.config.verify_webhook_secret(received) {
        warn!("TradingView 웹훅 시크릿 불일치");
        return WebhookResponse::rejected();
    }

    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "웹훅 본문 파싱 실패");
            return WebhookResponse::rejected();
        }
    };

    let Some(alert) = TradingViewAlert::from_payload(payload, state.now()) else {
        warn!("웹훅 가격 값이 유효하지 않습니다");
        return WebhookResponse::rejected();
    };

    info!(
        symbol = %alert.symbol,
        price = %alert.price,
        action = %alert.action,
        "TradingView 알림 수신"
    );

    process_alert(&state, &alert).await;
    WebhookResponse::processed()
}

/// 가격 캐시 갱신, 가격 알림 검사, 셋업 생성 및 알림.
async fn process_alert(state: &AppState, alert: &TradingViewAlert) {
    if alert.price <= Decimal::ZERO {
        return;
    }

    let now = state.now();
    let entry = state.prices.update(&alert.symbol, alert.price).await;
    for event in state.alerts.check(&alert.symbol, &entry, now).await {
        state.dispatch(event).await;
    }

    match state
        .engine
        .generate_setup(alert.price, &alert.symbol, None, 0, now)
    {
        Ok(Some(setup)) => {
            info!(
                id = setup.id,
                symbol = %setup.symbol,
                plan = %setup.plan,
                "웹훅 시그널 생성"
            );
            state.signals.push(setup.clone()).await;
            state
                .dispatch(NotificationEvent::SignalAlert { setup })
                .await;
        }
        Ok(None) => {}
        Err(e) => error!(symbol = %alert.symbol, error = %e, "웹훅 셋업 생성 실패"),
    }
}

pub fn webhook_router() -> Router<Arc<AppState>> {
    Router::new().route("/tradingview", post(tradingview_webhook))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::header, http::Request};
    use chrono::NaiveDate;
    use goldbach_notification::NotificationManager;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ApiConfig;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(4, 0, 0)
            .unwrap()
    }

    fn request(body: &str, secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/tradingview")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(secret) = secret {
            builder = builder.header(SECRET_HEADER, secret);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[test]
    fn test_normalize_payload() {
        let alert =
            TradingViewAlert::from_payload(json!({"symbol": "NQ", "close": "21160.5"}), now())
                .unwrap();
        assert_eq!(alert.symbol, "NQ");
        assert_eq!(alert.price, dec!(21160.5));
        assert_eq!(alert.action, "");
        assert_eq!(alert.time, "2024-03-04T04:00:00");

        let alert = TradingViewAlert::from_payload(json!({}), now()).unwrap();
        assert_eq!(alert.symbol, "UNKNOWN");
        assert_eq!(alert.price, Decimal::ZERO);

        assert!(TradingViewAlert::from_payload(json!({"price": "n/a"}), now()).is_none());
    }

    #[tokio::test]
    async fn test_webhook_updates_state() {
        let state = Arc::new(AppState::new(
            ApiConfig::default().with_scheduler(false),
            NotificationManager::new(),
        ));
        let app = webhook_router().with_state(state.clone());

        let response = app
            .oneshot(request(r#"{"symbol": "NQ", "price": 21160}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"status": "ok", "processed": true}));

        assert_eq!(state.prices.latest("NQ").await, Some(dec!(21160)));
        assert_eq!(state.signals.len().await, 1);
    }

    #[tokio::test]
    async fn test_webhook_secret() {
        let state = Arc::new(AppState::new(
            ApiConfig::default().with_webhook_secret("s3cret"),
            NotificationManager::new(),
        ));
        let app = webhook_router().with_state(state.clone());

        let response = app
            .clone()
            .oneshot(request(r#"{"symbol": "NQ", "price": 21160}"#, Some("wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.prices.is_empty().await);

        let response = app
            .oneshot(request(r#"{"symbol": "NQ", "price": 21160}"#, Some("s3cret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_invalid_price() {
        let state = Arc::new(AppState::new(ApiConfig::default(), NotificationManager::new()));
        let app = webhook_router().with_state(state);

        let response = app
            .oneshot(request(r#"{"symbol": "NQ", "price": "abc"}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
