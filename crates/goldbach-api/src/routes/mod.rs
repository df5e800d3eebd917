//! API 라우트.
//!
//! 모든 엔드포인트는 `/api` 아래에 있으며, `/health`만 루트에 있습니다.

pub mod analysis;
pub mod backtest;
pub mod reference;
pub mod scheduler;
pub mod signals;
pub mod webhook;

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiErrorResponse, ApiResult};
use crate::state::AppState;

pub use analysis::analysis_router;
pub use backtest::backtest_router;
pub use reference::reference_router;
pub use scheduler::scheduler_router;
pub use signals::signals_router;
pub use webhook::webhook_router;

/// 전체 API 라우터 (상태 미바인딩).
pub fn create_api_router() -> Router<Arc<AppState>> {
    let api = Router::new()
        .merge(analysis_router())
        .merge(signals_router())
        .nest("/backtest", backtest_router())
        .nest("/webhook", webhook_router())
        .merge(scheduler_router())
        .nest("/reference", reference_router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .fallback(not_found)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: String,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
    })
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiErrorResponse::new("NOT_FOUND", "Not found")),
    )
}

// ==================== 공용 헬퍼 ====================

/// JSON 본문 추출 실패를 공통 에러 형식으로 변환합니다.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// JSON 숫자 또는 숫자 문자열을 Decimal로 변환합니다.
pub(crate) fn decimal_from_json(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// 요청의 가격 필드. 없거나 0이면 400.
pub(crate) fn require_price(value: Option<&Value>) -> ApiResult<Decimal> {
    let price = value.and_then(decimal_from_json).unwrap_or(Decimal::ZERO);
    if price.is_zero() {
        return Err(ApiError::BadRequest("Price is required".to_string()));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::state::create_test_state;

    #[test]
    fn test_decimal_from_json() {
        assert_eq!(decimal_from_json(&json!(21500)), Some(dec!(21500)));
        assert_eq!(decimal_from_json(&json!(1.0850)), Some(dec!(1.085)));
        assert_eq!(decimal_from_json(&json!(" 21500.25 ")), Some(dec!(21500.25)));
        assert_eq!(decimal_from_json(&json!("abc")), None);
        assert_eq!(decimal_from_json(&json!(null)), None);
    }

    #[test]
    fn test_require_price() {
        assert!(require_price(None).is_err());
        assert!(require_price(Some(&json!(0))).is_err());
        assert!(require_price(Some(&json!("x"))).is_err());
        assert_eq!(require_price(Some(&json!(21160))).unwrap(), dec!(21160));
    }

    #[tokio::test]
    async fn test_health_and_fallback() {
        let app = create_api_router().with_state(Arc::new(create_test_state()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Not found", "code": "NOT_FOUND"}));
    }
}
