//! Goldbach 트레이딩 API 서버.
//!
//! Axum 기반 REST API로 가격 분석, 시그널 생성, 백테스트, TradingView 웹훅,
//! 스케줄러와 가격 알림 관리를 제공합니다.

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

pub use config::ApiConfig;
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use routes::create_api_router;
pub use state::AppState;

/// 미들웨어가 적용된 전체 애플리케이션 라우터.
pub fn create_app(state: Arc<AppState>) -> Router {
    let timeout = state.config.request_timeout;
    let cors = cors_layer(&state.config.cors_origins);

    create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 타임아웃 시 408 반환
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(cors)
}

/// CORS 레이어. origin 목록이 비어 있으면 모든 origin 허용.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();

    let allow_origin = if parsed.is_empty() {
        if origins.is_empty() {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
        } else {
            warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
        }
        AllowOrigin::any()
    } else {
        info!("CORS configured with {} allowed origins", parsed.len());
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static("x-tv-secret"),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}
