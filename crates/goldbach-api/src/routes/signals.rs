//! 시그널 API 라우트
//!
//! 셋업을 생성해 저장하고, 요청 시 알림 채널로 전송합니다.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use goldbach_core::TradeSetup;
use goldbach_notification::NotificationEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{json_body, require_price};
use crate::error::ApiResult;
use crate::services::SignalStatistics;
use crate::state::AppState;

// ==================== Request/Response 타입 ====================

/// 시그널 생성 요청
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalRequest {
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub send_notification: bool,
    #[serde(default)]
    pub po3_size: Option<u32>,
    #[serde(default)]
    pub trend_days: Option<i32>,
}

/// 시그널 생성 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalResponse {
    Generated {
        signal: TradeSetup,
        notification_sent: bool,
    },
    NoSetup {
        signal: Option<TradeSetup>,
        message: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

// ==================== 핸들러 ====================

/// 시그널 생성.
///
/// POST /api/signal
pub async fn generate_signal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignalRequest>, JsonRejection>,
) -> ApiResult<Json<SignalResponse>> {
    let req = json_body(payload)?;
    let price = require_price(req.price.as_ref())?;
    let symbol = req
        .symbol
        .unwrap_or_else(|| state.config.default_symbol.clone());
    let po3 = Some(req.po3_size.unwrap_or(state.config.default_po3_size));

    let setup = state.engine.generate_setup(
        price,
        &symbol,
        po3,
        req.trend_days.unwrap_or(0),
        state.now(),
    )?;

    let Some(setup) = setup else {
        return Ok(Json(SignalResponse::NoSetup {
            signal: None,
            message: "No clear setup at current price".to_string(),
        }));
    };

    info!(
        id = setup.id,
        symbol = %setup.symbol,
        plan = %setup.plan,
        strength = %setup.signal_strength,
        "시그널 생성"
    );
    state.signals.push(setup.clone()).await;

    let notification_sent = if req.send_notification {
        state
            .dispatch(NotificationEvent::SignalAlert {
                setup: setup.clone(),
            })
            .await
    } else {
        false
    };

    Ok(Json(SignalResponse::Generated {
        signal: setup,
        notification_sent,
    }))
}

/// 최근 시그널 (오래된 순).
///
/// GET /api/signals?limit=50
pub async fn list_signals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignalsQuery>,
) -> Json<Vec<TradeSetup>> {
    Json(state.signals.recent(query.limit).await)
}

/// GET /api/statistics
pub async fn statistics(State(state): State<Arc<AppState>>) -> Json<SignalStatistics> {
    Json(state.signals.statistics().await)
}

// ==================== 라우터 ====================

pub fn signals_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signal", post(generate_signal))
        .route("/signals", get(list_signals))
        .route("/statistics", get(statistics))
}
