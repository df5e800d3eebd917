//! 분석 및 타이밍 API 라우트
//!
//! 가격 위치/바이어스 분석, 범위별 레벨 표, Goldbach 시간, AMD 사이클, 월간 파티션을 제공합니다.
//! 현재 시각은 모두 시장 시계 기준입니다.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use goldbach_core::{
    next_goldbach_times, AmdInfo, BiasAnalysis, GoldbachTime, Layer, PartitionInfo, Po3Range,
    PositionInfo, TradeSetup,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{json_body, require_price};
use crate::error::ApiResult;
use crate::state::AppState;

/// 다음 Goldbach 시간 조회 개수
const NEXT_GOLDBACH_TIMES: usize = 5;

// ==================== Request/Response 타입 ====================

/// 분석 요청
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeRequest {
    /// 숫자 또는 숫자 문자열
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub po3_size: Option<u32>,
    #[serde(default)]
    pub trend_days: Option<i32>,
}

/// 분석 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub price: Decimal,
    pub symbol: String,
    pub position: PositionInfo,
    pub bias: BiasAnalysis,
    pub goldbach_time: GoldbachTime,
    pub amd_cycle: AmdInfo,
    pub monthly_partition: PartitionInfo,
    pub setup: Option<TradeSetup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LevelsQuery {
    pub po3_size: Option<u32>,
}

/// 레벨 표 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelEntry {
    pub level: u8,
    pub price: Decimal,
    pub name: String,
    pub ict_name: String,
    pub layer: Option<Layer>,
}

/// 범위별 레벨 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelsResponse {
    pub range_num: i64,
    pub range_low: Decimal,
    pub range_high: Decimal,
    pub po3_size: u32,
    pub levels: Vec<LevelEntry>,
}

impl From<Po3Range> for LevelsResponse {
    fn from(range: Po3Range) -> Self {
        Self {
            range_num: range.range_num,
            range_low: range.low,
            range_high: range.high,
            po3_size: range.po3_size,
            levels: range
                .levels
                .into_iter()
                .map(|level| LevelEntry {
                    // 레벨 번호는 `level` 필드에 있으므로 "[pct]" 접미사 제거
                    name: level
                        .name
                        .split_once(" [")
                        .map(|(base, _)| base.to_string())
                        .unwrap_or_else(|| level.name.clone()),
                    level: level.level_pct,
                    price: level.price,
                    ict_name: level.ict_name,
                    layer: level.layer,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldbachTimeResponse {
    pub current: GoldbachTime,
    pub next_goldbach_times: Vec<GoldbachTime>,
}

// ==================== 핸들러 ====================

/// 가격 종합 분석.
///
/// POST /api/analyze
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let req = json_body(payload)?;
    let price = require_price(req.price.as_ref())?;
    let symbol = req
        .symbol
        .unwrap_or_else(|| state.config.default_symbol.clone());
    let po3 = Some(req.po3_size.unwrap_or(state.config.default_po3_size));
    let trend_days = req.trend_days.unwrap_or(0);
    let now = state.now();

    let position = state.engine.position_info(price, po3)?;
    let bias = state.engine.analyze_bias(price, po3, trend_days)?;
    let setup = state
        .engine
        .generate_setup(price, &symbol, po3, trend_days, now)?;

    debug!(
        symbol = %symbol,
        price = %price,
        position = %position.position_str,
        has_setup = setup.is_some(),
        "가격 분석 완료"
    );

    Ok(Json(AnalyzeResponse {
        price,
        symbol,
        position,
        bias,
        goldbach_time: GoldbachTime::at(now),
        amd_cycle: AmdInfo::at(now),
        monthly_partition: PartitionInfo::at(now.date()),
        setup,
    }))
}

/// 범위 번호의 레벨 표.
///
/// GET /api/levels/{range}
pub async fn levels(
    State(state): State<Arc<AppState>>,
    Path(range_num): Path<i64>,
    Query(query): Query<LevelsQuery>,
) -> ApiResult<Json<LevelsResponse>> {
    let po3 = query.po3_size.unwrap_or(state.config.default_po3_size);
    let range = Po3Range::from_range_number(range_num, po3)?;
    Ok(Json(range.into()))
}

/// 현재 및 다음 Goldbach 시간.
///
/// GET /api/goldbach-time
pub async fn goldbach_time(State(state): State<Arc<AppState>>) -> Json<GoldbachTimeResponse> {
    let now = state.now();
    Json(GoldbachTimeResponse {
        current: GoldbachTime::at(now),
        next_goldbach_times: next_goldbach_times(now, NEXT_GOLDBACH_TIMES),
    })
}

/// GET /api/amd-cycle
pub async fn amd_cycle(State(state): State<Arc<AppState>>) -> Json<AmdInfo> {
    Json(AmdInfo::at(state.now()))
}

/// GET /api/partition
pub async fn partition(State(state): State<Arc<AppState>>) -> Json<PartitionInfo> {
    Json(PartitionInfo::at(state.now().date()))
}

// ==================== 라우터 ====================

pub fn analysis_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/levels/{range}", get(levels))
        .route("/goldbach-time", get(goldbach_time))
        .route("/amd-cycle", get(amd_cycle))
        .route("/partition", get(partition))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    use super::*;
    use crate::state::create_test_state;

    fn app() -> Router {
        analysis_router().with_state(Arc::new(create_test_state()))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
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

    #[tokio::test]
    async fn test_analyze() {
        let response = app()
            .oneshot(post_json("/analyze", r#"{"price": 21160, "symbol": "NQ"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let result: AnalyzeResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.symbol, "NQ");
        assert_eq!(result.position.position_str, "[3]");
        assert_eq!(result.bias.bias.to_string(), "BULLISH");
        let setup = result.setup.unwrap();
        assert_eq!(setup.plan.to_string(), "EINSTEIN");
        assert_eq!(setup.entry_price, dec!(21243.06));
    }

    #[tokio::test]
    async fn test_analyze_string_price() {
        let response = app()
            .oneshot(post_json("/analyze", r#"{"price": "21160"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["symbol"], "NQ");
    }

    #[tokio::test]
    async fn test_analyze_requires_price() {
        for body in [r#"{}"#, r#"{"price": 0}"#] {
            let response = app().oneshot(post_json("/analyze", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = body_json(response).await;
            assert_eq!(json["error"], "Price is required");
            assert_eq!(json["code"], "BAD_REQUEST");
        }
    }

    #[tokio::test]
    async fn test_analyze_invalid_po3() {
        let response = app()
            .oneshot(post_json("/analyze", r#"{"price": 21160, "po3_size": 100}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_levels() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/levels/29?po3_size=729")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let levels: LevelsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(levels.range_low, dec!(21141));
        assert_eq!(levels.range_high, dec!(21870));
        assert_eq!(levels.levels.first().unwrap().level, 0);
        assert_eq!(levels.levels.last().unwrap().level, 100);

        let name_of = |pct: u8| {
            levels
                .levels
                .iter()
                .find(|entry| entry.level == pct)
                .map(|entry| entry.name.clone())
                .unwrap()
        };
        assert_eq!(name_of(0), "LOW");
        assert_eq!(name_of(17), "GIP");
        assert_eq!(name_of(50), "EQ");
        assert_eq!(name_of(93), "LLOD");
    }

    #[tokio::test]
    async fn test_levels_invalid_po3() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/levels/29?po3_size=100")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_goldbach_time() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/goldbach-time")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["next_goldbach_times"].as_array().unwrap().len(), 5);
    }
}
