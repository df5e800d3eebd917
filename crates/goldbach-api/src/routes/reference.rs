//! 참조 데이터 라우트 (레벨, 월간 파티션, 트레이드 플랜)

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use goldbach_core::reference::{
    reference_levels, reference_partitions, reference_plans, ReferenceLevel, ReferencePartition,
    ReferencePlan,
};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LevelsReference {
    pub levels: BTreeMap<u8, ReferenceLevel>,
}

#[derive(Debug, Serialize)]
pub struct PartitionsReference {
    pub partitions: BTreeMap<u32, ReferencePartition>,
}

#[derive(Debug, Serialize)]
pub struct PlansReference {
    pub plans: BTreeMap<&'static str, ReferencePlan>,
}

/// GET /api/reference/levels
pub async fn levels() -> Json<LevelsReference> {
    Json(LevelsReference {
        levels: reference_levels(),
    })
}

/// GET /api/reference/partitions
pub async fn partitions() -> Json<PartitionsReference> {
    Json(PartitionsReference {
        partitions: reference_partitions(),
    })
}

/// GET /api/reference/plans
pub async fn plans() -> Json<PlansReference> {
    Json(PlansReference {
        plans: reference_plans(),
    })
}

pub fn reference_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/levels", get(levels))
        .route("/partitions", get(partitions))
        .route("/plans", get(plans))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::state::create_test_state;

    async fn get_json(uri: &str) -> Value {
        let app = reference_router().with_state(Arc::new(create_test_state()));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_reference_levels() {
        let json = get_json("/levels").await;
        assert_eq!(json["levels"]["23"]["layer"], Value::Null);
        assert_eq!(json["levels"]["17"]["layer"], "LIQUIDITY");
    }

    #[tokio::test]
    async fn test_reference_partitions_and_plans() {
        let json = get_json("/partitions").await;
        assert_eq!(json["partitions"].as_object().unwrap().len(), 12);

        let json = get_json("/plans").await;
        assert!(json["plans"]["EINSTEIN"].is_object());
    }
}
