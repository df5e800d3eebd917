//! 스케줄러 및 가격 알림 API 라우트

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{decimal_from_json, json_body};
use crate::error::{ApiError, ApiResult};
use crate::services::scheduler::execute_job;
use crate::services::{
    AlertCondition, JobConfig, JobType, PriceAlert, Schedule, ScheduledJob,
};
use crate::state::AppState;

// ==================== Request/Response 타입 ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub jobs: BTreeMap<String, ScheduledJob>,
    pub alerts: BTreeMap<String, PriceAlert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsResponse {
    pub jobs: BTreeMap<String, ScheduledJob>,
}

/// 작업 추가 요청. 생략된 필드는 기본값을 사용합니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateJobRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    /// 대소문자 무시
    pub job_type: Option<String>,
    pub schedule: Option<String>,
    #[serde(default)]
    pub config: JobConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreatedResponse {
    pub status: String,
    pub job: ScheduledJob,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRunResponse {
    pub status: String,
    pub executed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: BTreeMap<String, PriceAlert>,
}

/// 알림 추가 요청
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAlertRequest {
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub condition: Option<String>,
    pub price: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCreatedResponse {
    pub status: String,
    pub alert_id: String,
}

// ==================== 스케줄러 핸들러 ====================

/// GET /api/scheduler/status
pub async fn scheduler_status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(SchedulerStatus {
        running: state.scheduler.is_running(),
        jobs: state.scheduler.list().await,
        alerts: state.alerts.list().await,
    })
}

/// GET /api/scheduler/jobs
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<JobsResponse> {
    Json(JobsResponse {
        jobs: state.scheduler.list().await,
    })
}

/// POST /api/scheduler/jobs
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> ApiResult<Json<JobCreatedResponse>> {
    let req = json_body(payload)?;

    let job_type: JobType = req.job_type.as_deref().unwrap_or("analysis").parse()?;
    let schedule: Schedule = req.schedule.as_deref().unwrap_or("every_1h").parse()?;
    let now = state.now();
    if schedule.next_run(now).is_none() {
        return Err(ApiError::BadRequest(format!(
            "Schedule out of range: {}",
            schedule
        )));
    }
    let id = match req.id {
        Some(id) => id,
        None => format!("custom_{}", state.scheduler.len().await),
    };

    let job = ScheduledJob::new(
        id,
        req.name.unwrap_or_else(|| "Custom Job".to_string()),
        job_type,
        schedule,
    )
    .with_config(req.config);

    let job = state.scheduler.add_job(job, now).await;
    Ok(Json(JobCreatedResponse {
        status: "ok".to_string(),
        job,
    }))
}

/// DELETE /api/scheduler/jobs/{id}
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    if state.scheduler.remove_job(&id).await {
        info!(id = %id, "작업 삭제");
        Ok(StatusResponse::ok())
    } else {
        Err(ApiError::NotFound("Job not found".to_string()))
    }
}

/// 작업 즉시 실행.
///
/// POST /api/scheduler/run/{id}
pub async fn run_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobRunResponse>> {
    let job = state
        .scheduler
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    execute_job(&state, &job).await;
    state.scheduler.mark_run(&job.id, state.now()).await;

    Ok(Json(JobRunResponse {
        status: "ok".to_string(),
        executed: true,
    }))
}

// ==================== 알림 핸들러 ====================

/// GET /api/alerts
pub async fn list_alerts(State(state): State<Arc<AppState>>) -> Json<AlertsResponse> {
    Json(AlertsResponse {
        alerts: state.alerts.list().await,
    })
}

/// POST /api/alerts
pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateAlertRequest>, JsonRejection>,
) -> ApiResult<Json<AlertCreatedResponse>> {
    let req = json_body(payload)?;

    let condition: AlertCondition = req.condition.as_deref().unwrap_or("above").parse()?;
    let price = match &req.price {
        Some(value) => decimal_from_json(value)
            .ok_or_else(|| ApiError::BadRequest("Invalid alert price".to_string()))?,
        None => Decimal::ZERO,
    };
    let id = match req.id {
        Some(id) => id,
        None => format!("alert_{}", state.alerts.len().await),
    };
    let symbol = req
        .symbol
        .unwrap_or_else(|| state.config.default_symbol.clone());

    let alert = PriceAlert::new(id, symbol, condition, price, state.now());
    let alert_id = alert.id.clone();
    state.alerts.add(alert).await;

    Ok(Json(AlertCreatedResponse {
        status: "ok".to_string(),
        alert_id,
    }))
}

/// DELETE /api/alerts/{id}
pub async fn delete_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    if state.alerts.remove(&id).await {
        info!(id = %id, "가격 알림 삭제");
        Ok(StatusResponse::ok())
    } else {
        Err(ApiError::NotFound("Alert not found".to_string()))
    }
}

// ==================== 라우터 ====================

pub fn scheduler_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scheduler/status", get(scheduler_status))
        .route("/scheduler/jobs", get(list_jobs).post(create_job))
        .route("/scheduler/jobs/{id}", delete(delete_job))
        .route("/scheduler/run/{id}", post(run_job))
        .route("/alerts", get(list_alerts).post(create_alert))
        .route("/alerts/{id}", delete(delete_alert))
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

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_job_lifecycle() {
        let state = Arc::new(create_test_state());
        let app = scheduler_router().with_state(state.clone());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/scheduler/jobs",
                r#"{"name": "Check", "job_type": "SIGNAL_CHECK", "schedule": "every_15m"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["job"]["id"], "custom_0");
        assert_eq!(json["job"]["job_type"], "signal_check");
        assert_eq!(json["job"]["schedule"], "every_15m");

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/scheduler/jobs"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert!(json["jobs"]["custom_0"].is_object());

        let response = app
            .clone()
            .oneshot(empty_request("POST", "/scheduler/run/custom_0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["executed"], true);
        assert!(state.scheduler.get("custom_0").await.unwrap().last_run.is_some());

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", "/scheduler/jobs/custom_0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request("DELETE", "/scheduler/jobs/custom_0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Job not found");
    }

    #[tokio::test]
    async fn test_invalid_job() {
        let app = scheduler_router().with_state(Arc::new(create_test_state()));

        for body in [
            r#"{"schedule": "every_day"}"#,
            r#"{"job_type": "backup"}"#,
            r#"{"schedule": "every_5é"}"#,
            r#"{"schedule": "every_9999999999999h"}"#,
            r#"{"schedule": "every_2400000000h"}"#,
        ] {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/scheduler/jobs", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = app
            .oneshot(empty_request("POST", "/scheduler/run/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_alert_lifecycle() {
        let state = Arc::new(create_test_state());
        let app = scheduler_router().with_state(state.clone());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/alerts",
                r#"{"symbol": "NQ", "condition": "cross", "price": 21500}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["alert_id"], "alert_0");

        let alerts = state.alerts.list().await;
        assert_eq!(alerts["alert_0"].condition, AlertCondition::Cross);
        assert_eq!(alerts["alert_0"].price, dec!(21500));

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/scheduler/status"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["running"], false);
        assert!(json["alerts"]["alert_0"].is_object());

        let response = app
            .clone()
            .oneshot(json_request("POST", "/alerts", r#"{"condition": "sideways", "price": 1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", "/alerts/alert_0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request("DELETE", "/alerts/alert_0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
