//! Goldbach API 서버.
//!
//! 환경 변수에서 설정을 읽어 REST API 서버와 스케줄러를 시작합니다.

use std::{sync::Arc, time::Duration};

use goldbach_api::{
    config::default_log_filter,
    create_app,
    services::{scheduler, start_scheduler_service},
    ApiConfig, AppState,
};
use goldbach_notification::NotificationManager;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// tracing 초기화. `LOG_FORMAT=json`이면 JSON 출력.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_log_filter().into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    init_tracing();

    info!("Starting Goldbach API server...");

    let config = ApiConfig::from_env();
    let addr = config.socket_addr().map_err(|e| {
        error!(host = %config.host, port = config.port, "잘못된 서버 주소: {}", e);
        e
    })?;

    info!(
        symbols = ?config.symbols,
        po3 = config.default_po3_size,
        timezone = %config.clock.timezone(),
        scheduler = config.enable_scheduler,
        providers = ?config.data_providers(),
        "설정 로드 완료"
    );

    let notifications = NotificationManager::from_env();
    if !notifications.has_enabled_sender() {
        warn!("활성화된 알림 채널이 없습니다 (TELEGRAM_*, DISCORD_* 확인)");
    }

    let state = Arc::new(AppState::new(config, notifications));
    info!(version = %state.version, "Application state initialized");

    // 전역 종료 토큰 생성 (graceful shutdown용, 백그라운드 태스크에서 사용)
    let shutdown_token = CancellationToken::new();

    let scheduler_handle = if state.config.enable_scheduler {
        state
            .scheduler
            .install_defaults(
                &state.config.symbols,
                state.config.auto_analysis_interval,
                state.now(),
            )
            .await;
        info!(
            interval_secs = scheduler::TICK_INTERVAL.as_secs(),
            "스케줄러 서비스 시작"
        );
        Some(start_scheduler_service(state.clone(), shutdown_token.clone()))
    } else {
        info!("스케줄러 비활성화 (ENABLE_SCHEDULER=false)");
        None
    };

    let app = create_app(state);

    info!(%addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    info!("Server shutdown initiated, cleaning up...");

    // 종료 토큰 취소 (백그라운드 태스크에 종료 시그널 전파)
    shutdown_token.cancel();

    // 정리 작업에 최대 10초 대기
    if let Some(handle) = scheduler_handle {
        match tokio::time::timeout(Duration::from_secs(10), handle).await {
            Ok(Ok(())) => info!("Cleanup completed"),
            Ok(Err(e)) => warn!(error = %e, "스케줄러 태스크 종료 오류"),
            Err(_) => warn!("Cleanup timeout, forcing shutdown"),
        }
    }

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Ctrl+C 핸들러 설치 실패");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM 핸들러 설치 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    // 모든 백그라운드 태스크에 종료 시그널 전파
    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}
