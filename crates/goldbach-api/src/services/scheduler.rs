//! 스케줄러 서비스.
//!
//! 정해진 시각 또는 주기로 분석, 시그널 체크, 일일 리포트, 가격 알림 검사를 실행합니다.
//!
//! # 스케줄 형식
//!
//! - `every_{N}m` / `every_{N}h`: N분 / N시간 간격
//! - `HH:MM`: 매일 해당 시각 (이미 지났으면 다음 날)
//! - `daily`: 다음 자정
//!
//! 간격은 분 단위로 저장되므로 60분의 배수는 시간 단위로 표시됩니다
//! (`every_60m` → `every_1h`).
//!
//! 모든 시각은 시장 시간대(`MarketClock`) 기준입니다.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use goldbach_core::{AmdInfo, CoreError, GoldbachTime, PartitionInfo, SignalStrength};
use goldbach_notification::format::{bias_emoji, escape_html};
use goldbach_notification::NotificationEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// 스케줄러 점검 주기
pub const TICK_INTERVAL: StdDuration = StdDuration::from_secs(10);

/// 기본 분석 시각 (런던 오픈, 런던 이후, 뉴욕 오픈, 뉴욕 오픈 이후, 뉴욕 마감)
pub const DEFAULT_ANALYSIS_TIMES: [&str; 5] = ["08:00", "09:00", "14:30", "15:30", "21:00"];

// ==================== 작업 타입 ====================

/// 작업 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Analysis,
    SignalCheck,
    DailyReport,
    PriceAlert,
    Custom,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::SignalCheck => "signal_check",
            Self::DailyReport => "daily_report",
            Self::PriceAlert => "price_alert",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "analysis" => Ok(Self::Analysis),
            "signal_check" => Ok(Self::SignalCheck),
            "daily_report" => Ok(Self::DailyReport),
            "price_alert" => Ok(Self::PriceAlert),
            "custom" => Ok(Self::Custom),
            _ => Err(CoreError::UnknownVariant {
                kind: "job type",
                value: s.to_string(),
            }),
        }
    }
}

/// 실행 스케줄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Schedule {
    /// 고정 간격
    Every(Duration),
    /// 매일 지정 시각
    At(NaiveTime),
    /// 매일 자정
    Daily,
}

impl Schedule {
    /// `now` 이후 다음 실행 시각. 표현 범위를 넘으면 `None`.
    pub fn next_run(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Every(interval) => now.checked_add_signed(*interval),
            Self::At(time) => {
                let today = now.date().and_time(*time);
                if today <= now {
                    today.checked_add_signed(Duration::days(1))
                } else {
                    Some(today)
                }
            }
            Self::Daily => now
                .date()
                .succ_opt()
                .map(|tomorrow| tomorrow.and_time(NaiveTime::MIN)),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Every(interval) => {
                let minutes = interval.num_minutes();
                if minutes % 60 == 0 {
                    write!(f, "every_{}h", minutes / 60)
                } else {
                    write!(f, "every_{}m", minutes)
                }
            }
            Self::At(time) => write!(f, "{}", time.format("%H:%M")),
            Self::Daily => f.write_str("daily"),
        }
    }
}

impl FromStr for Schedule {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::UnknownVariant {
            kind: "schedule",
            value: s.to_string(),
        };
        let value = s.trim();

        if value == "daily" {
            return Ok(Self::Daily);
        }

        if let Some(interval) = value.strip_prefix("every_") {
            let parse_amount = |amount: &str| -> Result<i64, CoreError> {
                match amount.parse::<i64>() {
                    Ok(n) if n > 0 => Ok(n),
                    _ => Err(invalid()),
                }
            };

            let interval = if let Some(amount) = interval.strip_suffix('m') {
                Duration::try_minutes(parse_amount(amount)?)
            } else if let Some(amount) = interval.strip_suffix('h') {
                Duration::try_hours(parse_amount(amount)?)
            } else {
                None
            };
            return interval.map(Self::Every).ok_or_else(invalid);
        }

        NaiveTime::parse_from_str(value, "%H:%M")
            .map(Self::At)
            .map_err(|_| invalid())
    }
}

impl TryFrom<String> for Schedule {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Schedule> for String {
    fn from(schedule: Schedule) -> Self {
        schedule.to_string()
    }
}

/// 작업별 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_strength: Option<SignalStrength>,
}

impl JobConfig {
    pub fn for_symbols(symbols: &[String]) -> Self {
        Self {
            symbols: Some(symbols.to_vec()),
            min_strength: None,
        }
    }
}

/// 예약 작업
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: String,
    pub name: String,
    pub job_type: JobType,
    pub schedule: Schedule,
    pub enabled: bool,
    pub last_run: Option<NaiveDateTime>,
    pub next_run: Option<NaiveDateTime>,
    #[serde(default)]
    pub config: JobConfig,
}

impl ScheduledJob {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        job_type: JobType,
        schedule: Schedule,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            job_type,
            schedule,
            enabled: true,
            last_run: None,
            next_run: None,
            config: JobConfig::default(),
        }
    }

    pub fn with_config(mut self, config: JobConfig) -> Self {
        self.config = config;
        self
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.enabled && self.next_run.is_some_and(|next| now >= next)
    }
}

/// 기본 작업 목록
pub fn default_jobs(symbols: &[String], auto_analysis_minutes: u64) -> Vec<ScheduledJob> {
    let mut jobs: Vec<ScheduledJob> = DEFAULT_ANALYSIS_TIMES
        .iter()
        .enumerate()
        .filter_map(|(i, time)| {
            let schedule = time.parse().ok()?;
            Some(
                ScheduledJob::new(
                    format!("analysis_{}", i),
                    format!("Analysis at {}", time),
                    JobType::Analysis,
                    schedule,
                )
                .with_config(JobConfig::for_symbols(symbols)),
            )
        })
        .collect();

    jobs.push(
        ScheduledJob::new(
            "signal_check_hourly",
            "Hourly Signal Check",
            JobType::SignalCheck,
            Schedule::Every(Duration::hours(1)),
        )
        .with_config(JobConfig {
            symbols: Some(symbols.to_vec()),
            min_strength: Some(SignalStrength::Strong),
        }),
    );

    if let Ok(at_close) = "21:00".parse() {
        jobs.push(
            ScheduledJob::new("daily_report", "Daily Report", JobType::DailyReport, at_close)
                .with_config(JobConfig::for_symbols(symbols)),
        );
    }

    jobs.push(ScheduledJob::new(
        "price_alerts",
        "Price Alert Check",
        JobType::PriceAlert,
        Schedule::Every(Duration::minutes(5)),
    ));

    let auto_interval = i64::try_from(auto_analysis_minutes)
        .ok()
        .filter(|m| *m > 0)
        .and_then(Duration::try_minutes);
    if let Some(interval) = auto_interval {
        jobs.push(
            ScheduledJob::new(
                "auto_analysis",
                "Auto Analysis",
                JobType::Analysis,
                Schedule::Every(interval),
            )
            .with_config(JobConfig::for_symbols(symbols)),
        );
    }

    jobs
}

// ==================== 스케줄러 ====================

/// 작업 목록과 실행 상태
#[derive(Debug, Default)]
pub struct Scheduler {
    jobs: RwLock<BTreeMap<String, ScheduledJob>>,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// 작업 추가 (같은 ID는 교체). 다음 실행 시각을 계산합니다.
    pub async fn add_job(&self, mut job: ScheduledJob, now: NaiveDateTime) -> ScheduledJob {
        job.next_run = job.schedule.next_run(now);
        if job.next_run.is_none() {
            warn!(id = %job.id, schedule = %job.schedule, "다음 실행 시각을 계산할 수 없습니다");
        }
        info!(
            id = %job.id,
            name = %job.name,
            schedule = %job.schedule,
            "작업 추가"
        );
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        job
    }

    pub async fn remove_job(&self, id: &str) -> bool {
        self.jobs.write().await.remove(id).is_some()
    }

    pub async fn get(&self, id: &str) -> Option<ScheduledJob> {
        self.jobs.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> BTreeMap<String, ScheduledJob> {
        self.jobs.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// 실행 시각이 된 활성 작업
    pub async fn due_jobs(&self, now: NaiveDateTime) -> Vec<ScheduledJob> {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| job.is_due(now))
            .cloned()
            .collect()
    }

    /// 실행 기록 후 다음 실행 시각 재계산
    pub async fn mark_run(&self, id: &str, now: NaiveDateTime) {
        if let Some(job) = self.jobs.write().await.get_mut(id) {
            job.last_run = Some(now);
            job.next_run = job.schedule.next_run(now);
        }
    }

    pub async fn install_defaults(
        &self,
        symbols: &[String],
        auto_analysis_minutes: u64,
        now: NaiveDateTime,
    ) -> usize {
        for job in default_jobs(symbols, auto_analysis_minutes) {
            self.add_job(job, now).await;
        }
        let count = self.len().await;
        info!(count, "기본 작업 설정 완료");
        count
    }
}

// ==================== 실행 ====================

/// 스케줄러 서비스 시작 헬퍼 함수.
pub fn start_scheduler_service(
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(state, shutdown).await;
    })
}

/// 스케줄러 루프. 종료 토큰이 취소될 때까지 실행됩니다.
pub async fn run(state: Arc<AppState>, shutdown: CancellationToken) {
    info!("스케줄러 시작");
    state.scheduler.set_running(true);

    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_due_jobs(&state).await;
            }

            _ = shutdown.cancelled() => {
                info!("스케줄러 종료");
                break;
            }
        }
    }

    state.scheduler.set_running(false);
}

/// 실행 시각이 된 작업을 모두 실행하고 실행한 작업 수를 반환합니다.
pub async fn run_due_jobs(state: &AppState) -> usize {
    let now = state.now();
    let due = state.scheduler.due_jobs(now).await;

    for job in &due {
        execute_job(state, job).await;
        state.scheduler.mark_run(&job.id, now).await;
    }

    due.len()
}

/// 작업을 실행하고 생성된 알림 이벤트 수를 반환합니다.
pub async fn execute_job(state: &AppState, job: &ScheduledJob) -> usize {
    info!(id = %job.id, name = %job.name, job_type = %job.job_type, "작업 실행");

    let now = state.now();
    let events = match job.job_type {
        JobType::Analysis => analysis_events(state, job, None, now).await,
        JobType::SignalCheck => {
            let min = job.config.min_strength.unwrap_or(SignalStrength::Strong);
            analysis_events(state, job, Some(min), now).await
        }
        JobType::DailyReport => daily_report_events(state, job, now).await,
        JobType::PriceAlert => price_alert_events(state, now).await,
        JobType::Custom => {
            debug!(id = %job.id, "사용자 정의 작업은 실행할 핸들러가 없습니다");
            Vec::new()
        }
    };

    let count = events.len();
    for event in events {
        state.dispatch(event).await;
    }
    count
}

fn job_symbols(state: &AppState, job: &ScheduledJob) -> Vec<String> {
    job.config
        .symbols
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| state.config.symbols.clone())
}

/// 분석 / 시그널 체크.
///
/// `min_strength`가 없으면 셋업이 없을 때 위치 요약을 보내고,
/// 있으면 해당 강도 이상의 셋업만 보냅니다.
async fn analysis_events(
    state: &AppState,
    job: &ScheduledJob,
    min_strength: Option<SignalStrength>,
    now: NaiveDateTime,
) -> Vec<NotificationEvent> {
    let mut events = Vec::new();

    for symbol in job_symbols(state, job) {
        let Some(price) = state.prices.latest(&symbol).await else {
            warn!(symbol = %symbol, "가격 정보가 없어 건너뜁니다");
            continue;
        };

        let setup = match state.engine.generate_setup(price, &symbol, None, 0, now) {
            Ok(setup) => setup,
            Err(e) => {
                error!(symbol = %symbol, error = %e, "셋업 생성 실패");
                continue;
            }
        };

        match (setup, min_strength) {
            (Some(setup), Some(min)) if setup.signal_strength < min => {
                debug!(
                    symbol = %symbol,
                    strength = %setup.signal_strength,
                    min = %min,
                    "신호 강도 미달"
                );
            }
            (Some(setup), _) => events.push(NotificationEvent::SignalAlert { setup }),
            (None, None) => {
                if let Some(event) = position_update(state, &symbol, price) {
                    events.push(event);
                }
            }
            (None, Some(_)) => {}
        }
    }

    events
}

fn position_update(
    state: &AppState,
    symbol: &str,
    price: rust_decimal::Decimal,
) -> Option<NotificationEvent> {
    let info = state.engine.position_info(price, None).ok()?;
    let bias = state.engine.analyze_bias(price, None, 0).ok()?;
    Some(NotificationEvent::PositionUpdate {
        symbol: symbol.to_string(),
        price,
        position_str: info.position_str,
        layer: info.layer,
        bias: bias.bias,
        confidence: bias.confidence,
    })
}

async fn daily_report_events(
    state: &AppState,
    job: &ScheduledJob,
    now: NaiveDateTime,
) -> Vec<NotificationEvent> {
    let mut lines = Vec::new();

    for symbol in job_symbols(state, job) {
        let Some(price) = state.prices.latest(&symbol).await else {
            warn!(symbol = %symbol, "가격 정보가 없어 리포트에서 제외합니다");
            continue;
        };
        let (Ok(info), Ok(bias)) = (
            state.engine.position_info(price, None),
            state.engine.analyze_bias(price, None, 0),
        ) else {
            continue;
        };

        let layer = info
            .layer
            .map(|l| l.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        lines.push(format!("\n<b>{}</b> {}", escape_html(&symbol), bias_emoji(bias.bias)));
        lines.push(format!("  Price: {}", price));
        lines.push(format!("  Position: {} ({})", info.position_str, layer));
        lines.push(format!("  Bias: {} ({}%)", bias.bias, bias.confidence));
    }

    let goldbach_time = GoldbachTime::at(now);
    let amd = AmdInfo::at(now);
    let partition = PartitionInfo::at(now.date());

    lines.push("\n<b>TIMING</b>".to_string());
    lines.push(format!(
        "  Goldbach Time: {}",
        if goldbach_time.is_goldbach { "✅" } else { "❌" }
    ));
    lines.push(format!("  AMD Cycle: {}", amd.cycle_name));
    lines.push(format!("  Partition Day: {}", partition.partition_day));

    vec![NotificationEvent::DailyReport {
        generated_at: now,
        lines,
    }]
}

async fn price_alert_events(state: &AppState, now: NaiveDateTime) -> Vec<NotificationEvent> {
    let mut events = Vec::new();

    for symbol in state.alerts.active_symbols().await {
        if let Some(entry) = state.prices.get(&symbol).await {
            events.extend(state.alerts.check(&symbol, &entry, now).await);
        }
    }

    events
}
