//! 환경변수 기반 서버 설정 모듈.

use std::net::SocketAddr;
use std::time::Duration;

use goldbach_core::{validate_po3, MarketClock, DEFAULT_PO3};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

/// 개발용 기본 시크릿
const DEV_SECRET_KEY: &str = "goldbach-dev-secret-change-in-production";

/// API 서버 설정
#[derive(Debug)]
pub struct ApiConfig {
    /// 바인딩할 호스트 주소
    pub host: String,
    /// 바인딩할 포트
    pub port: u16,
    /// 세션/서명용 시크릿
    pub secret_key: SecretString,
    /// 요청에 심볼이 없을 때 사용
    pub default_symbol: String,
    pub default_po3_size: u32,
    /// 스케줄러 대상 심볼
    pub symbols: Vec<String>,
    /// 시세 제공자 키 (상태 보고용)
    pub twelvedata_api_key: Option<SecretString>,
    pub polygon_api_key: Option<SecretString>,
    /// TradingView `X-TV-Secret` 헤더 값
    pub tradingview_webhook_secret: Option<SecretString>,
    pub enable_scheduler: bool,
    /// 자동 분석 주기 (분, 0이면 비활성)
    pub auto_analysis_interval: u64,
    pub clock: MarketClock,
    /// 비어 있으면 모든 origin 허용
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            secret_key: SecretString::from(DEV_SECRET_KEY),
            default_symbol: "NQ".to_string(),
            default_po3_size: DEFAULT_PO3,
            symbols: default_symbols(),
            twelvedata_api_key: None,
            polygon_api_key: None,
            tradingview_webhook_secret: None,
            enable_scheduler: true,
            auto_analysis_interval: 60,
            clock: MarketClock::default(),
            cors_origins: Vec::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// 환경 변수에서 설정 로드.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let secret_key = match env_var_secret("SECRET_KEY") {
            Some(secret) => secret,
            None => {
                warn!("SECRET_KEY가 설정되지 않아 개발용 기본값을 사용합니다 (프로덕션 사용 금지)");
                defaults.secret_key
            }
        };

        let po3 = env_var_parse("DEFAULT_PO3_SIZE", DEFAULT_PO3);
        let default_po3_size = match validate_po3(po3) {
            Ok(po3) => po3,
            Err(e) => {
                warn!(error = %e, "DEFAULT_PO3_SIZE가 유효하지 않아 {}을 사용합니다", DEFAULT_PO3);
                DEFAULT_PO3
            }
        };

        let symbols = env_var_list("SYMBOLS");

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_var_parse("PORT", defaults.port),
            secret_key,
            default_symbol: std::env::var("DEFAULT_SYMBOL")
                .map(|s| s.trim().to_uppercase())
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.default_symbol),
            default_po3_size,
            symbols: if symbols.is_empty() {
                defaults.symbols
            } else {
                symbols
            },
            twelvedata_api_key: env_var_secret("TWELVEDATA_API_KEY"),
            polygon_api_key: env_var_secret("POLYGON_API_KEY"),
            tradingview_webhook_secret: env_var_secret("TRADINGVIEW_WEBHOOK_SECRET"),
            enable_scheduler: env_var_bool("ENABLE_SCHEDULER", true),
            auto_analysis_interval: env_var_parse("AUTO_ANALYSIS_INTERVAL", 60),
            clock: MarketClock::from_env(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            request_timeout: Duration::from_secs(env_var_parse("REQUEST_TIMEOUT_SECS", 30)),
        }
    }

    /// 소켓 주소 반환.
    ///
    /// # Errors
    /// `host:port` 형식이 유효하지 않으면 `AddrParseError`를 반환합니다.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.tradingview_webhook_secret = Some(SecretString::from(secret.into()));
        self
    }

    pub fn with_scheduler(mut self, enabled: bool) -> Self {
        self.enable_scheduler = enabled;
        self
    }

    /// 웹훅 시크릿 검증. 시크릿이 없으면 항상 통과.
    pub fn verify_webhook_secret(&self, received: Option<&str>) -> bool {
        match &self.tradingview_webhook_secret {
            Some(secret) => received == Some(secret.expose_secret()),
            None => true,
        }
    }

    /// 시세 제공자 설정 상태
    pub fn data_providers(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("twelvedata", self.twelvedata_api_key.is_some()),
            ("polygon", self.polygon_api_key.is_some()),
        ]
    }
}

/// 기본 로그 필터. `DEBUG=true`이면 서버 로그도 debug 레벨.
///
/// `RUST_LOG`가 설정되어 있으면 그쪽이 우선합니다.
pub fn default_log_filter() -> &'static str {
    log_filter(env_var_bool("DEBUG", false))
}

fn log_filter(debug: bool) -> &'static str {
    if debug {
        "goldbach_api=debug,tower_http=debug"
    } else {
        "goldbach_api=info,tower_http=debug"
    }
}

fn default_symbols() -> Vec<String> {
    ["NQ", "ES", "EURUSD", "XAUUSD"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// 환경변수에서 값 파싱 (기본값 지원)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "true" || v == "1"
        })
        .unwrap_or(default)
}

/// 환경변수에서 쉼표로 구분된 리스트 파싱
fn env_var_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// 비어 있지 않은 환경변수를 시크릿으로 로드
fn env_var_secret(key: &str) -> Option<SecretString> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}
