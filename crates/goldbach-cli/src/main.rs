//! Goldbach 트레이딩 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # CSV 데이터로 백테스트
//! goldbach backtest --data data/nq_1h.csv --min-strength STRONG
//!
//! # 현재 가격 분석
//! goldbach analyze --price 21160 --symbol NQ
//!
//! # 범위 29의 레벨 표
//! goldbach levels --range 29
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use goldbach_core::{MarketClock, SignalStrength, DEFAULT_PO3};
use rust_decimal::Decimal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    analyze::{analyze_report, AnalyzeCliConfig},
    backtest::{run_backtest, BacktestCliConfig},
    levels::levels_table,
};

#[derive(Parser)]
#[command(name = "goldbach")]
#[command(about = "Goldbach trading CLI - PO3 레벨 분석 및 백테스트", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 과거 OHLC 데이터로 백테스트 실행
    Backtest {
        /// 데이터 파일 (.json 또는 .csv)
        #[arg(short, long)]
        data: PathBuf,

        /// 초기 자본금
        #[arg(long, default_value = "10000")]
        capital: String,

        /// 거래당 자본 비율 (%)
        #[arg(long, default_value = "1")]
        size_pct: String,

        /// 최소 신호 강도 (WEAK, MEDIUM, STRONG, EXCELLENT, PERFECT)
        #[arg(long, default_value = "MEDIUM")]
        min_strength: String,

        /// PO3 크기
        #[arg(long, default_value_t = DEFAULT_PO3)]
        po3: u32,

        /// 심볼
        #[arg(short, long, default_value = "NQ")]
        symbol: String,

        /// Goldbach 시간에만 진입
        #[arg(long)]
        require_goldbach_time: bool,

        /// Monte Carlo 반복 횟수
        #[arg(long)]
        monte_carlo: Option<usize>,

        /// Monte Carlo 시드
        #[arg(long)]
        seed: Option<u64>,

        /// Walk-forward 폴드 수
        #[arg(long)]
        walk_forward: Option<usize>,

        /// 결과 저장 경로 (.json이면 JSON, 그 외 텍스트)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 가격 위치/바이어스/타이밍 분석
    Analyze {
        /// 분석할 가격
        #[arg(short, long)]
        price: String,

        /// PO3 크기
        #[arg(long, default_value_t = DEFAULT_PO3)]
        po3: u32,

        /// 심볼
        #[arg(short, long, default_value = "NQ")]
        symbol: String,

        /// 추세 일수 (양수: 상승, 음수: 하락)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        trend_days: i32,
    },

    /// 범위 번호의 Goldbach 레벨 표 출력
    Levels {
        /// 범위 번호
        #[arg(short, long)]
        range: i64,

        /// PO3 크기
        #[arg(long, default_value_t = DEFAULT_PO3)]
        po3: u32,
    },
}

fn parse_decimal(name: &str, value: &str) -> Result<Decimal> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| anyhow!("Invalid {}: {}", name, value))
}

fn main() -> Result<()> {
    // .env 파일 로드 (없어도 에러 안남)
    dotenvy::dotenv().ok();

    // 트레이싱 초기화
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            data,
            capital,
            size_pct,
            min_strength,
            po3,
            symbol,
            require_goldbach_time,
            monte_carlo,
            seed,
            walk_forward,
            output,
        } => {
            let config = BacktestCliConfig {
                data_path: data,
                initial_capital: parse_decimal("capital", &capital)?,
                position_size_pct: parse_decimal("size-pct", &size_pct)?,
                min_signal_strength: min_strength.parse::<SignalStrength>()?,
                po3_size: po3,
                symbol: symbol.to_uppercase(),
                require_goldbach_time,
                monte_carlo_iterations: monte_carlo,
                seed,
                walk_forward_folds: walk_forward,
                output_path: output.clone(),
            };

            println!("\n📊 백테스트 실행 중...");
            println!("데이터: {}", config.data_path.display());
            println!("종목: {}", config.symbol);
            println!("초기 자본: {}", config.initial_capital);

            match run_backtest(&config) {
                Ok(result) => {
                    info!("✅ Backtest completed successfully");
                    println!("\n{}", result.summary());
                    if let Some(out) = output {
                        println!("\n📁 결과 저장됨: {}", out.display());
                    }
                }
                Err(e) => {
                    error!("Backtest failed: {:#}", e);
                    return Err(e);
                }
            }
        }

        Commands::Analyze {
            price,
            po3,
            symbol,
            trend_days,
        } => {
            let config = AnalyzeCliConfig {
                price: parse_decimal("price", &price)?,
                po3_size: po3,
                symbol: symbol.to_uppercase(),
                trend_days,
            };
            let now = MarketClock::from_env().now();
            println!("{}", analyze_report(&config, now)?);
        }

        Commands::Levels { range, po3 } => {
            println!("{}", levels_table(range, po3)?);
        }
    }

    Ok(())
}
