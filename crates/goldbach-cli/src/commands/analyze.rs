//! 가격 분석 명령어.
//!
//! 가격의 PO3 위치, 바이어스, 현재 타이밍, 트레이드 셋업을 출력합니다.

use anyhow::Result;
use chrono::NaiveDateTime;
use goldbach_core::{format_setup, AmdInfo, GoldbachEngine, GoldbachTime, PartitionInfo};
use rust_decimal::Decimal;

/// 분석 CLI 설정
#[derive(Debug, Clone)]
pub struct AnalyzeCliConfig {
    pub price: Decimal,
    pub po3_size: u32,
    pub symbol: String,
    pub trend_days: i32,
}

/// 분석 결과 텍스트 생성. `now`는 시장 벽시계 시간입니다.
pub fn analyze_report(config: &AnalyzeCliConfig, now: NaiveDateTime) -> Result<String> {
    let engine = GoldbachEngine::new(config.po3_size);
    let position = engine.position_info(config.price, None)?;
    let bias = engine.analyze_bias(config.price, None, config.trend_days)?;
    let setup = engine.generate_setup(config.price, &config.symbol, None, config.trend_days, now)?;

    let range = &position.range;
    let mut lines = vec![
        format!("📍 {} @ {}", config.symbol, config.price),
        "─".repeat(40),
        format!(
            "Range:        #{} ({} - {}, PO3 {})",
            range.range_num, range.low, range.high, range.po3_size
        ),
        format!(
            "Position:     {} ({})",
            position.position_str,
            position
                .layer
                .map(|l| l.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        ),
    ];

    if let Some(level) = &position.nearest_level {
        lines.push(format!(
            "Nearest:      [{}] {} ({:.2})",
            level.level_pct, level.name, level.price
        ));
    }

    lines.push(format!("Bias:         {} ({}%)", bias.bias, bias.confidence));
    lines.extend(bias.reasoning.iter().map(|r| format!("  • {}", r)));

    let goldbach = GoldbachTime::at(now);
    let amd = AmdInfo::at(now);
    let partition = PartitionInfo::at(now.date());

    lines.push(String::new());
    lines.push("TIMING".to_string());
    lines.push(format!(
        "  Goldbach Time: {} {} (sum {}, nearest {})",
        if goldbach.is_goldbach { "✅" } else { "❌" },
        goldbach.clock_label(),
        goldbach.sum_value,
        goldbach.nearest_goldbach
    ));
    lines.push(format!("  AMD Cycle:     {}", amd.cycle_name));
    lines.push(format!("  Partition Day: {}", partition.partition_day));
    if let Some(info) = &partition.key_day_info {
        lines.push(format!("  Key Day:       {}", info));
    }

    lines.push(String::new());
    match setup {
        Some(setup) => lines.push(format_setup(&setup)),
        None => lines.push("No clear setup at this position.".to_string()),
    }

    Ok(lines.join("\n"))
}
