//! 텍스트 리포트.

use std::fmt::Write;

use rust_decimal::Decimal;

use crate::backtest::statistics::{BacktestStatistics, GroupStats, DAY_NAMES};

const WIDTH: usize = 70;

/// 통계를 고정 레이아웃의 텍스트 리포트로 변환
pub fn generate_report(stats: &BacktestStatistics) -> String {
    let rule = "═".repeat(WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:^width$}", "GOLDBACH BACKTEST REPORT", width = WIDTH);
    let _ = writeln!(out, "{rule}");

    section(&mut out, "SUMMARY");
    let _ = writeln!(out, "Total Trades:       {}", stats.total_trades);
    let _ = writeln!(out, "Winning Trades:     {}", stats.winning_trades);
    let _ = writeln!(out, "Losing Trades:      {}", stats.losing_trades);
    let _ = writeln!(out, "Win Rate:           {:.1}%", stats.win_rate);

    section(&mut out, "PROFIT & LOSS");
    let _ = writeln!(out, "Total P&L:          {}", money(stats.total_pnl));
    let _ = writeln!(out, "Average Win:        {}", money(stats.avg_win));
    let _ = writeln!(out, "Average Loss:       {}", money(stats.avg_loss));
    let _ = writeln!(out, "Largest Win:        {}", money(stats.largest_win));
    let _ = writeln!(out, "Largest Loss:       {}", money(stats.largest_loss));
    let _ = writeln!(out, "Profit Factor:      {:.2}", stats.profit_factor);
    let _ = writeln!(out, "Expectancy:         {}", money(stats.expectancy));

    section(&mut out, "RISK METRICS");
    let _ = writeln!(out, "Risk/Reward Ratio:  {:.2}", stats.risk_reward_ratio);
    let _ = writeln!(
        out,
        "Max Drawdown:       {} ({:.1}%)",
        money(stats.max_drawdown),
        stats.max_drawdown_pct
    );
    let _ = writeln!(out, "Avg Drawdown:       {}", money(stats.avg_drawdown));
    let _ = writeln!(out, "Max DD Duration:    {} bars", stats.max_drawdown_duration);

    section(&mut out, "STREAKS");
    let _ = writeln!(out, "Max Consecutive Wins:   {}", stats.max_consecutive_wins);
    let _ = writeln!(out, "Max Consecutive Losses: {}", stats.max_consecutive_losses);

    section(&mut out, "TIME ANALYSIS");
    let _ = writeln!(out, "Avg Bars Held:      {:.1}", stats.avg_bars_held);
    let _ = writeln!(out, "Avg Bars (Winner):  {:.1}", stats.avg_bars_winner);
    let _ = writeln!(out, "Avg Bars (Loser):   {:.1}", stats.avg_bars_loser);

    section(&mut out, "PERFORMANCE BY TRADE PLAN");
    for (plan, group) in &stats.stats_by_plan {
        group_line(&mut out, plan, 20, group);
    }

    section(&mut out, "PERFORMANCE BY SIGNAL STRENGTH");
    for (strength, group) in &stats.stats_by_strength {
        group_line(&mut out, strength, 10, group);
    }

    section(&mut out, "PERFORMANCE BY DAY");
    for day in DAY_NAMES {
        if let Some(group) = stats.stats_by_day.get(day).filter(|g| g.trades > 0) {
            group_line(&mut out, day, 10, group);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{rule}");
    out
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "─".repeat(title.chars().count()));
}

fn group_line(out: &mut String, label: &str, width: usize, group: &GroupStats) {
    let _ = writeln!(
        out,
        "{:<width$} | Trades: {:>3} | Win Rate: {:>5.1}% | P&L: {}",
        label,
        group.trades,
        group.win_rate,
        money(group.pnl),
        width = width
    );
}

/// `$1,234.56` 형식 (음수는 `-$1,234.56`)
pub fn money(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_money_format() {
        assert_eq!(money(dec!(0)), "$0.00");
        assert_eq!(money(dec!(999.5)), "$999.50");
        assert_eq!(money(dec!(1234.567)), "$1,234.57");
        assert_eq!(money(dec!(-1234567.8)), "-$1,234,567.80");
    }

    #[test]
    fn test_report_sections() {
        let stats = BacktestStatistics::empty(dec!(10000));
        let report = generate_report(&stats);

        for title in [
            "GOLDBACH BACKTEST REPORT",
            "SUMMARY",
            "PROFIT & LOSS",
            "RISK METRICS",
            "STREAKS",
            "TIME ANALYSIS",
            "PERFORMANCE BY TRADE PLAN",
            "PERFORMANCE BY SIGNAL STRENGTH",
            "PERFORMANCE BY DAY",
        ] {
            assert!(report.contains(title), "missing section {title}");
        }
        // 거래가 없는 요일은 출력하지 않음
        assert!(!report.contains("Monday"));
    }
}
