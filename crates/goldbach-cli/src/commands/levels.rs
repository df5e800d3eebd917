//! 레벨 표 명령어.

use anyhow::Result;
use goldbach_core::Po3Range;

/// 범위 번호의 Goldbach 레벨 표 (위에서 아래로 높은 레벨부터).
///
/// Goldbach 수 레벨은 `*`로 표시합니다.
pub fn levels_table(range_num: i64, po3: u32) -> Result<String> {
    let range = Po3Range::from_range_number(range_num, po3)?;

    let mut lines = vec![
        format!(
            "Range #{} (PO3 {}): {} - {}",
            range.range_num, range.po3_size, range.low, range.high
        ),
        format!(
            "{:>6}  {:>12}  {:<24} {:<24} {}",
            "LEVEL", "PRICE", "NAME", "ICT", "LAYER"
        ),
        "─".repeat(80),
    ];

    for level in range.levels.iter().rev() {
        let marker = if level.is_goldbach { "*" } else { " " };
        lines.push(format!(
            "{:>6}{} {:>12.2}  {:<24} {:<24} {}",
            format!("[{}]", level.level_pct),
            marker,
            level.price,
            level.name,
            level.ict_name,
            level
                .layer
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string())
        ));
    }

    Ok(lines.join("\n"))
}
