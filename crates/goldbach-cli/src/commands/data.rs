//! OHLC 데이터 파일 로더.
//!
//! 확장자로 형식을 판단합니다.
//! - `.json`: 바 객체 배열
//! - `.csv`: `date,open,high,low,close` 컬럼 (헤더 대소문자 무시)

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use csv::StringRecord;
use goldbach_core::PriceBar;
use tracing::{debug, info};

/// 파일에서 바를 읽어 날짜순으로 정렬합니다.
pub fn load_bars(path: &Path) -> Result<Vec<PriceBar>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| anyhow!("파일 확장자가 없습니다: {}", path.display()))?;

    let file =
        File::open(path).with_context(|| format!("파일을 열 수 없습니다: {}", path.display()))?;

    let mut bars = match extension.as_str() {
        "json" => read_json(BufReader::new(file))?,
        "csv" => read_csv(file)?,
        other => bail!("지원하지 않는 데이터 형식: .{} (json, csv만 지원)", other),
    };

    bars.sort_by_key(|b| b.date);

    info!(path = %path.display(), bars = bars.len(), "데이터 로드 완료");
    Ok(bars)
}

fn read_json<R: std::io::Read>(reader: R) -> Result<Vec<PriceBar>> {
    serde_json::from_reader(reader).context("JSON 바 배열 파싱 실패")
}

fn read_csv<R: std::io::Read>(reader: R) -> Result<Vec<PriceBar>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    // 헤더를 소문자로 통일
    let headers: StringRecord = csv_reader
        .headers()
        .context("CSV 헤더 읽기 실패")?
        .iter()
        .map(str::to_ascii_lowercase)
        .collect();
    debug!(headers = ?headers, "CSV 헤더");
    csv_reader.set_headers(headers);

    let mut bars = Vec::new();
    for (index, result) in csv_reader.deserialize().enumerate() {
        let bar: PriceBar = result.with_context(|| format!("CSV {}행 파싱 실패", index + 2))?;
        bars.push(bar);
    }

    Ok(bars)
}
