//! OHLC 가격 바.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, CoreResult};

/// OHLC 바. `date`는 시장 벽시계 시간입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(alias = "Date", alias = "datetime", deserialize_with = "deserialize_bar_date")]
    pub date: NaiveDateTime,
    #[serde(alias = "Open")]
    pub open: Decimal,
    #[serde(alias = "High")]
    pub high: Decimal,
    #[serde(alias = "Low")]
    pub low: Decimal,
    #[serde(alias = "Close")]
    pub close: Decimal,
}

impl PriceBar {
    pub fn new(date: NaiveDateTime, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
        }
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// 바 날짜 파싱.
///
/// `YYYY-MM-DD`(자정), `YYYY-MM-DDTHH:MM[:SS]`, `YYYY-MM-DD HH:MM[:SS]`, RFC 3339를 허용합니다.
/// RFC 3339의 오프셋은 버리고 표기된 현지 시간을 그대로 사용합니다.
pub fn parse_bar_date(value: &str) -> CoreResult<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| CoreError::InvalidDate(value.to_string()))
}

fn deserialize_bar_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_bar_date(&raw).map_err(serde::de::Error::custom)
}
