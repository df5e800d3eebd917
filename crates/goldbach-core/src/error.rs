//! 에러 타입 정의.

use rust_decimal::Decimal;
use thiserror::Error;

/// Goldbach 분석 오류
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// 0 이하이거나 범위를 벗어난 가격
    #[error("유효하지 않은 가격: {0}")]
    InvalidPrice(Decimal),

    /// PO3 집합에 없는 범위 크기
    #[error("지원하지 않는 PO3 크기: {0} (허용: 3, 9, 27, 81, 243, 729, 2187, 6561)")]
    InvalidPo3Size(u32),

    /// 알 수 없는 열거형 값
    #[error("알 수 없는 {kind} 값: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// 날짜/시간 파싱 실패
    #[error("유효하지 않은 날짜 형식: {0}")]
    InvalidDate(String),
}

/// Result 타입 별칭
pub type CoreResult<T> = Result<T, CoreError>;
