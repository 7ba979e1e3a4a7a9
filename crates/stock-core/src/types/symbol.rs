//! 티커 심볼 정의.
//!
//! 심볼은 시스템 전반의 식별 키이며, 수집 시점에 대문자로 정규화됩니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 대문자로 정규화된 티커 심볼 (예: AAPL, BRK.B).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::Type), sqlx(transparent))]
pub struct Symbol(String);

impl Symbol {
    /// 문자열을 심볼로 파싱합니다.
    ///
    /// 앞뒤 공백을 제거하고 대문자로 변환합니다. 빈 문자열이나
    /// 내부 공백이 포함된 입력은 거부됩니다.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidSymbol("빈 심볼".to_string()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidSymbol(format!(
                "공백이 포함된 심볼: {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// 쉼표로 구분된 심볼 목록을 파싱합니다 (예: "aapl, msft").
    ///
    /// 빈 항목은 건너뛰고, 중복은 처음 등장한 순서를 유지한 채 제거합니다.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, CoreError> {
        let mut symbols: Vec<Self> = Vec::new();
        for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
            let symbol = Self::parse(part)?;
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        Ok(symbols)
    }

    /// 심볼 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
