//! 설정에서 받은 테이블 이름 검증.
//!
//! 테이블 이름은 바인딩 파라미터로 넘길 수 없어 SQL 문자열에 직접 들어가므로,
//! 식별자 형식(`[A-Za-z_][A-Za-z0-9_]*`)만 허용합니다.

use std::fmt;
use std::str::FromStr;

use crate::{DataError, Result};

/// PostgreSQL 식별자 최대 길이.
const MAX_IDENT_LEN: usize = 63;

/// 검증된 테이블 이름 (선택적 `schema.` 접두어).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

fn validate_ident(ident: &str) -> Result<()> {
    let mut chars = ident.chars();
    let valid_first = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if !valid_first
        || ident.len() > MAX_IDENT_LEN
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(DataError::ConfigError(format!(
            "invalid table identifier: {:?}",
            ident
        )));
    }
    Ok(())
}

impl TableName {
    /// `name` 또는 `schema.name` 형식을 파싱합니다.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match raw.split_once('.') {
            Some((schema, name)) => {
                validate_ident(schema)?;
                validate_ident(name)?;
                Ok(Self {
                    schema: Some(schema.to_string()),
                    name: name.to_string(),
                })
            }
            None => {
                validate_ident(raw)?;
                Ok(Self {
                    schema: None,
                    name: raw.to_string(),
                })
            }
        }
    }

    /// 스키마를 지정합니다. 이미 스키마가 있으면 덮어씁니다.
    pub fn in_schema(mut self, schema: &str) -> Result<Self> {
        validate_ident(schema)?;
        self.schema = Some(schema.to_string());
        Ok(self)
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// 스키마를 제외한 테이블 이름.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// SQL에 들어갈 이름 (`schema.name` 또는 `name`).
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// 세션 임시 스테이징 테이블 이름.
    pub fn staging(&self) -> String {
        format!("tmp_{}", self.name)
    }

    /// (symbol_code, date_key) 조회 인덱스 이름.
    pub fn index_name(&self) -> String {
        format!("idx_{}_symbol_date", self.name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified())
    }
}

impl FromStr for TableName {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
