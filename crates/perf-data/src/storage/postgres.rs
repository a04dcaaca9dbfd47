//! PostgreSQL 웨어하우스.
//!
//! # 적재 순서
//!
//! 하나의 트랜잭션 안에서:
//!
//! 1. 세션 임시 테이블 `tmp_<table>` 생성 (`LIKE <table>`, `ON COMMIT DROP`)
//! 2. UNNEST로 500행씩 스테이징
//! 3. `MERGE ... WHEN NOT MATCHED THEN INSERT`로 새 키만 삽입
//!
//! 기존 행은 갱신하지 않습니다. 임시 테이블은 세션 범위이므로 풀 대신
//! 단일 `PgConnection`을 사용합니다. MERGE는 PostgreSQL 15 이상이 필요합니다.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use perf_core::{PriceRow, PRICE_ROW_COLUMNS};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, info, instrument};

use super::table::TableName;
use super::Warehouse;
use crate::{DataError, Result};

/// 스테이징 INSERT 한 번에 넣는 행 수.
const STAGING_CHUNK_SIZE: usize = 500;

/// PostgreSQL 적재 대상.
pub struct PgWarehouse {
    conn: PgConnection,
    target: TableName,
}

impl PgWarehouse {
    /// 새 연결을 열어 생성합니다.
    pub async fn connect(options: &PgConnectOptions, target: TableName) -> Result<Self> {
        let conn = PgConnection::connect_with(options)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        debug!(target_table = %target, "웨어하우스 연결 완료");
        Ok(Self { conn, target })
    }

    /// 같은 연결로 다른 대상 테이블을 사용합니다.
    pub fn set_target(&mut self, target: TableName) {
        self.target = target;
    }

    /// 연결을 정상 종료합니다.
    pub async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))
    }

    /// 대상 테이블과 조회 인덱스가 없으면 생성합니다.
    #[instrument(skip(self), fields(table = %self.target))]
    pub async fn ensure_table(&mut self) -> Result<()> {
        let table = self.target.qualified();

        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                symbol_code   TEXT NOT NULL,
                category      TEXT NOT NULL,
                currency_code TEXT NOT NULL,
                currency_name TEXT NOT NULL,
                frequency     TEXT NOT NULL,
                value         DOUBLE PRECISION,
                date_key      DATE NOT NULL,
                date_full     TIMESTAMP NOT NULL
            )
            "#
        );
        sqlx::query(&create_table).execute(&mut self.conn).await?;

        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {table} (symbol_code, date_key)",
            self.target.index_name()
        );
        sqlx::query(&create_index).execute(&mut self.conn).await?;

        info!(table = %table, "대상 테이블 준비 완료");
        Ok(())
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    fn target(&self) -> String {
        self.target.qualified()
    }

    #[instrument(skip(self), fields(table = %self.target))]
    async fn max_loaded_date(&mut self, symbol_code: &str) -> Result<Option<NaiveDate>> {
        let sql = format!(
            "SELECT MAX(date_key) FROM {} WHERE symbol_code = $1",
            self.target.qualified()
        );

        let max: Option<NaiveDate> = sqlx::query_scalar(&sql)
            .bind(symbol_code)
            .fetch_one(&mut self.conn)
            .await?;

        debug!(symbol_code = symbol_code, watermark = ?max, "워터마크 조회");
        Ok(max)
    }

    #[instrument(skip(self, rows), fields(table = %self.target, count = rows.len()))]
    async fn load(&mut self, rows: &[PriceRow]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let table = self.target.qualified();
        // 임시 스키마로 한정 (같은 이름의 영구 테이블과 구분)
        let staging = format!("pg_temp.{}", self.target.staging());
        let columns = PRICE_ROW_COLUMNS.join(", ");
        let src_columns = PRICE_ROW_COLUMNS
            .iter()
            .map(|c| format!("src.{c}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut tx = self
            .conn
            .begin()
            .await
            .map_err(|e| DataError::StagingError(e.to_string()))?;

        sqlx::query(&format!(
            "CREATE TEMP TABLE {staging} (LIKE {table} INCLUDING DEFAULTS) ON COMMIT DROP"
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| DataError::StagingError(e.to_string()))?;

        let insert_sql = format!(
            r#"
            INSERT INTO {staging} ({columns})
            SELECT * FROM UNNEST(
                $1::text[], $2::text[], $3::text[], $4::text[], $5::text[],
                $6::float8[], $7::date[], $8::timestamp[]
            )
            "#
        );

        let mut staged: u64 = 0;
        for chunk in rows.chunks(STAGING_CHUNK_SIZE) {
            let symbol_codes: Vec<&str> = chunk.iter().map(|r| r.symbol_code.as_str()).collect();
            let categories: Vec<&str> = chunk.iter().map(|r| r.category.as_str()).collect();
            let currency_codes: Vec<&str> =
                chunk.iter().map(|r| r.currency_code.as_str()).collect();
            let currency_names: Vec<&str> =
                chunk.iter().map(|r| r.currency_name.as_str()).collect();
            let frequencies: Vec<&str> = chunk.iter().map(|r| r.frequency.code()).collect();
            let values: Vec<Option<f64>> = chunk.iter().map(|r| r.value).collect();
            let date_keys: Vec<NaiveDate> = chunk.iter().map(|r| r.date_key).collect();
            let date_fulls: Vec<NaiveDateTime> = chunk.iter().map(|r| r.date_full).collect();

            let result = sqlx::query(&insert_sql)
                .bind(&symbol_codes)
                .bind(&categories)
                .bind(&currency_codes)
                .bind(&currency_names)
                .bind(&frequencies)
                .bind(&values)
                .bind(&date_keys)
                .bind(&date_fulls)
                .execute(&mut *tx)
                .await
                .map_err(|e| DataError::StagingError(e.to_string()))?;

            staged += result.rows_affected();
        }

        debug!(staging = %staging, staged = staged, "스테이징 완료");

        // 같은 배치 안의 중복 키는 하나만 남김
        let merge_sql = format!(
            r#"
            MERGE INTO {table} AS tgt
            USING (
                SELECT DISTINCT ON (symbol_code, date_key) *
                FROM {staging}
                ORDER BY symbol_code, date_key
            ) AS src
            ON tgt.symbol_code = src.symbol_code AND tgt.date_key = src.date_key
            WHEN NOT MATCHED THEN
                INSERT ({columns})
                VALUES ({src_columns})
            "#
        );

        let inserted = sqlx::query(&merge_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| DataError::MergeError(e.to_string()))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| DataError::MergeError(e.to_string()))?;

        info!(
            table = %table,
            staged = staged,
            inserted = inserted,
            "대상 테이블 병합 완료"
        );

        Ok(inserted)
    }
}
