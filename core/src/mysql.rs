//! 基于 sqlx 的 MySQL 执行器

use crate::bind_value::BindValue;
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::executor::{Connector, DbExecutor, Record};
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, MySql, MySqlConnection, Row, TypeInfo, ValueRef};

/// 打开 `sqlx::MySqlConnection`
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

#[async_trait::async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DbExecutor>> {
        let conn = MySqlConnection::connect_with(&config.to_connect_options()).await?;
        Ok(Box::new(conn))
    }
}

/// 按位置绑定参数
fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q BindValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        BindValue::Null => query.bind(None::<String>),
        BindValue::Bool(b) => query.bind(*b),
        BindValue::Int64(i) => query.bind(*i),
        BindValue::UInt64(u) => query.bind(*u),
        BindValue::Float64(f) => query.bind(*f),
        BindValue::String(s) => query.bind(s.as_str()),
        BindValue::Bytes(b) => query.bind(b.as_slice()),
        BindValue::DateTime(dt) => query.bind(*dt),
    }
}

fn build_query<'q>(sql: &'q str, params: &'q [BindValue]) -> Query<'q, MySql, MySqlArguments> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, value| bind_value(query, value))
}

/// 列值的解码方式，由列类型名决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnDecoder {
    Bool,
    Int,
    UInt,
    Float,
    Double,
    Decimal,
    DateTime,
    Date,
    Time,
    Json,
    Bytes,
    /// BIT(n) 按大端字节折叠为整数
    Bits,
    /// GEOMETRY 没有 sqlx 类型映射，按原始字节读取
    RawBytes,
    Text,
}

fn column_decoder(type_name: &str) -> ColumnDecoder {
    match type_name {
        "BOOLEAN" => ColumnDecoder::Bool,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => ColumnDecoder::Int,
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" | "YEAR" => ColumnDecoder::UInt,
        "FLOAT" => ColumnDecoder::Float,
        "DOUBLE" => ColumnDecoder::Double,
        "DECIMAL" => ColumnDecoder::Decimal,
        "DATETIME" | "TIMESTAMP" => ColumnDecoder::DateTime,
        "DATE" => ColumnDecoder::Date,
        "TIME" => ColumnDecoder::Time,
        "JSON" => ColumnDecoder::Json,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            ColumnDecoder::Bytes
        }
        "BIT" => ColumnDecoder::Bits,
        "GEOMETRY" => ColumnDecoder::RawBytes,
        _ => ColumnDecoder::Text,
    }
}

fn bits_to_u64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

/// 根据列类型名把单列解码为 JSON 值
fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match column_decoder(type_name) {
        ColumnDecoder::Bool => Value::Bool(row.try_get::<bool, _>(index)?),
        ColumnDecoder::Int => Value::from(row.try_get::<i64, _>(index)?),
        ColumnDecoder::UInt => Value::from(row.try_get::<u64, _>(index)?),
        ColumnDecoder::Float => Value::from(row.try_get::<f32, _>(index)? as f64),
        ColumnDecoder::Double => Value::from(row.try_get::<f64, _>(index)?),
        // 与 mysql 驱动一致，DECIMAL 以字符串返回，避免精度丢失
        ColumnDecoder::Decimal => {
            Value::String(row.try_get::<BigDecimal, _>(index)?.to_string())
        }
        ColumnDecoder::DateTime => Value::String(
            row.try_get::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%d %H:%M:%S%.f")
                .to_string(),
        ),
        ColumnDecoder::Date => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
        ColumnDecoder::Time => Value::String(row.try_get::<NaiveTime, _>(index)?.to_string()),
        ColumnDecoder::Json => row.try_get::<Value, _>(index)?,
        ColumnDecoder::Bytes => Value::from(row.try_get::<Vec<u8>, _>(index)?),
        ColumnDecoder::Bits => {
            Value::from(bits_to_u64(&row.try_get_unchecked::<Vec<u8>, _>(index)?))
        }
        ColumnDecoder::RawBytes => Value::from(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        ColumnDecoder::Text => Value::String(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

fn row_to_record(row: &MySqlRow) -> Result<Record> {
    let mut record = Record::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

#[async_trait::async_trait]
impl DbExecutor for MySqlConnection {
    async fn execute(&mut self, sql: &str, params: &[BindValue]) -> Result<u64> {
        let result = build_query(sql, params).execute(&mut *self).await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&mut self, sql: &str, params: &[BindValue]) -> Result<Vec<Record>> {
        let rows = build_query(sql, params).fetch_all(&mut *self).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Connection::close(*self).await?;
        Ok(())
    }
}
