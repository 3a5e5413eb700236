//! 绑定参数值

use crate::error::{Result, SqlChainError};
use chrono::NaiveDateTime;
use serde_json::Value;

/// 绑定值，按位置替换命令中的 `?`
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
}

impl BindValue {
    /// 转换为 JSON 值，用于日志与调试输出
    pub fn to_json(&self) -> Value {
        match self {
            BindValue::Null => Value::Null,
            BindValue::Bool(b) => Value::Bool(*b),
            BindValue::Int64(i) => Value::from(*i),
            BindValue::UInt64(u) => Value::from(*u),
            BindValue::Float64(f) => Value::from(*f),
            BindValue::String(s) => Value::String(s.clone()),
            BindValue::Bytes(b) => Value::from(b.clone()),
            BindValue::DateTime(dt) => Value::String(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        }
    }
}

impl From<String> for BindValue {
    fn from(s: String) -> Self {
        BindValue::String(s)
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        BindValue::String(s.to_string())
    }
}

impl From<i64> for BindValue {
    fn from(i: i64) -> Self {
        BindValue::Int64(i)
    }
}

impl From<i32> for BindValue {
    fn from(i: i32) -> Self {
        BindValue::Int64(i as i64)
    }
}

impl From<i16> for BindValue {
    fn from(i: i16) -> Self {
        BindValue::Int64(i as i64)
    }
}

impl From<u64> for BindValue {
    fn from(u: u64) -> Self {
        BindValue::UInt64(u)
    }
}

impl From<u32> for BindValue {
    fn from(u: u32) -> Self {
        BindValue::UInt64(u as u64)
    }
}

impl From<f64> for BindValue {
    fn from(f: f64) -> Self {
        BindValue::Float64(f)
    }
}

impl From<f32> for BindValue {
    fn from(f: f32) -> Self {
        BindValue::Float64(f as f64)
    }
}

impl From<bool> for BindValue {
    fn from(b: bool) -> Self {
        BindValue::Bool(b)
    }
}

impl From<Vec<u8>> for BindValue {
    fn from(b: Vec<u8>) -> Self {
        BindValue::Bytes(b)
    }
}

impl From<NaiveDateTime> for BindValue {
    fn from(dt: NaiveDateTime) -> Self {
        BindValue::DateTime(dt)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(BindValue::Null)
    }
}

/// 只接受标量 JSON 值，数组与对象不能作为单个参数
impl TryFrom<Value> for BindValue {
    type Error = SqlChainError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(BindValue::Null),
            Value::Bool(b) => Ok(BindValue::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(BindValue::Int64(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(BindValue::UInt64(u))
                } else if let Some(f) = n.as_f64() {
                    Ok(BindValue::Float64(f))
                } else {
                    Err(SqlChainError::InvalidArgument(format!(
                        "unsupported number: {}",
                        n
                    )))
                }
            }
            Value::String(s) => Ok(BindValue::String(s)),
            other => Err(SqlChainError::InvalidArgument(format!(
                "parameter must be a scalar value, got: {}",
                other
            ))),
        }
    }
}
