use super::{FieldKind, OrmError, OrmResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeSet;
use std::fmt;

/// 时间字段的文本格式，精确到纳秒。
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";
/// 解析时允许任意位数的小数秒（包括没有小数部分）。
const TIME_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// 与数据库交换的动态值。
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", u8::from(*b)),
            Value::Int(n) => write!(f, "{n}"),
            Value::UInt(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Text(v.format(TIME_FORMAT).to_string())
    }
}

fn unsupported(target: &str, value: &Value) -> OrmError {
    OrmError::UnsupportedType(format!("cannot decode {value:?} as {target}"))
}

/// 字段值与 [`Value`] 之间的双向转换。
pub trait Column: Sized {
    const KIND: FieldKind;

    fn encode(&self) -> OrmResult<Value>;
    fn decode(value: Value) -> OrmResult<Self>;
}

impl Column for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn encode(&self) -> OrmResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn decode(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            Value::Int(n) => Ok(n != 0),
            Value::UInt(n) => Ok(n != 0),
            Value::Text(ref s) => s
                .trim()
                .parse::<i64>()
                .map(|n| n != 0)
                .map_err(|_| unsupported("bool", &value)),
            Value::Float(_) => Err(unsupported("bool", &value)),
        }
    }
}

macro_rules! signed_column {
    ($($ty:ty => $bits:expr),* $(,)?) => {
        $(
            impl Column for $ty {
                const KIND: FieldKind = FieldKind::Int($bits);

                fn encode(&self) -> OrmResult<Value> {
                    Ok(Value::Int(i64::from(*self)))
                }

                fn decode(value: Value) -> OrmResult<Self> {
                    let wide = match value {
                        Value::Null => return Ok(0),
                        Value::Bool(b) => i64::from(b),
                        Value::Int(n) => n,
                        Value::UInt(n) => {
                            i64::try_from(n).map_err(|_| unsupported(stringify!($ty), &value))?
                        }
                        Value::Text(ref s) => s
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| unsupported(stringify!($ty), &value))?,
                        Value::Float(_) => return Err(unsupported(stringify!($ty), &value)),
                    };
                    <$ty>::try_from(wide).map_err(|_| unsupported(stringify!($ty), &Value::Int(wide)))
                }
            }
        )*
    };
}

macro_rules! unsigned_column {
    ($($ty:ty => $bits:expr),* $(,)?) => {
        $(
            impl Column for $ty {
                const KIND: FieldKind = FieldKind::UInt($bits);

                fn encode(&self) -> OrmResult<Value> {
                    Ok(Value::UInt(u64::from(*self)))
                }

                fn decode(value: Value) -> OrmResult<Self> {
                    let wide = match value {
                        Value::Null => return Ok(0),
                        Value::Bool(b) => u64::from(b),
                        Value::UInt(n) => n,
                        Value::Int(n) => {
                            u64::try_from(n).map_err(|_| unsupported(stringify!($ty), &value))?
                        }
                        Value::Text(ref s) => s
                            .trim()
                            .parse::<u64>()
                            .map_err(|_| unsupported(stringify!($ty), &value))?,
                        Value::Float(_) => return Err(unsupported(stringify!($ty), &value)),
                    };
                    <$ty>::try_from(wide).map_err(|_| unsupported(stringify!($ty), &Value::UInt(wide)))
                }
            }
        )*
    };
}

signed_column!(i8 => 8, i16 => 16, i32 => 32, i64 => 64);
unsigned_column!(u8 => 8, u16 => 16, u32 => 32, u64 => 64);

impl Column for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn encode(&self) -> OrmResult<Value> {
        Ok(Value::Float(*self))
    }

    fn decode(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(0.0),
            Value::Float(n) => Ok(n),
            Value::Int(n) => Ok(n as f64),
            Value::UInt(n) => Ok(n as f64),
            Value::Text(ref s) => s.trim().parse().map_err(|_| unsupported("f64", &value)),
            Value::Bool(_) => Err(unsupported("f64", &value)),
        }
    }
}

impl Column for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn encode(&self) -> OrmResult<Value> {
        Ok(Value::Float(f64::from(*self)))
    }

    fn decode(value: Value) -> OrmResult<Self> {
        f64::decode(value).map(|n| n as f32)
    }
}

impl Column for String {
    const KIND: FieldKind = FieldKind::Text;

    fn encode(&self) -> OrmResult<Value> {
        Ok(Value::Text(self.clone()))
    }

    fn decode(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }
}

impl Column for NaiveDateTime {
    const KIND: FieldKind = FieldKind::Timestamp;

    fn encode(&self) -> OrmResult<Value> {
        Ok(Value::from(*self))
    }

    fn decode(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(NaiveDateTime::default()),
            Value::Text(ref s) => NaiveDateTime::parse_from_str(s.trim(), TIME_PARSE_FORMAT)
                .map_err(|e| OrmError::Codec(format!("invalid time {s:?}: {e}"))),
            other => Err(unsupported("timestamp", &other)),
        }
    }
}

fn decode_json<T: DeserializeOwned + Default>(value: Value) -> OrmResult<T> {
    match value {
        Value::Null => Ok(T::default()),
        Value::Text(s) if s.trim().is_empty() => Ok(T::default()),
        Value::Text(s) => Ok(serde_json::from_str(&s)?),
        other => Err(unsupported("aggregate", &other)),
    }
}

impl<T: Serialize + DeserializeOwned> Column for Vec<T> {
    const KIND: FieldKind = FieldKind::Aggregate;

    fn encode(&self) -> OrmResult<Value> {
        Ok(Value::Text(serde_json::to_string(self)?))
    }

    fn decode(value: Value) -> OrmResult<Self> {
        decode_json(value)
    }
}

impl<T: Serialize + DeserializeOwned + Ord> Column for BTreeSet<T> {
    const KIND: FieldKind = FieldKind::Aggregate;

    fn encode(&self) -> OrmResult<Value> {
        Ok(Value::Text(serde_json::to_string(self)?))
    }

    fn decode(value: Value) -> OrmResult<Self> {
        decode_json(value)
    }
}

/// 以 JSON 文本持久化任意结构体字段。
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned + Default> Column for Json<T> {
    const KIND: FieldKind = FieldKind::Aggregate;

    fn encode(&self) -> OrmResult<Value> {
        Ok(Value::Text(serde_json::to_string(&self.0)?))
    }

    fn decode(value: Value) -> OrmResult<Self> {
        decode_json(value).map(Json)
    }
}
