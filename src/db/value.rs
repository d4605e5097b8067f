use std::fmt;
use std::str::FromStr;

use duckdb::types::{ToSqlOutput, Value as DuckValue, ValueRef};
use jiff::civil::{date, Date};
use postgres::types::{accepts, private::BytesMut, to_sql_checked, IsNull, ToSql, Type};
use rust_decimal::Decimal;

/// A single query parameter.  Both drivers know how to bind it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(Date),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Date> for Value {
    fn from(v: Date) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
        }
    }
}

/// Days since 1970-01-01, the DuckDB DATE representation.
fn days_since_epoch(value: Date) -> Result<i32, jiff::Error> {
    let span = value.since(date(1970, 1, 1))?;
    Ok(span.get_days())
}

impl duckdb::ToSql for Value {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let out = match self {
            Value::Null => ToSqlOutput::Owned(DuckValue::Null),
            Value::Int(v) => ToSqlOutput::Owned(DuckValue::BigInt(*v)),
            Value::Float(v) => ToSqlOutput::Owned(DuckValue::Double(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Date(v) => {
                let days = days_since_epoch(*v)
                    .map_err(|e| duckdb::Error::ToSqlConversionFailure(Box::new(e)))?;
                ToSqlOutput::Owned(DuckValue::Date32(days))
            }
        };
        Ok(out)
    }
}

/// A float as the decimal it reads as, `1907.01537` rather than the nearest
/// binary fraction.
fn decimal(value: f64) -> Result<Decimal, rust_decimal::Error> {
    let s = format!("{:?}", value);
    Decimal::from_str(&s).or_else(|_| Decimal::from_scientific(&s))
}

/// Postgres is strict about parameter types, so the value is narrowed or
/// widened to whatever the server expects for the column.
impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>>
    where
        Self: Sized,
    {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Int(value) => match *ty {
                Type::INT2 => i16::try_from(*value)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*value)?.to_sql(ty, out),
                Type::INT8 => value.to_sql(ty, out),
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                Type::FLOAT8 => (*value as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*value).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => value.to_string().to_sql(ty, out),
                _ => Err(format!("cannot bind integer {} to column type {}", value, ty).into()),
            },
            Value::Float(value) => match *ty {
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                Type::FLOAT8 => value.to_sql(ty, out),
                Type::NUMERIC => decimal(*value)?.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => format!("{:?}", value).to_sql(ty, out),
                _ => Err(format!("cannot bind float {} to column type {}", value, ty).into()),
            },
            // death rates and counts are kept as text, the column may still
            // be numeric
            Value::Text(value) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                    value.as_str().to_sql(ty, out)
                }
                Type::INT2 => value.trim().parse::<i16>()?.to_sql(ty, out),
                Type::INT4 => value.trim().parse::<i32>()?.to_sql(ty, out),
                Type::INT8 => value.trim().parse::<i64>()?.to_sql(ty, out),
                Type::FLOAT4 => value.trim().parse::<f32>()?.to_sql(ty, out),
                Type::FLOAT8 => value.trim().parse::<f64>()?.to_sql(ty, out),
                Type::NUMERIC => Decimal::from_str(value.trim())?.to_sql(ty, out),
                _ => Err(format!("cannot bind text '{}' to column type {}", value, ty).into()),
            },
            Value::Date(value) => {
                let day = chrono::NaiveDate::from_ymd_opt(
                    value.year() as i32,
                    value.month() as u32,
                    value.day() as u32,
                )
                .ok_or_else(|| format!("date {} out of range", value))?;
                match *ty {
                    Type::DATE => day.to_sql(ty, out),
                    Type::TIMESTAMP => day.and_time(chrono::NaiveTime::MIN).to_sql(ty, out),
                    Type::TEXT | Type::VARCHAR | Type::BPCHAR => value.to_string().to_sql(ty, out),
                    _ => Err(format!("cannot bind date {} to column type {}", value, ty).into()),
                }
            }
        }
    }

    accepts!(
        INT2, INT4, INT8, FLOAT4, FLOAT8, NUMERIC, TEXT, VARCHAR, BPCHAR, NAME, UNKNOWN, DATE,
        TIMESTAMP
    );
    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::Int(3));
        assert_eq!(Value::from(Some("Recife")), Value::Text("Recife".to_string()));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(0.0123).to_string(), "0.0123");
        assert_eq!(Value::Date(date(2020, 3, 25)).to_string(), "2020-03-25");
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn epoch_days() -> Result<(), jiff::Error> {
        assert_eq!(days_since_epoch(date(1970, 1, 1))?, 0);
        assert_eq!(days_since_epoch(date(1970, 2, 1))?, 31);
        assert_eq!(days_since_epoch(date(2020, 3, 25))?, 18346);
        assert_eq!(days_since_epoch(date(1969, 12, 31))?, -1);
        Ok(())
    }

    #[test]
    fn postgres_narrowing() {
        let mut buf = BytesMut::new();
        assert!(Value::Int(4106902).to_sql(&Type::INT4, &mut buf).is_ok());
        assert!(Value::Int(i64::MAX).to_sql(&Type::INT4, &mut buf).is_err());
        assert!(Value::Int(1).to_sql(&Type::INT2, &mut buf).is_ok());
        assert!(Value::Text("x".into()).to_sql(&Type::INT4, &mut buf).is_err());
        assert!(Value::Date(date(2020, 3, 25)).to_sql(&Type::DATE, &mut buf).is_ok());
        assert!(matches!(
            Value::Null.to_sql(&Type::INT8, &mut buf),
            Ok(IsNull::Yes)
        ));
    }

    /// Encode `value` for a column of type `ty`, going through the same type
    /// check the client does.
    fn encode(value: Value, ty: &Type) -> Result<BytesMut, Box<dyn std::error::Error + Sync + Send>> {
        let mut buf = BytesMut::new();
        value.to_sql_checked(ty, &mut buf)?;
        Ok(buf)
    }

    fn encode_decimal(s: &str) -> Result<BytesMut, Box<dyn std::error::Error + Sync + Send>> {
        let mut buf = BytesMut::new();
        Decimal::from_str(s)?.to_sql(&Type::NUMERIC, &mut buf)?;
        Ok(buf)
    }

    #[test]
    fn numeric_columns() -> Result<(), Box<dyn std::error::Error + Sync + Send>> {
        assert_eq!(encode(Value::Float(1907.01537), &Type::NUMERIC)?, encode_decimal("1907.01537")?);
        assert_eq!(encode(Value::Int(4106902), &Type::NUMERIC)?, encode_decimal("4106902")?);
        assert_eq!(encode(Value::from("0.0759"), &Type::NUMERIC)?, encode_decimal("0.0759")?);
        assert!(encode(Value::from("n/a"), &Type::NUMERIC).is_err());
        assert!(encode(Value::Float(f64::NAN), &Type::NUMERIC).is_err());
        Ok(())
    }

    #[test]
    fn text_into_number_columns() -> Result<(), Box<dyn std::error::Error + Sync + Send>> {
        assert_eq!(encode(Value::from("3890"), &Type::INT4)?, encode(Value::Int(3890), &Type::INT4)?);
        assert_eq!(
            encode(Value::from("0.0759"), &Type::FLOAT8)?,
            encode(Value::Float(0.0759), &Type::FLOAT8)?
        );
        assert!(encode(Value::from("0.0759"), &Type::INT8).is_err());
        Ok(())
    }

    #[test]
    fn timestamp_columns() -> Result<(), Box<dyn std::error::Error + Sync + Send>> {
        let midnight = chrono::NaiveDate::from_ymd_opt(2020, 3, 25)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut expected = BytesMut::new();
        midnight.to_sql(&Type::TIMESTAMP, &mut expected)?;
        assert_eq!(encode(Value::Date(date(2020, 3, 25)), &Type::TIMESTAMP)?, expected);
        assert!(encode(Value::Date(date(2020, 3, 25)), &Type::TIMESTAMPTZ).is_err());
        Ok(())
    }
}
