use std::{cmp::Ordering, fmt};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::rows::Row;

/// A single cell of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<Value>),
    Row(Row),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
            Value::List(_) | Value::Row(_) => self.to_json().to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn from_json(value: JsonValue) -> Value {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            JsonValue::Object(map) => Value::Row(Row::from_json_map(map)),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Integer(i) => JsonValue::from(*i),
            Value::Float(f) => JsonValue::from(*f),
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Row(row) => row.to_json(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::List(_) => 4,
            Value::Row(_) => 5,
        }
    }

    /// Total ordering used by sort stages. Values of different kinds order by kind,
    /// with `Null` first; integers and floats compare numerically.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    let ord = left.total_cmp(right);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Row(a), Value::Row(b)) => a.to_json().to_string().cmp(&b.to_json().to_string()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Row> for Value {
    fn from(value: Row) -> Self {
        Value::Row(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_local());
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Parses a date parameter: relative keywords, datetimes, then plain dates at midnight.
pub fn parse_date_value(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    let today = || Local::now().date_naive();
    let relative = match trimmed.to_ascii_lowercase().as_str() {
        "now" => return Ok(Local::now().naive_local()),
        "today" => Some(today()),
        "yesterday" => Some(
            today()
                .pred_opt()
                .ok_or_else(|| anyhow!("date out of range"))?,
        ),
        "tomorrow" => Some(
            today()
                .succ_opt()
                .ok_or_else(|| anyhow!("date out of range"))?,
        ),
        _ => None,
    };
    if let Some(date) = relative {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    if let Ok(parsed) = parse_naive_datetime(trimmed) {
        return Ok(parsed);
    }
    parse_naive_date(trimmed)
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| anyhow!("Failed to parse '{value}' as date"))
}

pub fn value_to_evalexpr(value: &Value) -> evalexpr::Value {
    match value {
        Value::Null => evalexpr::Value::Empty,
        Value::String(s) => evalexpr::Value::String(s.clone()),
        Value::Integer(i) => evalexpr::Value::Int(*i),
        Value::Float(f) => evalexpr::Value::Float(*f),
        Value::Boolean(b) => evalexpr::Value::Boolean(*b),
        Value::List(items) => evalexpr::Value::Tuple(items.iter().map(value_to_evalexpr).collect()),
        Value::Row(row) => evalexpr::Value::String(row.to_json().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalexpr::Value as EvalValue;
    use serde_json::json;

    #[test]
    fn parse_naive_date_supports_multiple_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(parse_naive_date("2024-05-06").unwrap(), expected);
        assert_eq!(parse_naive_date("06/05/2024").unwrap(), expected);
        assert_eq!(parse_naive_date("2024/05/06").unwrap(), expected);
    }

    #[test]
    fn parse_date_value_accepts_dates_datetimes_and_rfc3339() {
        let midnight = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_date_value("2024-05-06").unwrap(), midnight);

        let afternoon = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_date_value("2024-05-06T14:30:00").unwrap(), afternoon);
        assert_eq!(
            parse_date_value("2024-05-06T14:30:00+02:00").unwrap(),
            afternoon
        );
        assert!(parse_date_value("not a date").is_err());
    }

    #[test]
    fn parse_date_value_resolves_relative_keywords() {
        let today = parse_date_value("today").unwrap();
        let tomorrow = parse_date_value("Tomorrow").unwrap();
        let yesterday = parse_date_value("yesterday").unwrap();
        assert_eq!((tomorrow - today).num_days(), 1);
        assert_eq!((today - yesterday).num_days(), 1);
    }

    #[test]
    fn from_json_builds_nested_rows_in_document_order() {
        let value = Value::from_json(json!({"name": "a", "address": {"city": "x"}}));
        let Value::Row(row) = value else {
            panic!("expected row");
        };
        let keys: Vec<&str> = row.keys().collect();
        assert_eq!(keys, vec!["name", "address"]);
        assert!(matches!(row.get("address"), Some(Value::Row(_))));
    }

    #[test]
    fn total_cmp_orders_kinds_and_numbers() {
        assert_eq!(
            Value::Integer(2).total_cmp(&Value::Float(1.5)),
            Ordering::Greater
        );
        assert_eq!(
            Value::Null.total_cmp(&Value::String("a".into())),
            Ordering::Less
        );
        assert_eq!(
            Value::String("a".into()).total_cmp(&Value::String("b".into())),
            Ordering::Less
        );
    }

    #[test]
    fn value_to_evalexpr_preserves_variants() {
        assert_eq!(value_to_evalexpr(&Value::Integer(42)), EvalValue::Int(42));
        assert_eq!(
            value_to_evalexpr(&Value::Boolean(false)),
            EvalValue::Boolean(false)
        );
        assert_eq!(value_to_evalexpr(&Value::Null), EvalValue::Empty);
    }

    #[test]
    fn float_display_drops_integral_fraction() {
        assert_eq!(Value::Float(3.0).as_display(), "3");
        assert_eq!(Value::Float(2.5).as_display(), "2.5");
    }
}
