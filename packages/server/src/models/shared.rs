use chrono::DateTime;
use common::datetime::format_date;
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

/// Pagination metadata included in list responses.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 20)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 3)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// Normalize `page`/`per_page` query parameters (page >= 1, per_page 1..=100, default 20).
pub fn page_params(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    (
        page.unwrap_or(1).max(1),
        per_page.unwrap_or(20).clamp(1, 100),
    )
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Float(f64),
    Text(String),
}

/// Accept a coordinate sent either as a JSON number or a numeric string.
///
/// Blank strings decode as absent.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Float(v)) => Ok(Some(v)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid number '{s}'"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Accept a 0/1 flag sent as a boolean, an integer, or a numeric string.
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<FlagValue>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(FlagValue::Bool(b)) => i64::from(b),
        Some(FlagValue::Int(i)) => i,
        Some(FlagValue::Text(s)) => match s.trim() {
            "" => return Ok(None),
            "true" => 1,
            "false" => 0,
            other => other
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid flag '{s}'")))?,
        },
    };
    match value {
        0 | 1 => Ok(Some(value as i32)),
        other => Err(D::Error::custom(format!("flag must be 0 or 1, got {other}"))),
    }
}

/// Accept an identifier sent either as a string or as a bare number.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        None => None,
        Some(Id::Int(i)) => Some(i.to_string()),
        Some(Id::Text(s)) => Some(s),
    })
}

/// Accept a date in whatever shape the field app sends it.
///
/// Strings pass through, numbers are epoch milliseconds. Any other value
/// decodes as an empty string, which `normalize_date` turns into now.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(
            n.as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| format_date(&dt))
                .unwrap_or_default(),
        ),
        _ => Some(String::new()),
    })
}
