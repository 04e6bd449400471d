use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SUMMARY_KEYS: [&str; 3] = ["executive_summary", "llm_response", "full_synthesis"];
pub const TIMESTAMP_KEYS: [&str; 4] = ["timestamp", "analysis_timestamp", "@timestamp", "time"];
pub const SEVERITY_KEYS: [&str; 2] = ["severity_level", "severity"];

/// A schema-less analysis document as delivered by the upstream store.
///
/// Accessors return `None` unless the field is present, non-null and of the
/// requested type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self { Self(Map::new()) }

    pub fn from_value(v: Value) -> Option<Self> {
        match v {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.0.get(key) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    pub fn has(&self, key: &str) -> bool { self.get(key).is_some() }

    /// Non-empty (after trim) string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64).filter(|x| x.is_finite())
    }

    /// Non-negative whole number. `3.0` is accepted, `3.5` and `-1` are not.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        let v = self.get(key)?;
        if let Some(n) = v.as_u64() { return Some(n); }
        match v.as_f64() {
            Some(x) if x.is_finite() && x >= 0.0 && x.fract() == 0.0 && x <= u64::MAX as f64 => Some(x as u64),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Array whose every element is a string.
    pub fn get_str_list(&self, key: &str) -> Option<Vec<String>> {
        let arr = self.get(key)?.as_array()?;
        arr.iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// First non-empty value among `keys`.
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get_str(k))
    }

    /// The free-text blob mined for metrics. Structured `full_synthesis`
    /// payloads are rendered back to compact JSON text.
    pub fn summary(&self) -> Option<String> {
        for key in SUMMARY_KEYS {
            match self.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
                Some(v @ (Value::Object(_) | Value::Array(_))) => {
                    if let Ok(s) = serde_json::to_string(v) { return Some(s); }
                }
                _ => {}
            }
        }
        None
    }

    pub fn severity_text(&self) -> Option<&str> { self.first_str(&SEVERITY_KEYS) }

    /// First timestamp-bearing field that parses to a valid instant.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        TIMESTAMP_KEYS.iter().find_map(|k| self.get(k).and_then(parse_ts_value))
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self { Self(map) }
}

pub fn parse_ts_value(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => parse_ts_candidate(s.trim()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => parse_ts_number_string(&i.to_string()),
            None => n.as_f64().and_then(parse_ts_float),
        },
        _ => None,
    }
}

pub fn parse_ts_candidate(s: &str) -> Option<DateTime<Utc>> {
    parse_ts_string(s)
        .or_else(|| parse_ts_number_string(s))
        .or_else(|| if s.contains('.') { s.parse::<f64>().ok().and_then(parse_ts_float) } else { None })
}

fn parse_ts_string(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let offset_fmts = [
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%z",
    ];
    for f in offset_fmts.iter() {
        if let Ok(dt) = DateTime::parse_from_str(s, f) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    let naive_fmts = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];
    for f in naive_fmts.iter() {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, f) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    // Bare dates are midnight UTC.
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

fn parse_ts_number_string(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) { return None; }
    let n = s.parse::<i64>().ok()?;
    match s.len() {
        10 => DateTime::<Utc>::from_timestamp(n, 0),
        13 => DateTime::<Utc>::from_timestamp(n / 1000, ((n % 1000) * 1_000_000) as u32),
        16 => DateTime::<Utc>::from_timestamp(n / 1_000_000, ((n % 1_000_000) * 1_000) as u32),
        _ => None,
    }
}

/// Fractional epoch values; the integer part's digit count picks the unit.
fn parse_ts_float(x: f64) -> Option<DateTime<Utc>> {
    if !x.is_finite() || x < 0.0 { return None; }
    let per_sec = match (x.trunc() as i64).to_string().len() {
        10 => 1.0,
        13 => 1e3,
        16 => 1e6,
        _ => return None,
    };
    let secs = x / per_sec;
    let nanos = ((secs - secs.trunc()) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::<Utc>::from_timestamp(secs.trunc() as i64, nanos)
}
