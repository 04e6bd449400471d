use crate::record::RawRecord;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("entry {index} is not a JSON object")]
    NotObject { index: usize },
    #[error("json parse error on line {line}: {source}")]
    Line { line: usize, source: serde_json::Error },
    #[error("json parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reads either a JSON array of objects or newline-delimited objects.
///
/// Search hit envelopes (`{"_source": {...}}`) are unwrapped.
pub fn parse_records(text: &str) -> Result<Vec<RawRecord>, InputError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let v: Value = serde_json::from_str(trimmed)?;
        let items = match v {
            Value::Array(items) => items,
            _ => return Err(InputError::NotObject { index: 0 }),
        };
        return items
            .into_iter()
            .enumerate()
            .map(|(index, item)| to_record(item).ok_or(InputError::NotObject { index }))
            .collect();
    }
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() { continue; }
        let v: Value = serde_json::from_str(line).map_err(|source| InputError::Line { line: i + 1, source })?;
        let index = out.len();
        out.push(to_record(v).ok_or(InputError::NotObject { index })?);
    }
    Ok(out)
}

/// Like [`parse_records`] for line-delimited input, but skips bad lines.
pub fn parse_records_lossy(text: &str) -> (Vec<RawRecord>, usize) {
    let mut out = Vec::new();
    let mut skipped = 0usize;
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() { continue; }
        match serde_json::from_str::<Value>(line).ok().and_then(to_record) {
            Some(rec) => out.push(rec),
            None => {
                skipped += 1;
                tracing::debug!(line = i + 1, "skipping line that is not a JSON object");
            }
        }
    }
    (out, skipped)
}

fn to_record(v: Value) -> Option<RawRecord> {
    match v {
        Value::Object(mut map) => match map.remove("_source") {
            Some(Value::Object(source)) => Some(RawRecord::from(source)),
            Some(other) => {
                map.insert("_source".to_string(), other);
                Some(RawRecord::from(map))
            }
            None => Some(RawRecord::from(map)),
        },
        _ => None,
    }
}
