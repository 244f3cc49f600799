//! Answer cell decoding.
//!
//! Response exports store each answer as a small JSON object such as
//! `{"value":2}`, often wrapped in one layer of CSV-style quoting with the
//! inner quotes doubled: `"{""value"":2}"`. This is the only tolerant
//! boundary of the pipeline: every failure collapses to "no answer".

use std::borrow::Cow;

use serde_json::Value;

use crate::error::DecodeFailure;
use crate::model::CellValue;

/// Decode a cell into an answer code, or `None` if it holds no usable answer.
pub fn decode(cell: &CellValue) -> Option<i64> {
    match try_decode(cell) {
        Ok(code) => Some(code),
        Err(reason) => {
            if reason != DecodeFailure::Empty {
                tracing::trace!(?cell, %reason, "answer cell not decodable");
            }
            None
        }
    }
}

/// Decode a cell, keeping the reason when it holds no usable answer.
pub fn try_decode(cell: &CellValue) -> Result<i64, DecodeFailure> {
    let text = cell.as_text().ok_or(DecodeFailure::Empty)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(DecodeFailure::Empty);
    }

    let unquoted = strip_quotes(text);
    let parsed: Value = serde_json::from_str(&unquoted).map_err(|_| DecodeFailure::InvalidJson)?;
    let object = parsed.as_object().ok_or(DecodeFailure::NotAnObject)?;
    let value = object.get("value").ok_or(DecodeFailure::MissingValue)?;
    to_integer(value).ok_or(DecodeFailure::NotAnInteger)
}

/// Strip exactly one layer of surrounding `"` and un-double the inner quotes.
fn strip_quotes(text: &str) -> Cow<'_, str> {
    match text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) => Cow::Owned(inner.replace("\"\"", "\"")),
        None => Cow::Borrowed(text),
    }
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?.trunc();
            (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
