//! Pure post-processing of store rows returned by the data tier
//!
//! Every strategy takes the raw rows of a successful reply and computes a summary from them.
//! Strategies hold no state, running one twice on the same rows yields the same result.
//! Rows are plain JSON objects whose fields may be encoded as strings or numbers.

mod geo;
mod hours;
mod trend;

pub mod statistics;

pub use geo::geographic_dispersion;
pub use hours::{business_hours_analysis, hours_vs_age_correlation};
pub use trend::expansion_trend;

use super::{
    BUSINESS_HOURS_ANALYSIS, EXPANSION_TREND, GEOGRAPHIC_DISPERSION, HOURS_VS_AGE_CORRELATION,
};
use chrono::NaiveTime;
use serde_json::{Map, Value};
use thiserror::Error;

/// Single record as transmitted by the data tier
pub type Row = Map<String, Value>;

/// Function computing a summary from a list of rows
pub type Strategy = fn(&[Row]) -> Result<Value, AnalysisError>;

/// Errors caused by rows that do not carry the expected data
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The row lacks a required field or it is null
    #[error("field {0} is missing")]
    MissingField(&'static str),
    /// The field can not be interpreted as a number
    #[error("field {field} is not a number: {value}")]
    InvalidNumber {
        /// Name of the field
        field: &'static str,
        /// Offending value
        value: String,
    },
    /// The field can not be interpreted as a time of day
    #[error("field {field} is not a time of day: {value}")]
    InvalidTime {
        /// Name of the field
        field: &'static str,
        /// Offending value
        value: String,
    },
    /// The field does not start with a `YYYY-MM` month
    #[error("field {field} does not start with a month: {value}")]
    InvalidDate {
        /// Name of the field
        field: &'static str,
        /// Offending value
        value: String,
    },
}

/// Strategies for all analysis actions, keyed by action name
pub fn strategies() -> [(&'static str, Strategy); 4] {
    [
        (BUSINESS_HOURS_ANALYSIS, business_hours_analysis as Strategy),
        (EXPANSION_TREND, expansion_trend as Strategy),
        (GEOGRAPHIC_DISPERSION, geographic_dispersion as Strategy),
        (HOURS_VS_AGE_CORRELATION, hours_vs_age_correlation as Strategy),
    ]
}

fn text(row: &Row, field: &'static str) -> Result<String, AnalysisError> {
    match row.get(field) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(Value::Number(value)) => Ok(value.to_string()),
        Some(Value::Bool(value)) => Ok(value.to_string()),
        _ => Err(AnalysisError::MissingField(field)),
    }
}

fn number(row: &Row, field: &'static str) -> Result<f64, AnalysisError> {
    match row.get(field) {
        Some(Value::Number(value)) => value.as_f64().ok_or(AnalysisError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
        Some(Value::String(value)) => {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| AnalysisError::InvalidNumber {
                    field,
                    value: value.clone(),
                })
        }
        Some(Value::Null) | None => Err(AnalysisError::MissingField(field)),
        Some(other) => Err(AnalysisError::InvalidNumber {
            field,
            value: other.to_string(),
        }),
    }
}

fn time(row: &Row, field: &'static str) -> Result<NaiveTime, AnalysisError> {
    let value = text(row, field)?;
    let trimmed = value.trim();

    NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| AnalysisError::InvalidTime { field, value })
}

/// Daily business hours of a store, closing past midnight is counted towards the same day
fn business_hours(row: &Row) -> Result<f64, AnalysisError> {
    let open = time(row, "open_time")?;
    let close = time(row, "close_time")?;

    let mut minutes = close.signed_duration_since(open).num_minutes();
    if minutes < 0 {
        minutes += 24 * 60;
    }

    Ok(minutes as f64 / 60.0)
}

#[cfg(test)]
pub(crate) fn rows(value: Value) -> Vec<Row> {
    serde_json::from_value(value).unwrap()
}
