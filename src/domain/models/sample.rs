//! Acquired samples and their row representation.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Column header of a session row log.
pub const ROW_HEADER: &str = "Counter,Time,Rate,TimeStamp,Raw,Temp";

/// One acquisition, created per loop iteration and persisted immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Samples taken since the last reset, including this one.
    pub counter: u64,
    /// Seconds since the session's elapsed-time origin.
    pub elapsed_time: f64,
    /// `counter / elapsed_time`, zero while no time has elapsed.
    pub rate: f64,
    /// Local wall-clock time of the reading, ISO-8601 text.
    pub timestamp: String,
    /// Unconverted instrument reading.
    pub raw_value: f64,
    /// Converted temperature; `None` when the raw value was outside the
    /// model domain.
    pub converted_value: Option<f64>,
}

impl Sample {
    /// Serialize as one log row, without the trailing newline.
    ///
    /// Floats keep a decimal point (`2.0`), an invalid temperature is an
    /// empty field.
    pub fn to_row(&self) -> String {
        let temp = self
            .converted_value
            .map(|t| format!("{t:?}"))
            .unwrap_or_default();
        format!(
            "{},{:?},{:?},{},{:?},{}",
            self.counter, self.elapsed_time, self.rate, self.timestamp, self.raw_value, temp
        )
    }

    /// Parse a row previously produced by [`Sample::to_row`].
    pub fn from_row(line: &str) -> DomainResult<Self> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
        if fields.len() != 6 {
            return Err(DomainError::RowParse(format!(
                "expected 6 fields, found {}",
                fields.len()
            )));
        }

        let counter = fields[0]
            .parse::<u64>()
            .map_err(|e| DomainError::RowParse(format!("counter '{}': {e}", fields[0])))?;
        let elapsed_time = parse_float("time", fields[1])?;
        let rate = parse_float("rate", fields[2])?;
        let raw_value = parse_float("raw", fields[4])?;
        let converted_value = if fields[5].is_empty() {
            None
        } else {
            Some(parse_float("temp", fields[5])?)
        };

        Ok(Self {
            counter,
            elapsed_time,
            rate,
            timestamp: fields[3].to_string(),
            raw_value,
            converted_value,
        })
    }
}

fn parse_float(name: &str, field: &str) -> DomainResult<f64> {
    let value = field
        .parse::<f64>()
        .map_err(|e| DomainError::RowParse(format!("{name} '{field}': {e}")))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DomainError::RowParse(format!("{name} '{field}' is not finite")))
    }
}
