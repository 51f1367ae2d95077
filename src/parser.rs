//! Ingestion of the station document (JSON) and the trip table (CSV).
//!
//! This is the only place raw records are inspected. Station identifiers are
//! normalized to trimmed strings here so that station and trip keys compare
//! exactly downstream. Records missing a required field are rejected one by
//! one; a document that cannot be read at all fails as a whole.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::model::{Station, Trip};

/// Columns the trip table must carry.
pub const TRIP_COLUMNS: [&str; 4] = [
    "start_station_id",
    "end_station_id",
    "started_at",
    "ended_at",
];

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("station document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("station document has no station list (expected data.stations, stations or an array)")]
    NoStationList,
    #[error("trip table could not be read: {0}")]
    Csv(#[from] csv::Error),
    #[error("trip table is missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("record {index}: missing field '{field}'")]
    MissingField { index: usize, field: &'static str },
    #[error("record {index}: invalid {field} '{value}'")]
    InvalidField {
        index: usize,
        field: &'static str,
        value: String,
    },
    #[error("record {index}: duplicate station id '{id}'")]
    DuplicateStation { index: usize, id: String },
    #[error("record {index}: malformed row: {source}")]
    MalformedRow { index: usize, source: csv::Error },
}

/// Records that passed validation, plus the reasons the others were dropped.
#[derive(Debug)]
pub struct Ingested<T> {
    pub records: Vec<T>,
    pub rejected: Vec<IngestError>,
}

impl<T> Default for Ingested<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> Ingested<T> {
    fn reject(&mut self, error: IngestError) {
        warn!(error = %error, "Rejected record");
        self.rejected.push(error);
    }
}

/// Parses a station document.
///
/// Accepts the GBFS shape `{"data": {"stations": [...]}}`, a top-level
/// `{"stations": [...]}`, or a bare array. Each station needs `short_name`
/// (string or number), `lat` and `lon` (number or numeric string).
/// Duplicate identifiers keep the first occurrence.
///
/// # Errors
///
/// Returns an error if the bytes are not JSON or hold no station list.
pub fn parse_stations(bytes: &[u8]) -> Result<Ingested<Station>, IngestError> {
    let doc: Value = serde_json::from_slice(bytes)?;
    let list = station_list(&doc).ok_or(IngestError::NoStationList)?;

    let mut out = Ingested::default();
    let mut seen = HashSet::new();

    for (index, raw) in list.iter().enumerate() {
        match station_from_value(index, raw) {
            Ok(station) => {
                if seen.insert(station.short_name.clone()) {
                    out.records.push(station);
                } else {
                    out.reject(IngestError::DuplicateStation {
                        index,
                        id: station.short_name,
                    });
                }
            }
            Err(e) => out.reject(e),
        }
    }

    debug!(
        stations = out.records.len(),
        rejected = out.rejected.len(),
        "Parsed station document"
    );
    Ok(out)
}

fn station_list(doc: &Value) -> Option<&Vec<Value>> {
    doc.pointer("/data/stations")
        .or_else(|| doc.get("stations"))
        .unwrap_or(doc)
        .as_array()
}

fn station_from_value(index: usize, raw: &Value) -> Result<Station, IngestError> {
    let short_name = match raw.get("short_name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => numeric_id(n).ok_or_else(|| IngestError::InvalidField {
            index,
            field: "short_name",
            value: n.to_string(),
        })?,
        Some(Value::Null) | None => {
            return Err(IngestError::MissingField {
                index,
                field: "short_name",
            });
        }
        Some(other) => {
            return Err(IngestError::InvalidField {
                index,
                field: "short_name",
                value: other.to_string(),
            });
        }
    };

    Ok(Station {
        short_name,
        name: raw.get("name").and_then(Value::as_str).map(str::to_string),
        lat: coordinate(index, raw, "lat")?,
        lon: coordinate(index, raw, "lon")?,
    })
}

/// Renders a numeric identifier the way trip tables spell it: `42.0` and
/// `42` both become `"42"`. Non-finite values have no spelling.
fn numeric_id(n: &serde_json::Number) -> Option<String> {
    if let Some(v) = n.as_u64() {
        return Some(v.to_string());
    }
    if let Some(v) = n.as_i64() {
        return Some(v.to_string());
    }
    let v = n.as_f64().filter(|v| v.is_finite())?;
    if v.fract() == 0.0 && v.abs() < 1e15 {
        Some(format!("{v:.0}"))
    } else {
        Some(v.to_string())
    }
}

fn coordinate(index: usize, raw: &Value, field: &'static str) -> Result<f64, IngestError> {
    let invalid = |value: &Value| IngestError::InvalidField {
        index,
        field,
        value: value.to_string(),
    };
    let value = match raw.get(field) {
        Some(Value::Null) | None => return Err(IngestError::MissingField { index, field }),
        Some(v) => v,
    };
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(value))
}

#[derive(Debug, Deserialize)]
struct TripRow {
    start_station_id: Option<String>,
    end_station_id: Option<String>,
    started_at: Option<String>,
    ended_at: Option<String>,
}

/// Parses a trip table with a header row. Extra columns are ignored.
///
/// # Errors
///
/// Returns an error if the header cannot be read or lacks one of
/// [`TRIP_COLUMNS`].
pub fn parse_trips(bytes: &[u8]) -> Result<Ingested<Trip>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = rdr.headers()?.clone();
    for column in TRIP_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(IngestError::MissingColumn(column));
        }
    }

    let mut out = Ingested::default();
    for (index, result) in rdr.deserialize::<TripRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(source) => {
                out.reject(IngestError::MalformedRow { index, source });
                continue;
            }
        };
        match trip_from_row(index, row) {
            Ok(trip) => out.records.push(trip),
            Err(e) => out.reject(e),
        }
    }

    debug!(
        trips = out.records.len(),
        rejected = out.rejected.len(),
        "Parsed trip table"
    );
    Ok(out)
}

fn trip_from_row(index: usize, row: TripRow) -> Result<Trip, IngestError> {
    let required = |value: Option<String>, field: &'static str| {
        value
            .filter(|v| !v.is_empty())
            .ok_or(IngestError::MissingField { index, field })
    };

    let start_station_id = required(row.start_station_id, "start_station_id")?;
    let end_station_id = required(row.end_station_id, "end_station_id")?;
    let started_at = required(row.started_at, "started_at")?;
    let ended_at = required(row.ended_at, "ended_at")?;

    Ok(Trip {
        start_station_id,
        end_station_id,
        started_at: parse_timestamp(&started_at).ok_or_else(|| IngestError::InvalidField {
            index,
            field: "started_at",
            value: started_at.clone(),
        })?,
        ended_at: parse_timestamp(&ended_at).ok_or_else(|| IngestError::InvalidField {
            index,
            field: "ended_at",
            value: ended_at.clone(),
        })?,
    })
}

/// Reads a wall-clock timestamp. RFC 3339 input keeps its local time and
/// drops the offset.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_local())
        })
}
