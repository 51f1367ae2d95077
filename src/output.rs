//! Station marks for the rendering layer, and their persistence.
//!
//! A mark is everything a map needs to draw one station: its position, its
//! counts, a circle radius, a departure-ratio bucket and the tooltip text.

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::model::StationTraffic;
use crate::traffic::{FlowScale, RadiusScale};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationMark {
    pub short_name: String,
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub arrivals: usize,
    pub departures: usize,
    pub total_traffic: usize,
    pub radius: f64,
    /// Departure-ratio bucket (0, 0.5 or 1); empty for stations without traffic.
    pub departure_ratio: Option<f64>,
    pub tooltip: String,
}

/// `"{total} trips ({departures} departures, {arrivals} arrivals)"`
pub fn tooltip(traffic: &StationTraffic<'_>) -> String {
    format!(
        "{} trips ({} departures, {} arrivals)",
        traffic.total_traffic(),
        traffic.departures(),
        traffic.arrivals()
    )
}

/// Applies both scales to every annotated station, keeping station order.
pub fn build_marks(
    traffic: &[StationTraffic<'_>],
    radius: &RadiusScale,
    flow: &FlowScale,
) -> Vec<StationMark> {
    traffic
        .iter()
        .map(|t| StationMark {
            short_name: t.station().short_name.clone(),
            name: t.station().name.clone(),
            lat: t.station().lat,
            lon: t.station().lon,
            arrivals: t.arrivals(),
            departures: t.departures(),
            total_traffic: t.total_traffic(),
            radius: radius.radius(t.total_traffic()),
            departure_ratio: flow.for_station(t),
            tooltip: tooltip(t),
        })
        .collect()
}

/// Logs marks as pretty-printed JSON.
pub fn print_json(marks: &[StationMark]) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(marks)?);
    Ok(())
}

/// Writes marks to a CSV file with a header row, replacing any existing file.
pub fn write_csv(path: &str, marks: &[StationMark]) -> Result<()> {
    debug!(path, rows = marks.len(), "Writing station marks");

    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for mark in marks {
        writer.serialize(mark)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Station;
    use crate::traffic::compute_station_traffic;
    use crate::traffic::test_support::{station, trip};
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_stations() -> Vec<Station> {
        vec![station("A"), station("B"), station("C")]
    }

    #[test]
    fn test_tooltip_text() {
        let a = station("A");
        assert_eq!(
            tooltip(&StationTraffic::new(&a, 2, 5)),
            "7 trips (5 departures, 2 arrivals)"
        );
    }

    #[test]
    fn test_build_marks_applies_scales() {
        let stations = sample_stations();
        let trips = vec![
            trip("A", "B", "08:00", "08:20"),
            trip("A", "B", "08:30", "08:50"),
        ];
        let traffic = compute_station_traffic(&stations, &trips);
        let radius = RadiusScale::from_traffic(&traffic);

        let marks = build_marks(&traffic, &radius, &FlowScale::default());

        assert_eq!(marks.len(), 3);
        assert_eq!(marks[0].short_name, "A");
        assert_eq!(marks[0].radius, 25.0);
        assert_eq!(marks[0].departure_ratio, Some(1.0));
        assert_eq!(marks[1].departure_ratio, Some(0.0));
        assert_eq!(marks[2].radius, 0.0);
        assert_eq!(marks[2].departure_ratio, None);
        assert_eq!(marks[2].tooltip, "0 trips (0 departures, 0 arrivals)");
    }

    #[test]
    fn test_marks_serialize_missing_ratio_as_null() {
        let stations = sample_stations();
        let traffic = compute_station_traffic(&stations, &[trip("A", "B", "08:00", "08:20")]);
        let marks = build_marks(
            &traffic,
            &RadiusScale::from_traffic(&traffic),
            &FlowScale::default(),
        );

        let value = serde_json::to_value(&marks).unwrap();

        assert_eq!(value[0]["short_name"], "A");
        assert_eq!(value[0]["departure_ratio"], 1.0);
        assert_eq!(value[0]["tooltip"], "1 trips (1 departures, 0 arrivals)");
        assert!(value[2]["departure_ratio"].is_null());
        assert_eq!(value[2]["total_traffic"], 0);

        print_json(&marks).unwrap();
    }

    #[test]
    fn test_write_csv_writes_header_and_rows() {
        let path = temp_path("bluebike_traffic_test_marks.csv");
        let _ = fs::remove_file(&path);

        let stations = sample_stations();
        let traffic = compute_station_traffic(&stations, &[trip("A", "C", "12:00", "12:10")]);
        let marks = build_marks(
            &traffic,
            &RadiusScale::from_traffic(&traffic),
            &FlowScale::default(),
        );
        write_csv(&path, &marks).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("short_name,name,lat,lon,arrivals,departures"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_csv_replaces_existing_file() {
        let path = temp_path("bluebike_traffic_test_replace.csv");
        let stations = sample_stations();
        let traffic = compute_station_traffic(&stations, &[]);
        let marks = build_marks(&traffic, &RadiusScale::new(0.0), &FlowScale::default());

        write_csv(&path, &marks).unwrap();
        write_csv(&path, &marks[..1]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        fs::remove_file(&path).unwrap();
    }
}
