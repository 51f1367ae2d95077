//! Station and trip records handed to the traffic core.

use chrono::NaiveDateTime;
use serde::Serialize;

/// A bike-share dock location.
///
/// `short_name` is the identifier trips refer to through their
/// `start_station_id` / `end_station_id` columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub short_name: String,
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// A single rental, from one station to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trip {
    pub start_station_id: String,
    pub end_station_id: String,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
}

/// A station annotated with the traffic of the active trip set.
///
/// Fields are read-only; `total_traffic` always equals
/// `arrivals + departures`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationTraffic<'a> {
    #[serde(flatten)]
    station: &'a Station,
    arrivals: usize,
    departures: usize,
    total_traffic: usize,
}

impl<'a> StationTraffic<'a> {
    pub fn new(station: &'a Station, arrivals: usize, departures: usize) -> Self {
        Self {
            station,
            arrivals,
            departures,
            total_traffic: arrivals + departures,
        }
    }

    pub fn station(&self) -> &'a Station {
        self.station
    }

    pub fn id(&self) -> &str {
        &self.station.short_name
    }

    pub fn arrivals(&self) -> usize {
        self.arrivals
    }

    pub fn departures(&self) -> usize {
        self.departures
    }

    pub fn total_traffic(&self) -> usize {
        self.total_traffic
    }
}
