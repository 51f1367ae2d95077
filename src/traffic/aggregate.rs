use crate::model::{Station, StationTraffic, Trip};
use std::collections::HashMap;

/// Annotates every station with the arrivals and departures found in `trips`.
///
/// The result keeps the order of `stations`. Trips referring to an unknown
/// station id are counted but never matched, so those stations stay at zero.
pub fn compute_station_traffic<'a>(
    stations: &'a [Station],
    trips: &[Trip],
) -> Vec<StationTraffic<'a>> {
    let mut departures: HashMap<&str, usize> = HashMap::new();
    let mut arrivals: HashMap<&str, usize> = HashMap::new();

    for trip in trips {
        *departures.entry(trip.start_station_id.as_str()).or_default() += 1;
        *arrivals.entry(trip.end_station_id.as_str()).or_default() += 1;
    }

    stations
        .iter()
        .map(|station| {
            let id = station.short_name.as_str();
            StationTraffic::new(
                station,
                arrivals.get(id).copied().unwrap_or(0),
                departures.get(id).copied().unwrap_or(0),
            )
        })
        .collect()
}

/// Returns the station with the highest total traffic, if any has traffic.
///
/// Ties resolve to the station listed first.
pub fn busiest_station<'s, 'a>(traffic: &'s [StationTraffic<'a>]) -> Option<&'s StationTraffic<'a>> {
    // max_by_key keeps the last maximum, so walk backwards
    traffic
        .iter()
        .rev()
        .filter(|t| t.total_traffic() > 0)
        .max_by_key(|t| t.total_traffic())
}
