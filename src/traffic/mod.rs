//! Station traffic computation.
//!
//! Trips are narrowed to a time window around a minute of day, grouped into
//! per-station arrival and departure counts, and mapped to a circle radius
//! and a departure-ratio bucket. Everything here is a pure function of its
//! inputs and cheap enough to rerun from scratch on every slider move.

pub mod aggregate;
pub mod filter;
pub mod scale;

pub use aggregate::{busiest_station, compute_station_traffic};
pub use filter::{MinuteOfDay, TimeFilter, filter_trips_by_time, format_time, minutes_since_midnight};
pub use scale::{FlowScale, RadiusScale, departure_ratio};
