use crate::model::Trip;
use chrono::Timelike;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Half-width of the window around the selected minute, in minutes.
pub const WINDOW_MINUTES: u32 = 60;

/// Last valid minute of the day (23:59).
pub const LAST_MINUTE: u32 = 24 * 60 - 1;

/// Slider value meaning "no time filter".
pub const ANY_TIME_SLIDER: i32 = -1;

/// A minute of the day, always within `0..=LAST_MINUTE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MinuteOfDay(u32);

impl MinuteOfDay {
    pub fn new(minute: u32) -> Result<Self, TimeFilterError> {
        if minute <= LAST_MINUTE {
            Ok(Self(minute))
        } else {
            Err(TimeFilterError::OutOfRange(minute as i64))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// The time-of-day selection driving the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    #[default]
    Any,
    Minute(MinuteOfDay),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimeFilterError {
    #[error("time value {0} is outside -1..=1439")]
    OutOfRange(i64),
    #[error("cannot parse time filter '{0}', expected -1, any, a minute of day or HH:MM")]
    Unparseable(String),
}

impl TimeFilter {
    /// Selects `minute` of the day, rejecting anything past 23:59.
    pub fn at(minute: u32) -> Result<Self, TimeFilterError> {
        MinuteOfDay::new(minute).map(TimeFilter::Minute)
    }

    /// Maps a slider position onto a filter: `-1` disables filtering,
    /// `0..=1439` selects that minute of the day.
    pub fn from_slider(value: i32) -> Result<Self, TimeFilterError> {
        match value {
            ANY_TIME_SLIDER => Ok(TimeFilter::Any),
            v => u32::try_from(v)
                .map_err(|_| TimeFilterError::OutOfRange(v as i64))
                .and_then(TimeFilter::at),
        }
    }

    /// Whether `trip` started or ended within the window. Always true for `Any`.
    pub fn matches(&self, trip: &Trip) -> bool {
        match *self {
            TimeFilter::Any => true,
            TimeFilter::Minute(m) => {
                within_window(minutes_since_midnight(&trip.started_at), m.get())
                    || within_window(minutes_since_midnight(&trip.ended_at), m.get())
            }
        }
    }
}

impl FromStr for TimeFilter {
    type Err = TimeFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Ok(TimeFilter::Any);
        }
        if let Some((h, m)) = s.split_once(':') {
            let (h, m) = match (h.parse::<u32>(), m.parse::<u32>()) {
                (Ok(h), Ok(m)) if h < 24 && m < 60 => (h, m),
                _ => return Err(TimeFilterError::Unparseable(s.to_string())),
            };
            return TimeFilter::at(h * 60 + m);
        }
        let value: i64 = s
            .parse()
            .map_err(|_| TimeFilterError::Unparseable(s.to_string()))?;
        i32::try_from(value)
            .map_err(|_| TimeFilterError::OutOfRange(value))
            .and_then(TimeFilter::from_slider)
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeFilter::Any => write!(f, "(any time)"),
            TimeFilter::Minute(m) => write!(f, "{}", format_time(m.get())),
        }
    }
}

/// Reduces a timestamp to `hour * 60 + minute`, dropping date and seconds.
pub fn minutes_since_midnight<T: Timelike>(time: &T) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Renders a minute of day the way a US short time reads, e.g. `8:05 AM`.
///
/// Values past 1439 wrap onto the next day, so 1440 reads `12:00 AM`.
pub fn format_time(minute: u32) -> String {
    let hour = (minute / 60) % 24;
    let min = minute % 60;
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{hour12}:{min:02} {suffix}")
}

fn within_window(minute: u32, selected: u32) -> bool {
    // plain distance on the 0..1440 line, no wrap at midnight
    minute.abs_diff(selected) <= WINDOW_MINUTES
}

/// Keeps the trips that started or ended within an hour of the selected
/// minute, in their original order.
///
/// With [`TimeFilter::Any`] the input slice is handed back borrowed.
pub fn filter_trips_by_time(trips: &[Trip], filter: TimeFilter) -> Cow<'_, [Trip]> {
    match filter {
        TimeFilter::Any => Cow::Borrowed(trips),
        TimeFilter::Minute(_) => Cow::Owned(
            trips
                .iter()
                .filter(|trip| filter.matches(trip))
                .cloned()
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::test_support::trip;

    fn at(minute: u32) -> TimeFilter {
        TimeFilter::at(minute).unwrap()
    }

    #[test]
    fn test_any_returns_input_slice_itself() {
        let trips = vec![
            trip("A", "B", "08:10", "08:40"),
            trip("B", "A", "23:00", "23:30"),
        ];

        let filtered = filter_trips_by_time(&trips, TimeFilter::Any);

        assert!(matches!(filtered, Cow::Borrowed(_)));
        assert!(std::ptr::eq(filtered.as_ptr(), trips.as_ptr()));
        assert_eq!(filtered.as_ref(), trips.as_slice());
    }

    #[test]
    fn test_window_includes_trip_near_selected_minute() {
        let trips = vec![trip("A", "B", "08:10", "08:40")];

        assert_eq!(filter_trips_by_time(&trips, at(480)).len(), 1);
        assert!(filter_trips_by_time(&trips, at(700)).is_empty());
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        // starts 10:00 (600), ends 10:20 (620)
        let trips = vec![trip("A", "B", "10:00", "10:20")];

        assert_eq!(filter_trips_by_time(&trips, at(540)).len(), 1);
        assert_eq!(filter_trips_by_time(&trips, at(680)).len(), 1);
        assert!(filter_trips_by_time(&trips, at(539)).is_empty());
        assert!(filter_trips_by_time(&trips, at(681)).is_empty());
    }

    #[test]
    fn test_end_time_alone_is_enough() {
        let trips = vec![trip("A", "B", "06:00", "09:00")];

        assert_eq!(filter_trips_by_time(&trips, at(570)).len(), 1);
    }

    #[test]
    fn test_window_does_not_wrap_at_midnight() {
        let trips = vec![trip("A", "B", "23:50", "23:55")];

        assert!(filter_trips_by_time(&trips, at(10)).is_empty());
    }

    #[test]
    fn test_filter_preserves_order_and_is_idempotent() {
        let trips = vec![
            trip("A", "B", "08:00", "08:10"),
            trip("B", "C", "12:00", "12:10"),
            trip("C", "A", "08:30", "08:50"),
            trip("A", "C", "09:05", "09:20"),
        ];
        let filter = at(8 * 60 + 20);

        let once = filter_trips_by_time(&trips, filter);
        let twice = filter_trips_by_time(&once, filter);

        let starts: Vec<_> = once.iter().map(|t| t.start_station_id.as_str()).collect();
        assert_eq!(starts, vec!["A", "C", "A"]);
        assert_eq!(once.as_ref(), twice.as_ref());
        assert!(once.iter().all(|t| trips.contains(t)));
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(filter_trips_by_time(&[], TimeFilter::Any).is_empty());
        assert!(filter_trips_by_time(&[], at(0)).is_empty());
    }

    #[test]
    fn test_from_slider() {
        assert_eq!(TimeFilter::from_slider(-1), Ok(TimeFilter::Any));
        assert_eq!(TimeFilter::from_slider(0), Ok(at(0)));
        assert_eq!(TimeFilter::from_slider(1439), Ok(at(1439)));
        assert_eq!(
            TimeFilter::from_slider(1440),
            Err(TimeFilterError::OutOfRange(1440))
        );
        assert!(TimeFilter::from_slider(-2).is_err());
    }

    #[test]
    fn test_parse_time_filter() {
        assert_eq!("any".parse::<TimeFilter>(), Ok(TimeFilter::Any));
        assert_eq!("-1".parse::<TimeFilter>(), Ok(TimeFilter::Any));
        assert_eq!("480".parse::<TimeFilter>(), Ok(at(480)));
        assert_eq!("08:05".parse::<TimeFilter>(), Ok(at(485)));
        assert!("24:00".parse::<TimeFilter>().is_err());
        assert!("soon".parse::<TimeFilter>().is_err());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "12:00 AM");
        assert_eq!(format_time(485), "8:05 AM");
        assert_eq!(format_time(720), "12:00 PM");
        assert_eq!(format_time(1439), "11:59 PM");
        assert_eq!(format_time(1440), "12:00 AM");
        assert_eq!(TimeFilter::Any.to_string(), "(any time)");
        assert_eq!(at(1020).to_string(), "5:00 PM");
    }

    #[test]
    fn test_minute_of_day_rejects_values_past_midnight() {
        assert_eq!(MinuteOfDay::new(1439).map(MinuteOfDay::get), Ok(1439));
        assert_eq!(MinuteOfDay::new(1440), Err(TimeFilterError::OutOfRange(1440)));
        assert_eq!(TimeFilter::at(5000), Err(TimeFilterError::OutOfRange(5000)));
        assert_eq!(TimeFilter::at(0), TimeFilter::from_slider(0));
    }

    #[test]
    fn test_minutes_since_midnight_ignores_seconds() {
        let t = trip("A", "B", "13:45", "14:00");
        assert_eq!(minutes_since_midnight(&t.started_at), 825);
    }
}
