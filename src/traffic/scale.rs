use crate::model::StationTraffic;

/// Largest circle radius handed to the renderer.
pub const MAX_RADIUS: f64 = 25.0;

/// Square-root scale from station traffic to circle radius.
///
/// Area grows linearly with traffic. The domain is `[0, max_traffic / 2]`,
/// so the busiest half of the range saturates at [`MAX_RADIUS`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusScale {
    domain_max: f64,
}

impl RadiusScale {
    pub fn new(domain_max: f64) -> Self {
        Self {
            domain_max: domain_max.max(0.0),
        }
    }

    /// Builds the scale from an annotated station set, taking half of the
    /// highest total traffic as the domain upper bound.
    pub fn from_traffic(traffic: &[StationTraffic<'_>]) -> Self {
        let max = traffic.iter().map(|t| t.total_traffic()).max().unwrap_or(0);
        Self::new(max as f64 / 2.0)
    }

    pub fn domain_max(&self) -> f64 {
        self.domain_max
    }

    /// Radius for a traffic count, clamped to `[0, MAX_RADIUS]`.
    ///
    /// A scale built from traffic-free data maps everything to 0.
    pub fn radius(&self, traffic: usize) -> f64 {
        if self.domain_max == 0.0 {
            return 0.0;
        }
        let t = (traffic as f64 / self.domain_max).min(1.0);
        t.sqrt() * MAX_RADIUS
    }
}

/// Quantizes a departure ratio into three equal-width buckets over `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowScale {
    thresholds: [f64; 2],
    buckets: [f64; 3],
}

impl Default for FlowScale {
    fn default() -> Self {
        Self {
            thresholds: [1.0 / 3.0, 2.0 / 3.0],
            buckets: [0.0, 0.5, 1.0],
        }
    }
}

impl FlowScale {
    /// Bucket for a ratio. A value sitting on a threshold goes to the upper
    /// bucket; values outside `[0, 1]` land in the end buckets.
    pub fn bucket(&self, ratio: f64) -> f64 {
        let idx = self.thresholds.iter().take_while(|&&t| ratio >= t).count();
        self.buckets[idx]
    }

    /// Bucket for a station's departure ratio, `None` when it has no traffic.
    pub fn for_station(&self, traffic: &StationTraffic<'_>) -> Option<f64> {
        departure_ratio(traffic.departures(), traffic.total_traffic()).map(|r| self.bucket(r))
    }
}

/// `departures / total`, undefined (and so `None`) at zero traffic.
pub fn departure_ratio(departures: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(departures as f64 / total as f64)
    }
}
