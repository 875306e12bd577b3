//! Derived statistics over a session's measurement points. Nothing here is stored.

use serde::Serialize;

use crate::db::models::{MeasurementPoint, Session};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub count: usize,
    pub min_m: Option<f64>,
    pub max_m: Option<f64>,
    pub mean_m: Option<f64>,
    pub median_m: Option<f64>,
    /// Walked path through the points in capture order.
    pub path_length_m: f64,
}

impl SessionStats {
    pub fn for_session(session: &Session) -> Self {
        Self::from_points(&session.points)
    }

    pub fn from_points(points: &[MeasurementPoint]) -> Self {
        let distances: Vec<f64> = points.iter().map(|p| p.distance_m).collect();
        Self {
            count: distances.len(),
            min_m: StatsHelper::min(&distances),
            max_m: StatsHelper::max(&distances),
            mean_m: StatsHelper::mean(&distances),
            median_m: StatsHelper::median(&distances),
            path_length_m: path_length_m(points),
        }
    }
}

pub struct StatsHelper;

impl StatsHelper {
    pub fn min(values: &[f64]) -> Option<f64> {
        values.iter().copied().reduce(f64::min)
    }

    pub fn max(values: &[f64]) -> Option<f64> {
        values.iter().copied().reduce(f64::max)
    }

    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Middle value, or the mean of the two middle values for even counts.
    pub fn median(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }
}

/// Great-circle distance between two WGS84 coordinates (haversine).
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

/// Sum of great-circle hops between consecutive points ordered by capture time.
pub fn path_length_m(points: &[MeasurementPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut ordered: Vec<&MeasurementPoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.captured_at);
    ordered
        .windows(2)
        .map(|pair| haversine_m(pair[0].latitude, pair[0].longitude, pair[1].latitude, pair[1].longitude))
        .sum()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn point_at(minute: i64, distance_m: f64, latitude: f64, longitude: f64) -> MeasurementPoint {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        MeasurementPoint::new(
            "s",
            base + Duration::minutes(minute),
            distance_m,
            latitude,
            longitude,
            None,
        )
    }

    #[test]
    fn median_of_odd_and_even_counts() {
        assert_eq!(StatsHelper::median(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(StatsHelper::median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(StatsHelper::median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn empty_input_has_no_statistics() {
        let stats = SessionStats::from_points(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.min_m, None);
        assert_eq!(stats.max_m, None);
        assert_eq!(stats.mean_m, None);
        assert_eq!(stats.median_m, None);
        assert_eq!(stats.path_length_m, 0.0);
    }

    #[test]
    fn summarizes_distances() {
        let points = vec![
            point_at(0, 1.0, 52.0, 4.0),
            point_at(1, 4.0, 52.0, 4.0),
            point_at(2, 1.0, 52.0, 4.0),
        ];
        let stats = SessionStats::from_points(&points);
        assert_eq!(stats.min_m, Some(1.0));
        assert_eq!(stats.max_m, Some(4.0));
        assert_eq!(stats.mean_m, Some(2.0));
        assert_eq!(stats.median_m, Some(1.0));
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let meters = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((meters - 111_195.0).abs() < 10.0, "got {meters}");
        assert_eq!(haversine_m(52.0, 4.0, 52.0, 4.0), 0.0);
    }

    #[test]
    fn path_length_follows_capture_time_not_insertion() {
        // Inserted out of order: 0 -> 2 -> 1 by time is 0 -> 1 -> 2.
        let points = vec![
            point_at(0, 1.0, 0.0, 0.0),
            point_at(2, 1.0, 2.0, 0.0),
            point_at(1, 1.0, 1.0, 0.0),
        ];
        let expected = 2.0 * haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((path_length_m(&points) - expected).abs() < 1e-6);
    }

    #[test]
    fn single_point_has_no_path() {
        assert_eq!(path_length_m(&[point_at(0, 1.0, 52.0, 4.0)]), 0.0);
    }
}
