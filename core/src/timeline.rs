use crate::model::{Snapshot, SnapshotIdx};
use serde::{Deserialize, Serialize};

/// Playback interval at 1x speed.
pub const PLAYBACK_BASE_MS: f64 = 600.0;
pub const PLAYBACK_SPEEDS: [f64; 4] = [0.25, 0.5, 1.0, 2.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub idx: SnapshotIdx,
    /// `raw` scaled into [0, 1] against the whole series.
    pub value: f64,
    pub raw: f64,
    pub reviewed: bool,
    pub matches_filter: bool,
}

/// Normalize `metric_key` across all snapshots for a scrub bar. Points keep input
/// order. `bucket_filter` is a bitmask; `None` matches every snapshot.
pub fn build_timeline_data(snapshots: &[Snapshot], metric_key: &str, bucket_filter: Option<u32>) -> Vec<TimelinePoint> {
    let raws: Vec<f64> = snapshots.iter().map(|s| s.metric(metric_key)).collect();
    let max = raws.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = raws.iter().copied().fold(f64::INFINITY, f64::min);
    // bars grow from zero unless the series dips below it
    let lo = min.min(0.0);
    let span = max - lo;

    snapshots
        .iter()
        .zip(raws)
        .map(|(s, raw)| TimelinePoint {
            idx: s.idx,
            value: if span > 0.0 { (raw - lo) / span } else { 0.0 },
            raw,
            reviewed: s.reviewed,
            matches_filter: bucket_filter.map_or(true, |mask| s.buckets & mask != 0),
        })
        .collect()
}

/// Map a scrub-bar fraction onto the nearest snapshot index.
pub fn position_to_commit_index(fraction: f64, total: usize) -> usize {
    if total <= 1 || !fraction.is_finite() {
        return 0;
    }
    let last = (total - 1) as f64;
    (fraction.clamp(0.0, 1.0) * last).round() as usize
}

pub fn commit_index_to_position(idx: usize, total: usize) -> f64 {
    if total <= 1 {
        return 0.0;
    }
    idx.min(total - 1) as f64 / (total - 1) as f64
}

/// Milliseconds between steps at `speed`x. Non-positive speeds fall back to 1x.
pub fn playback_interval_ms(speed: f64) -> u64 {
    let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
    (PLAYBACK_BASE_MS / speed).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(idx: u32, g: f64, buckets: u32) -> Snapshot {
        let mut s = Snapshot::new(idx, format!("c{idx}"), vec![]);
        s.magnitude.insert("g".into(), g);
        s.buckets = buckets;
        s
    }

    #[test]
    fn normalizes_against_max() {
        let pts = build_timeline_data(&[snap(0, 1.0, 0), snap(1, 3.0, 0), snap(2, 2.0, 0)], "g", None);
        let values: Vec<f64> = pts.iter().map(|p| p.value).collect();
        assert!((values[0] - 1.0 / 3.0).abs() < 1e-9);
        assert!((values[1] - 1.0).abs() < 1e-9);
        assert!((values[2] - 2.0 / 3.0).abs() < 1e-9);
        assert!(pts.iter().all(|p| p.matches_filter));
        assert_eq!(pts[1].raw, 3.0);
    }

    #[test]
    fn flat_series() {
        let pts = build_timeline_data(&[snap(0, 4.0, 0), snap(1, 4.0, 0)], "g", None);
        assert!(pts.iter().all(|p| p.value == 1.0));
        let pts = build_timeline_data(&[snap(0, 0.0, 0), snap(1, 0.0, 0)], "g", None);
        assert!(pts.iter().all(|p| p.value == 0.0));
        let pts = build_timeline_data(&[snap(0, 0.0, 0)], "missing", None);
        assert_eq!(pts[0].value, 0.0);
        assert!(build_timeline_data(&[], "g", None).is_empty());
    }

    #[test]
    fn bucket_filter_tags_points() {
        let pts = build_timeline_data(&[snap(0, 1.0, 0b01), snap(1, 1.0, 0b10), snap(2, 1.0, 0b11)], "g", Some(0b10));
        let m: Vec<bool> = pts.iter().map(|p| p.matches_filter).collect();
        assert_eq!(m, vec![false, true, true]);
    }

    #[test]
    fn position_mapping_round_trips() {
        for total in 2..20 {
            for idx in 0..total {
                assert_eq!(position_to_commit_index(commit_index_to_position(idx, total), total), idx);
            }
        }
        assert_eq!(position_to_commit_index(0.7, 1), 0);
        assert_eq!(commit_index_to_position(5, 0), 0.0);
        assert_eq!(position_to_commit_index(-3.0, 10), 0);
        assert_eq!(position_to_commit_index(9.0, 10), 9);
    }

    #[test]
    fn playback_intervals() {
        let ms: Vec<u64> = PLAYBACK_SPEEDS.iter().map(|&s| playback_interval_ms(s)).collect();
        assert_eq!(ms, vec![2400, 1200, 600, 300]);
        assert!(ms.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(playback_interval_ms(0.0), 600);
    }
}
