// Display transform: per-channel baseline, gain and vertical stacking
//
// For channel `i` of `N` (index 0 drawn on top):
//
//   baseline_i    = min(channel_i)            (0 when empty)
//   offset_i      = (N - 1 - i) * spacing
//   display_value = (raw - baseline_i) * gain + offset_i
//
// The baseline is taken over the currently retained window, so it drifts as
// old samples are evicted.

use crate::buffer_set::BufferSnapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DisplayError {
    #[error("Gain must be a finite value greater than zero, got {0}")]
    InvalidGain(f64),

    #[error("Spacing must be a finite value of at least zero, got {0}")]
    InvalidSpacing(f64),
}

/// Operator-adjustable parameters, read-only during a transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayParams {
    pub gain: f64,
    pub spacing: f64,
}

impl Default for DisplayParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            spacing: 0.0,
        }
    }
}

impl DisplayParams {
    pub fn new(gain: f64, spacing: f64) -> Result<Self, DisplayError> {
        let params = Self { gain, spacing };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), DisplayError> {
        if !self.gain.is_finite() || self.gain <= 0.0 {
            return Err(DisplayError::InvalidGain(self.gain));
        }
        if !self.spacing.is_finite() || self.spacing < 0.0 {
            return Err(DisplayError::InvalidSpacing(self.spacing));
        }
        Ok(())
    }
}

/// Display-ready points of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySeries {
    pub key: String,
    pub baseline: f64,
    pub offset: f64,
    /// `(time, display_value)`, oldest first
    pub points: Vec<(f64, f64)>,
}

/// Output of one transform, channels in display order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayFrame {
    pub series: Vec<DisplaySeries>,
}

impl DisplayFrame {
    pub fn get(&self, key: &str) -> Option<&DisplaySeries> {
        self.series.iter().find(|s| s.key == key)
    }

    pub fn values(&self, key: &str) -> Option<Vec<f64>> {
        self.get(key)
            .map(|s| s.points.iter().map(|&(_, v)| v).collect())
    }
}

/// Map a snapshot and parameters to stacked display series
pub fn transform(snapshot: &BufferSnapshot, params: &DisplayParams) -> DisplayFrame {
    let n = snapshot.channels.len();

    let series = snapshot
        .channels
        .iter()
        .enumerate()
        .map(|(i, channel)| {
            let baseline = channel.min.unwrap_or(0.0);
            let offset = (n - 1 - i) as f64 * params.spacing;
            let points = snapshot
                .times
                .iter()
                .zip(&channel.values)
                .map(|(&t, &raw)| (t, (raw - baseline) * params.gain + offset))
                .collect();

            DisplaySeries {
                key: channel.key.clone(),
                baseline,
                offset,
                points,
            }
        })
        .collect();

    DisplayFrame { series }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_set::{BufferSet, ChannelSnapshot, TimeAxis};
    use crate::message::Sample;

    fn snapshot(columns: Vec<(&str, Vec<f64>)>) -> BufferSnapshot {
        let len = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        BufferSnapshot {
            times: (0..len).map(|i| i as f64).collect(),
            channels: columns
                .into_iter()
                .map(|(k, v)| ChannelSnapshot::from_values(k, v))
                .collect(),
        }
    }

    #[test]
    fn test_single_channel_baseline_is_running_minimum() {
        let mut set = BufferSet::new(["co_mics"], 10, TimeAxis::SessionRelative);
        set.append_sample(&Sample::new(0.0, [("co_mics".to_string(), 2.0)]));
        set.append_sample(&Sample::new(1.0, [("co_mics".to_string(), 5.0)]));

        let frame = transform(&set.snapshot(), &DisplayParams::new(1.0, 0.0).unwrap());
        let series = frame.get("co_mics").unwrap();

        assert_eq!(series.baseline, 2.0);
        assert_eq!(series.points, vec![(0.0, 0.0), (1.0, 3.0)]);
    }

    #[test]
    fn test_channels_stack_from_bottom_up() {
        let snap = snapshot(vec![
            ("top", vec![10.0, 11.0]),
            ("middle", vec![-4.0, -2.0]),
            ("bottom", vec![100.0, 100.5]),
        ]);
        let frame = transform(&snap, &DisplayParams::new(2.0, 50.0).unwrap());

        assert_eq!(frame.values("top").unwrap(), vec![100.0, 102.0]);
        assert_eq!(frame.values("middle").unwrap(), vec![50.0, 54.0]);
        assert_eq!(frame.values("bottom").unwrap(), vec![0.0, 1.0]);
        assert_eq!(frame.get("top").unwrap().offset, 100.0);
    }

    #[test]
    fn test_transform_is_repeatable() {
        let snap = snapshot(vec![("a", vec![3.0, 1.0, 4.0]), ("b", vec![1.0, 5.0, 9.0])]);
        let params = DisplayParams::new(1.5, 12.0).unwrap();

        assert_eq!(transform(&snap, &params), transform(&snap, &params));
    }

    #[test]
    fn test_gain_scales_amplitude_without_changing_shape() {
        let snap = snapshot(vec![("a", vec![3.0, 1.0, 4.0, 1.0, 5.0])]);
        let unit = transform(&snap, &DisplayParams::new(1.0, 0.0).unwrap());
        let tripled = transform(&snap, &DisplayParams::new(3.0, 0.0).unwrap());

        let unit = unit.values("a").unwrap();
        let tripled = tripled.values("a").unwrap();
        for (u, t) in unit.iter().zip(&tripled) {
            assert!((u * 3.0 - t).abs() < 1e-12);
        }
    }

    #[test]
    fn test_baseline_drifts_with_eviction() {
        let mut set = BufferSet::new(["a"], 2, TimeAxis::SessionRelative);
        for (t, v) in [(0.0, 1.0), (1.0, 6.0), (2.0, 4.0)] {
            set.append_sample(&Sample::new(t, [("a".to_string(), v)]));
        }

        let frame = transform(&set.snapshot(), &DisplayParams::default());
        assert_eq!(frame.get("a").unwrap().baseline, 4.0);
        assert_eq!(frame.values("a").unwrap(), vec![2.0, 0.0]);
    }

    #[test]
    fn test_empty_snapshot_yields_empty_series() {
        let set = BufferSet::new(["a", "b"], 4, TimeAxis::SessionRelative);
        let frame = transform(&set.snapshot(), &DisplayParams::new(1.0, 10.0).unwrap());

        assert_eq!(frame.series.len(), 2);
        assert!(frame.series.iter().all(|s| s.points.is_empty()));
        assert_eq!(frame.get("a").unwrap().baseline, 0.0);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert_eq!(
            DisplayParams::new(0.0, 1.0),
            Err(DisplayError::InvalidGain(0.0))
        );
        assert_eq!(
            DisplayParams::new(1.0, -1.0),
            Err(DisplayError::InvalidSpacing(-1.0))
        );
        assert!(DisplayParams::new(f64::NAN, 1.0).is_err());
    }
}
