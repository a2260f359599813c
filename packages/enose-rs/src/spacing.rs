// Auto-spacing: pick a stacking offset large enough that the widest channel
// does not overlap its neighbours.

use crate::buffer_set::BufferSnapshot;

/// Fixed headroom applied on top of the widest channel amplitude
pub const AUTO_SPACING_HEADROOM: f64 = 1.2;

/// Widest `max - min` over all channels, zero when every channel is empty
pub fn max_amplitude(snapshot: &BufferSnapshot) -> f64 {
    snapshot
        .channels
        .iter()
        .map(|c| c.amplitude())
        .fold(0.0, f64::max)
}

/// Spacing for the current buffer contents at `gain`
///
/// Returns `None` when every channel is flat or empty, in which case the
/// current spacing should be left alone.
pub fn estimate(snapshot: &BufferSnapshot, gain: f64) -> Option<f64> {
    let amplitude = max_amplitude(snapshot);
    if amplitude > 0.0 {
        Some(amplitude * gain * AUTO_SPACING_HEADROOM)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_set::ChannelSnapshot;

    fn snapshot(columns: Vec<(&str, Vec<f64>)>) -> BufferSnapshot {
        BufferSnapshot {
            times: vec![0.0; columns.first().map(|(_, v)| v.len()).unwrap_or(0)],
            channels: columns
                .into_iter()
                .map(|(k, v)| ChannelSnapshot::from_values(k, v))
                .collect(),
        }
    }

    #[test]
    fn test_uses_widest_channel() {
        let snap = snapshot(vec![("a", vec![0.0, 10.0]), ("b", vec![5.0, 5.0])]);
        let spacing = estimate(&snap, 2.0).unwrap();
        assert!((spacing - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_or_empty_buffers_leave_spacing_unset() {
        assert_eq!(estimate(&snapshot(vec![("a", vec![3.0, 3.0])]), 1.0), None);
        assert_eq!(estimate(&snapshot(vec![("a", vec![]), ("b", vec![])]), 1.0), None);
        assert_eq!(estimate(&BufferSnapshot::default(), 4.0), None);
    }

    #[test]
    fn test_negative_ranges_measure_absolute_width() {
        let snap = snapshot(vec![("a", vec![-7.0, -2.0]), ("b", vec![1.0, 2.0])]);
        assert_eq!(max_amplitude(&snap), 5.0);
    }
}
