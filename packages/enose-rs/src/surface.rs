// Visual surface layouts: which channels a surface plots, in which order,
// and how each one is labeled and colored.

use crate::buffer_set::TimeAxis;
use crate::display::DisplayParams;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TELEMETRY_CAPACITY: usize = 10_000;
pub const SIMULATION_CAPACITY: usize = 500;

/// The two plotting surfaces fed by structured streams
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Telemetry,
    Simulation,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Telemetry => f.write_str("telemetry"),
            Self::Simulation => f.write_str("simulation"),
        }
    }
}

/// One plotted channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelLayout {
    /// Field name in the inbound record
    pub key: String,
    pub label: String,
    pub short_label: String,
    /// `#RRGGBB`
    pub color: String,
}

impl ChannelLayout {
    fn new(key: &str, label: &str, short_label: &str, color: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            short_label: short_label.to_string(),
            color: color.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceLayout {
    pub title: String,
    /// Display order, index 0 is the topmost trace
    pub channels: Vec<ChannelLayout>,
    pub capacity: usize,
    pub time_axis: TimeAxis,
    pub default_params: DisplayParams,
}

impl SurfaceLayout {
    pub fn telemetry() -> Self {
        Self::telemetry_with_capacity(TELEMETRY_CAPACITY)
    }

    pub fn telemetry_with_capacity(capacity: usize) -> Self {
        Self {
            title: "E-Nouse Data".to_string(),
            channels: vec![
                ChannelLayout::new("co_mics", "CO (MiCS)", "CO (M)", "#FF5252"),
                ChannelLayout::new("eth_mics", "Ethanol (MiCS)", "Eth (M)", "#448AFF"),
                ChannelLayout::new("voc_mics", "VOC (MiCS)", "VOC (M)", "#69F0AE"),
                ChannelLayout::new("no2_gm", "NO₂ (GM)", "NO₂ (G)", "#FFEB3B"),
                ChannelLayout::new("c2h5oh_gm", "Ethanol (GM)", "Eth (G)", "#E040FB"),
                ChannelLayout::new("voc_gm", "VOC (GM)", "VOC (G)", "#FFAB40"),
                ChannelLayout::new("co_gm", "CO (GM)", "CO (G)", "#FFFFFF"),
            ],
            capacity,
            time_axis: TimeAxis::SessionRelative,
            default_params: DisplayParams {
                gain: 1.0,
                spacing: 100.0,
            },
        }
    }

    pub fn simulation() -> Self {
        Self::simulation_with_capacity(SIMULATION_CAPACITY)
    }

    pub fn simulation_with_capacity(capacity: usize) -> Self {
        Self {
            title: "Signal Simulation".to_string(),
            channels: vec![
                ChannelLayout::new("x1", "Signal 1", "Signal1", "#448AFF"),
                ChannelLayout::new("x2", "Signal 2", "Signal2", "#69F0AE"),
                ChannelLayout::new("y", "Result", "Result", "#E040FB"),
            ],
            capacity,
            time_axis: TimeAxis::SourceProvided,
            default_params: DisplayParams {
                gain: 1.0,
                spacing: 0.0,
            },
        }
    }

    pub fn for_surface(surface: Surface) -> Self {
        match surface {
            Surface::Telemetry => Self::telemetry(),
            Surface::Simulation => Self::simulation(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.key.as_str())
    }

    pub fn channel(&self, key: &str) -> Option<&ChannelLayout> {
        self.channels.iter().find(|c| c.key == key)
    }
}
