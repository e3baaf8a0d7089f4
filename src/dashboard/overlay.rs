use serde::{Deserialize, Serialize};

use crate::processor::stats;

/// Reference lines toggled on a distribution chart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overlay {
    pub mean: bool,
    pub median: bool,
    pub sd_band: bool,
}

/// Positions of the toggled reference lines; `None` when off or undefined
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlayBands {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// `(mean - sd, mean + sd)`
    pub sd_band: Option<(f64, f64)>,
}

impl OverlayBands {
    pub fn compute(values: &[f64], overlay: Overlay) -> Self {
        let sd_band = if overlay.sd_band {
            // the band needs the mean whether or not the mean line is shown
            match (stats::mean(values), stats::std_dev(values)) {
                (Some(m), Some(sd)) => Some((m - sd, m + sd)),
                _ => None,
            }
        } else {
            None
        };

        OverlayBands {
            mean: overlay.mean.then(|| stats::mean(values)).flatten(),
            median: overlay.median.then(|| stats::median(values)).flatten(),
            sd_band,
        }
    }
}
