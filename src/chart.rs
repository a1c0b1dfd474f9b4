use crate::constants::X_LABEL_TARGET;
use crate::sample::Sample;

/// Everything the renderer needs to draw one frame of the value chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub points: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    // (point index, timestamp) pairs, sub-sampled to avoid crowding the axis.
    // The renderer may thin these again to fit the terminal width.
    pub x_labels: Vec<(usize, String)>,
    pub latest: f64,
    pub min: f64,
    pub max: f64,
}

impl ChartView {
    /// Returns `None` for an empty window; there is nothing to scale against.
    pub fn from_samples(samples: &[Sample]) -> Option<ChartView> {
        let latest = samples.last()?.value;

        let (min, max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s.value), hi.max(s.value))
            });

        let points = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (i as f64, s.value))
            .collect();

        let step = label_step(samples.len());
        let x_labels = samples
            .iter()
            .enumerate()
            .step_by(step)
            .map(|(i, s)| (i, s.timestamp_label()))
            .collect();

        Some(ChartView {
            points,
            x_bounds: [0.0, samples.len() as f64],
            y_bounds: [min - 1.0, max + 1.0],
            x_labels,
            latest,
            min,
            max,
        })
    }
}

pub fn label_step(len: usize) -> usize {
    (len / X_LABEL_TARGET).max(1)
}
