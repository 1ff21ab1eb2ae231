//! Error types for chart rendering.

/// Errors from building or encoding a chart.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("no data to plot")]
    NoData,
    #[error("bin count must be at least 1, got {0}")]
    InvalidBins(usize),
    #[error("data contains non-finite values")]
    NonFinite,
    #[error("canvas {width}x{height} is too small for the chart layout")]
    CanvasTooSmall { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_error_display() {
        assert_eq!(ChartError::NoData.to_string(), "no data to plot");
        assert_eq!(
            ChartError::InvalidBins(0).to_string(),
            "bin count must be at least 1, got 0"
        );
        assert_eq!(
            ChartError::CanvasTooSmall {
                width: 10,
                height: 5
            }
            .to_string(),
            "canvas 10x5 is too small for the chart layout"
        );
    }
}
