//! Equal-width histogram: binning and rendering.

use tracing::debug;

use crate::canvas::{Canvas, Rgb};
use crate::error::ChartError;

const MARGIN_LEFT: u32 = 90;
const MARGIN_RIGHT: u32 = 30;
const MARGIN_TOP: u32 = 50;
const MARGIN_BOTTOM: u32 = 75;
/// Smallest plot area that still leaves room for ticks.
const MIN_PLOT: u32 = 20;
const TICK_LEN: i64 = 5;
const TARGET_TICKS: f64 = 6.0;
/// Fractional head-room added around the data, like matplotlib's auto margins.
const X_PAD: f64 = 0.05;
const Y_PAD: f64 = 0.05;

/// Presentation of a single-column histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSpec {
    /// Dataset column the histogram is drawn from.
    pub column: &'static str,
    pub bins: usize,
    pub width: u32,
    pub height: u32,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub fill: Rgb,
    pub edge: Rgb,
    pub grid: bool,
}

impl HistogramSpec {
    /// The chart served for every visualization request.
    pub fn passenger_ages() -> Self {
        Self {
            column: "Age",
            bins: 20,
            width: 800,
            height: 500,
            title: "Histogram of Passenger Ages",
            x_label: "Age",
            y_label: "Number of Passengers",
            fill: Rgb::SKY_BLUE,
            edge: Rgb::BLACK,
            grid: true,
        }
    }
}

/// Bin edges (`counts.len() + 1` of them) and per-bin counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Bins {
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Split `values` into `bins` equal-width bins spanning their range.
///
/// Every bin is half-open except the last, which includes the maximum. A
/// zero-width range is widened by 0.5 on each side.
pub fn bin_counts(values: &[f64], bins: usize) -> Result<Bins, ChartError> {
    if bins == 0 {
        return Err(ChartError::InvalidBins(bins));
    }
    if values.is_empty() {
        return Err(ChartError::NoData);
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ChartError::NonFinite);
    }

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges = (0..=bins).map(|i| lo + i as f64 * width).collect();
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(Bins { edges, counts })
}

/// Render a histogram of `values` as PNG bytes.
pub fn render_histogram(values: &[f64], spec: &HistogramSpec) -> Result<Vec<u8>, ChartError> {
    if spec.width < MARGIN_LEFT + MARGIN_RIGHT + MIN_PLOT
        || spec.height < MARGIN_TOP + MARGIN_BOTTOM + MIN_PLOT
    {
        return Err(ChartError::CanvasTooSmall {
            width: spec.width,
            height: spec.height,
        });
    }

    let bins = bin_counts(values, spec.bins)?;
    let first = bins.edges[0];
    let last = bins.edges[bins.edges.len() - 1];
    let pad = (last - first) * X_PAD;
    let plot = PlotArea {
        left: i64::from(MARGIN_LEFT),
        top: i64::from(MARGIN_TOP),
        right: i64::from(spec.width - MARGIN_RIGHT),
        bottom: i64::from(spec.height - MARGIN_BOTTOM),
        x_min: first - pad,
        x_max: last + pad,
        y_max: bins.max_count() as f64 * (1.0 + Y_PAD),
    };

    let mut canvas = Canvas::new(spec.width, spec.height, Rgb::WHITE);
    let x_ticks = nice_ticks(plot.x_min, plot.x_max);
    let y_ticks = nice_ticks(0.0, plot.y_max);

    if spec.grid {
        for &t in &x_ticks {
            canvas.vline(plot.px(t), plot.top, plot.bottom, Rgb::GRID_GRAY);
        }
        for &t in &y_ticks {
            canvas.hline(plot.left, plot.right, plot.py(t), Rgb::GRID_GRAY);
        }
    }

    for (i, &count) in bins.counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let x0 = plot.px(bins.edges[i]);
        let x1 = plot.px(bins.edges[i + 1]);
        let y0 = plot.py(count as f64);
        canvas.fill_rect(x0, y0, x1 + 1, plot.bottom, spec.fill);
        canvas.stroke_rect(x0, y0, x1 + 1, plot.bottom + 1, spec.edge);
    }

    canvas.stroke_rect(plot.left, plot.top, plot.right + 1, plot.bottom + 1, Rgb::BLACK);

    let step_x = tick_step(&x_ticks);
    for &t in &x_ticks {
        let x = plot.px(t);
        canvas.vline(x, plot.bottom, plot.bottom + TICK_LEN + 1, Rgb::BLACK);
        let label = tick_label(t, step_x);
        canvas.draw_text_centered(x, plot.bottom + TICK_LEN + 5, &label, 2, Rgb::BLACK);
    }

    let step_y = tick_step(&y_ticks);
    let label_h = i64::from(Canvas::line_height(2));
    for &t in &y_ticks {
        let y = plot.py(t);
        canvas.hline(plot.left - TICK_LEN, plot.left, y, Rgb::BLACK);
        let label = tick_label(t, step_y);
        let w = i64::from(crate::font::text_width(&label, 2));
        let x = plot.left - TICK_LEN - 5 - w;
        canvas.draw_text(x, y - label_h / 2, &label, 2, Rgb::BLACK);
    }

    let cx = (plot.left + plot.right) / 2;
    canvas.draw_text_centered(cx, 15, spec.title, 3, Rgb::BLACK);
    canvas.draw_text_centered(cx, i64::from(spec.height) - 30, spec.x_label, 2, Rgb::BLACK);

    let y_label_w = i64::from(crate::font::text_width(spec.y_label, 2));
    let cy = (plot.top + plot.bottom) / 2;
    canvas.draw_text_vertical(12, cy + y_label_w / 2, spec.y_label, 2, Rgb::BLACK);

    let png = canvas.encode_png()?;
    debug!(
        values = values.len(),
        bins = spec.bins,
        bytes = png.len(),
        "Histogram rendered"
    );
    Ok(png)
}

/// Pixel rectangle of the plot and the data ranges it shows.
struct PlotArea {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
    x_min: f64,
    x_max: f64,
    y_max: f64,
}

impl PlotArea {
    fn px(&self, v: f64) -> i64 {
        let t = (v - self.x_min) / (self.x_max - self.x_min);
        self.left + (t * (self.right - self.left) as f64).round() as i64
    }

    fn py(&self, v: f64) -> i64 {
        let t = v / self.y_max;
        self.bottom - (t * (self.bottom - self.top) as f64).round() as i64
    }
}

/// Round tick positions (multiples of 1, 2 or 5 times a power of ten) inside
/// `[min, max]`.
fn nice_ticks(min: f64, max: f64) -> Vec<f64> {
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return vec![min];
    }
    let raw = span / TARGET_TICKS;
    let mag = 10f64.powf(raw.log10().floor());
    let norm = raw / mag;
    let nice = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    };
    let step = nice * mag;

    let mut ticks = Vec::new();
    let mut t = (min / step).ceil() * step;
    while t <= max + step * 1e-9 && ticks.len() < 50 {
        ticks.push(t);
        t += step;
    }
    ticks
}

fn tick_step(ticks: &[f64]) -> f64 {
    if ticks.len() >= 2 {
        ticks[1] - ticks[0]
    } else {
        1.0
    }
}

fn tick_label(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil().max(0.0) as usize
    };
    // Adding 0.0 turns -0.0 into 0.0.
    format!("{:.*}", decimals, value + 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode(bytes: &[u8]) -> (u32, u32, Vec<u8>) {
        let decoder = png::Decoder::new(Cursor::new(bytes));
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        buf.truncate(info.buffer_size());
        (info.width, info.height, buf)
    }

    #[test]
    fn test_passenger_ages_spec() {
        let spec = HistogramSpec::passenger_ages();
        assert_eq!(spec.column, "Age");
        assert_eq!(spec.bins, 20);
        assert_eq!((spec.width, spec.height), (800, 500));
        assert_eq!(spec.title, "Histogram of Passenger Ages");
        assert_eq!(spec.y_label, "Number of Passengers");
        assert!(spec.grid);
    }

    #[test]
    fn test_bin_counts_equal_width() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let bins = bin_counts(&values, 5).unwrap();
        assert_eq!(bins.edges, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        // Last bin is closed on the right and takes 8, 9 and 10.
        assert_eq!(bins.counts, vec![2, 2, 2, 2, 3]);
        assert_eq!(bins.counts.iter().sum::<usize>(), values.len());
        assert_eq!(bins.max_count(), 3);
    }

    #[test]
    fn test_bin_counts_single_value_range() {
        let bins = bin_counts(&[30.0, 30.0, 30.0], 2).unwrap();
        assert_eq!(bins.edges, vec![29.5, 30.0, 30.5]);
        assert_eq!(bins.counts, vec![0, 3]);
    }

    #[test]
    fn test_bin_counts_rejects_bad_input() {
        assert!(matches!(bin_counts(&[], 20), Err(ChartError::NoData)));
        assert!(matches!(
            bin_counts(&[1.0], 0),
            Err(ChartError::InvalidBins(0))
        ));
        assert!(matches!(
            bin_counts(&[1.0, f64::NAN], 3),
            Err(ChartError::NonFinite)
        ));
    }

    #[test]
    fn test_render_histogram_produces_png_of_spec_size() {
        let ages: Vec<f64> = (0..891).map(|i| (i % 80) as f64 + 0.42).collect();
        let spec = HistogramSpec::passenger_ages();
        let bytes = render_histogram(&ages, &spec).unwrap();
        assert!(!bytes.is_empty());

        let (w, h, pixels) = decode(&bytes);
        assert_eq!((w, h), (800, 500));
        let has_fill = pixels
            .chunks_exact(4)
            .any(|p| p[0] == 0x87 && p[1] == 0xCE && p[2] == 0xEB);
        assert!(has_fill, "expected sky-blue bar pixels");
    }

    #[test]
    fn test_render_histogram_single_value() {
        let bytes = render_histogram(&[42.0], &HistogramSpec::passenger_ages()).unwrap();
        let (w, h, _) = decode(&bytes);
        assert_eq!((w, h), (800, 500));
    }

    #[test]
    fn test_render_histogram_no_data() {
        let err = render_histogram(&[], &HistogramSpec::passenger_ages()).unwrap_err();
        assert!(matches!(err, ChartError::NoData));
    }

    #[test]
    fn test_render_histogram_canvas_too_small() {
        let spec = HistogramSpec {
            width: 50,
            height: 50,
            ..HistogramSpec::passenger_ages()
        };
        let err = render_histogram(&[1.0, 2.0], &spec).unwrap_err();
        assert!(matches!(err, ChartError::CanvasTooSmall { .. }));
    }

    #[test]
    fn test_nice_ticks() {
        assert_eq!(nice_ticks(0.0, 80.0), vec![0.0, 20.0, 40.0, 60.0, 80.0]);
        assert_eq!(nice_ticks(-3.6, 83.6).first(), Some(&0.0));
        assert_eq!(nice_ticks(5.0, 5.0), vec![5.0]);
    }

    #[test]
    fn test_tick_label_formatting() {
        assert_eq!(tick_label(20.0, 10.0), "20");
        assert_eq!(tick_label(0.5, 0.5), "0.5");
        assert_eq!(tick_label(-0.0, 1.0), "0");
    }
}
