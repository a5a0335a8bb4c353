use serde::Serialize;
use thiserror::Error;

/// Asked to compute statistics over zero samples.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot compute statistics over an empty sample set")]
pub struct EmptyInput;

/// Five-column summary over a non-empty sample set. The standard
/// deviation is the population form (divide by N, not N-1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub minimum: f64,
    pub maximum: f64,
    pub mean: f64,
    pub pstdev: f64,
    pub count: usize,
}

impl Summary {
    pub const HEADER: [&'static str; 5] = ["minimum", "maximum", "mean", "pstdev", "count"];

    /// Fixed-point cells for table and artifact output: six decimal
    /// places for the float columns, a plain integer for the count.
    pub fn row(&self) -> [String; 5] {
        [
            format!("{:.6}", self.minimum),
            format!("{:.6}", self.maximum),
            format!("{:.6}", self.mean),
            format!("{:.6}", self.pstdev),
            format!("{}", self.count),
        ]
    }
}

pub fn summarize(samples: &[f64]) -> Result<Summary, EmptyInput> {
    if samples.is_empty() {
        return Err(EmptyInput);
    }
    let count = samples.len();
    let mut minimum = f64::INFINITY;
    let mut maximum = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &sample in samples {
        minimum = minimum.min(sample);
        maximum = maximum.max(sample);
        sum += sample;
    }
    let mean = sum / count as f64;
    let variance = samples
        .iter()
        .map(|&sample| (sample - mean) * (sample - mean))
        .sum::<f64>()
        / count as f64;
    Ok(Summary {
        minimum,
        maximum,
        mean,
        pstdev: variance.sqrt(),
        count,
    })
}

/// Concatenation of every series' samples: series order first, arrival
/// order within a series.
pub fn aggregate<'a, I>(series: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut all = Vec::new();
    for samples in series {
        all.extend_from_slice(samples);
    }
    all
}

/// Bin edges and counts for one series. `edges` has one more element
/// than `counts`; the final bin is closed on both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

pub fn histogram(samples: &[f64]) -> Result<Histogram, EmptyInput> {
    let summary = summarize(samples)?;
    let bins = auto_bin_count(samples, summary.minimum, summary.maximum);
    let width = (summary.maximum - summary.minimum) / bins as f64;

    let mut edges = Vec::with_capacity(bins + 1);
    for i in 0..=bins {
        edges.push(summary.minimum + width * i as f64);
    }
    edges[bins] = summary.maximum;

    let mut counts = vec![0u64; bins];
    for &sample in samples {
        let index = if width > 0.0 {
            (((sample - summary.minimum) / width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[index] += 1;
    }
    Ok(Histogram { edges, counts })
}

/// Automatic bin count: the larger of the Sturges and Freedman-Diaconis
/// estimates, degenerating to a single bin when the data has no spread.
fn auto_bin_count(samples: &[f64], minimum: f64, maximum: f64) -> usize {
    let n = samples.len();
    if n < 2 || maximum <= minimum {
        return 1;
    }
    let sturges = (n as f64).log2().ceil() as usize + 1;

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let iqr = percentile(&sorted, 0.75) - percentile(&sorted, 0.25);
    let bin_width = 2.0 * iqr / (n as f64).cbrt();
    let fd = if bin_width > 0.0 {
        ((maximum - minimum) / bin_width).ceil() as usize
    } else {
        0
    };
    sturges.max(fd).max(1)
}

/// Linear-interpolated percentile over an already sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_known_values() {
        let summary = summarize(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(summary.minimum, 1.0);
        assert_eq!(summary.maximum, 4.0);
        assert_eq!(summary.mean, 2.5);
        assert!((summary.pstdev - 1.118033988749895).abs() < 1e-12);
        assert_eq!(summary.count, 4);
    }

    #[test]
    fn test_summarize_empty_is_error() {
        assert_eq!(summarize(&[]), Err(EmptyInput));
    }

    #[test]
    fn test_summarize_single_sample() {
        let summary = summarize(&[7.5]).unwrap();
        assert_eq!(summary.minimum, 7.5);
        assert_eq!(summary.maximum, 7.5);
        assert_eq!(summary.mean, 7.5);
        assert_eq!(summary.pstdev, 0.0);
        assert_eq!(summary.count, 1);
    }

    #[test]
    fn test_summary_invariants() {
        let samples = [3.0, 1.5, 9.25, 0.5, 4.0];
        let summary = summarize(&samples).unwrap();
        assert!(summary.minimum <= summary.mean);
        assert!(summary.mean <= summary.maximum);
        assert!(summary.pstdev >= 0.0);
        assert_eq!(summary.count, samples.len());
    }

    #[test]
    fn test_summary_row_formatting() {
        let summary = summarize(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let row = summary.row();
        assert_eq!(row[0], "1.000000");
        assert_eq!(row[1], "4.000000");
        assert_eq!(row[2], "2.500000");
        assert_eq!(row[3], "1.118034");
        assert_eq!(row[4], "4");
    }

    #[test]
    fn test_aggregate_preserves_order() {
        let a: &[f64] = &[1.0, 2.0];
        let b: &[f64] = &[3.0];
        assert_eq!(aggregate([a, b]), vec![1.0, 2.0, 3.0]);
        assert_eq!(aggregate([b, a]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_aggregate_stats_equal_concatenation() {
        let a: &[f64] = &[1.0, 2.0, 3.0];
        let b: &[f64] = &[10.0, 20.0];
        let combined = aggregate([a, b]);
        let direct = summarize(&[1.0, 2.0, 3.0, 10.0, 20.0]).unwrap();
        assert_eq!(summarize(&combined).unwrap(), direct);
    }

    #[test]
    fn test_histogram_counts_sum_to_len() {
        let samples = [1.0, 1.2, 2.5, 3.75, 3.8, 9.0, 0.25, 4.5];
        let hist = histogram(&samples).unwrap();
        assert_eq!(hist.edges.len(), hist.counts.len() + 1);
        assert_eq!(
            hist.counts.iter().sum::<u64>(),
            samples.len() as u64
        );
    }

    #[test]
    fn test_histogram_spans_data() {
        let samples = [2.0, 4.0, 8.0];
        let hist = histogram(&samples).unwrap();
        assert_eq!(hist.edges[0], 2.0);
        assert_eq!(*hist.edges.last().unwrap(), 8.0);
    }

    #[test]
    fn test_histogram_degenerate_single_bin() {
        let hist = histogram(&[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(hist.counts, vec![3]);
        assert_eq!(hist.edges, vec![5.0, 5.0]);
    }

    #[test]
    fn test_histogram_empty_is_error() {
        assert_eq!(histogram(&[]), Err(EmptyInput));
    }

    #[test]
    fn test_maximum_lands_in_last_bin() {
        let samples = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0];
        let hist = histogram(&samples).unwrap();
        // Every sample is binned, including the one equal to the top edge.
        assert_eq!(hist.counts.iter().sum::<u64>(), samples.len() as u64);
    }
}
