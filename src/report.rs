use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use crate::correlate::SeriesRecorder;
use crate::events::TraceEvent;
use crate::stats::{self, Histogram, Summary};

/// Everything the external rendering collaborator needs to draw one
/// report: title and axis labels plus per-series samples, statistics and
/// bins, with the aggregate of every series appended under the name
/// "all".
#[derive(Debug, Serialize)]
pub struct RenderInputs {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<SeriesRender>,
    pub all: SeriesRender,
}

#[derive(Debug, Serialize)]
pub struct SeriesRender {
    pub name: String,
    pub samples: Vec<f64>,
    pub summary: Summary,
    pub histogram: Histogram,
}

/// Deterministic, filesystem-safe artifact name: lowercase the title,
/// turn every character that is not alphanumeric into a dash, squeeze
/// every run of repeated characters down to one, drop dashes left at
/// either end, then append the extension.
pub fn format_filename(title: &str, ext: &str) -> String {
    let lowered = title.to_lowercase();
    let substituted: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let mut collapsed = String::with_capacity(substituted.len());
    let mut last = None;
    for c in substituted.chars() {
        if last != Some(c) {
            collapsed.push(c);
        }
        last = Some(c);
    }
    format!("{}.{}", collapsed.trim_matches('-'), ext)
}

/// One configured report: named duration series observed from the stream
/// (or preloaded from datasets), assembled into statistics and export
/// artifacts once the stream completes.
#[derive(Debug)]
pub struct HistogramReport {
    title: String,
    x_label: String,
    y_label: String,
    series: Vec<SeriesRecorder>,
}

impl HistogramReport {
    pub fn new(
        title: String,
        x_label: String,
        y_label: String,
        series: Vec<SeriesRecorder>,
    ) -> Self {
        HistogramReport {
            title,
            x_label,
            y_label,
            series,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn series(&self) -> &[SeriesRecorder] {
        &self.series
    }

    /// Fan one stream event out to every series; each source decides for
    /// itself whether the event is relevant.
    pub fn observe(&mut self, event: &TraceEvent) -> Result<()> {
        for recorder in self.series.iter_mut() {
            recorder
                .observe(event)
                .with_context(|| format!("series {}", recorder.name()))?;
        }
        Ok(())
    }

    /// The full contract handed to the rendering collaborator. Fails if
    /// any series (or the aggregate) ended up with zero samples.
    pub fn render_inputs(&self) -> Result<RenderInputs> {
        let mut series = Vec::with_capacity(self.series.len());
        for recorder in &self.series {
            series.push(render_series(recorder.name(), recorder.samples().to_vec())?);
        }
        let combined = stats::aggregate(self.series.iter().map(|r| r.samples()));
        let all = render_series("all", combined)?;
        Ok(RenderInputs {
            title: self.title.clone(),
            x_label: self.x_label.clone(),
            y_label: self.y_label.clone(),
            series,
            all,
        })
    }

    /// Tabular export rows for one series' samples: the x-axis label as
    /// the header row, then one value per row.
    pub fn export_rows(&self, samples: &[f64]) -> Vec<String> {
        let mut rows = Vec::with_capacity(samples.len() + 1);
        rows.push(self.x_label.clone());
        for sample in samples {
            rows.push(sample.to_string());
        }
        rows
    }

    /// Write one CSV file per series into `dir`, named
    /// `<title-slug>.<series-name>.csv`.
    pub fn write_csv(&self, dir: &Path) -> Result<()> {
        for recorder in &self.series {
            let name = format_filename(&self.title, &format!("{}.csv", recorder.name()));
            let path = dir.join(name);
            let mut writer = csv::WriterBuilder::new()
                .quote_style(csv::QuoteStyle::Never)
                .from_path(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            for row in self.export_rows(recorder.samples()) {
                writer
                    .write_record([row.as_str()])
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            writer
                .flush()
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        Ok(())
    }

    /// Serialize the render inputs to `<title-slug>.json` in `dir` for
    /// the rendering collaborator, returning the path written.
    pub fn write_render_inputs(&self, dir: &Path) -> Result<PathBuf> {
        let inputs = self.render_inputs()?;
        let path = dir.join(format_filename(&self.title, "json"));
        let json = serde_json::to_string_pretty(&inputs)?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// One-line summaries for the recoverable conditions seen while
    /// streaming, emitted once at finalize time.
    pub fn log_stream_warnings(&self) {
        for recorder in &self.series {
            let unmatched = recorder.unmatched_ends();
            if unmatched > 0 {
                warn!(
                    "{} unmatched end events for series {}",
                    unmatched,
                    recorder.name()
                );
            }
            let pending = recorder.pending_starts();
            if pending > 0 {
                warn!(
                    "{} start events without a matching end for series {}",
                    pending,
                    recorder.name()
                );
            }
        }
    }
}

fn render_series(name: &str, samples: Vec<f64>) -> Result<SeriesRender> {
    let summary = stats::summarize(&samples)
        .with_context(|| format!("series {} has no samples", name))?;
    let histogram = stats::histogram(&samples)
        .with_context(|| format!("series {} has no samples", name))?;
    Ok(SeriesRender {
        name: name.to_string(),
        samples,
        summary,
        histogram,
    })
}
