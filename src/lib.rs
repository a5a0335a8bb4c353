//! spanstat library - correlate start/end trace events into duration
//! series and histogram statistics.
//!
//! The crate consumes a chronologically ordered trace event stream,
//! pairs start/end events that share a correlation key, and turns the
//! elapsed times into per-series statistics and exportable report
//! artifacts (stats tables, render inputs, per-series CSVs).
//!
//! # Modules
//!
//! - [`events`] - trace event model and the JSON-lines wire format
//! - [`correlate`] - sample sources: live correlation and CSV datasets
//! - [`stats`] - summary statistics and histogram binning
//! - [`report`] - report assembly, artifact naming, and export
//! - [`config`] - JSON report configuration
//! - [`stream`] - stream adapter that drives the reports

pub mod config;
pub mod correlate;
pub mod events;
pub mod report;
pub mod stats;
pub mod stream;

// Re-export for convenience
pub use correlate::{CsvDurationSource, DurationRecorder, SampleSource, SeriesRecorder};
pub use events::{FieldValue, StreamMessage, TraceEvent};
pub use report::{format_filename, HistogramReport, RenderInputs};
pub use stats::{aggregate, histogram, summarize, Histogram, Summary};
