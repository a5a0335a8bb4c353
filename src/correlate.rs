use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::events::{FieldValue, TraceEvent};

/// Divisor turning nanosecond timestamp deltas into millisecond samples.
const NANOS_PER_MS: f64 = 1_000_000.0;

#[derive(Debug, Error)]
pub enum CorrelateError {
    #[error("event {event} has no field {field}")]
    MissingField { event: String, field: String },
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}:{line}: {value:?} is not a numeric duration")]
    Malformed {
        path: PathBuf,
        line: usize,
        value: String,
    },
}

/// Identity shared by a start event and its matching end event, built
/// from an ordered list of payload field values. Keys are equal iff the
/// value sequences are element-wise equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey(Vec<FieldValue>);

impl CorrelationKey {
    fn extract(event: &TraceEvent, fields: &[String]) -> Result<Self, CorrelateError> {
        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            let value = event
                .field(field)
                .ok_or_else(|| CorrelateError::MissingField {
                    event: event.name.clone(),
                    field: field.clone(),
                })?;
            values.push(value.clone());
        }
        Ok(CorrelationKey(values))
    }
}

/// Capability shared by everything that can feed samples into a series:
/// live stream correlation and pre-recorded datasets alike.
pub trait SampleSource {
    /// Feed one event from the live stream. Sources that do not consume
    /// the stream ignore it.
    fn observe(&mut self, event: &TraceEvent) -> Result<(), CorrelateError>;

    /// The samples accumulated so far, in arrival order.
    fn samples(&self) -> &[f64];

    /// End events that had no pending start to pair with.
    fn unmatched_ends(&self) -> u64 {
        0
    }

    /// Start events still waiting for an end when the stream finished.
    fn pending_starts(&self) -> usize {
        0
    }
}

/// Pairs start/end events that share a correlation key and records the
/// elapsed time between them in milliseconds.
///
/// The start and end sides extract their keys independently, so the two
/// field lists do not have to name the same fields or even have the same
/// length; they only have to produce equal values for events that belong
/// together.
pub struct DurationRecorder {
    start_event: String,
    start_fields: Vec<String>,
    end_event: String,
    end_fields: Vec<String>,

    // Key -> start timestamp for starts that have not seen their end yet.
    // A matched entry is removed, so a second end for the same key counts
    // as unmatched instead of re-measuring a stale start.
    pending: HashMap<CorrelationKey, u64>,
    durations: Vec<f64>,
    unmatched: u64,
}

impl DurationRecorder {
    pub fn new(
        start_event: String,
        start_fields: Vec<String>,
        end_event: String,
        end_fields: Vec<String>,
    ) -> Self {
        DurationRecorder {
            start_event,
            start_fields,
            end_event,
            end_fields,
            pending: HashMap::new(),
            durations: Vec::new(),
            unmatched: 0,
        }
    }
}

impl SampleSource for DurationRecorder {
    fn observe(&mut self, event: &TraceEvent) -> Result<(), CorrelateError> {
        if event.name == self.start_event {
            let key = CorrelationKey::extract(event, &self.start_fields)?;
            // A duplicate start restarts the measurement from the later
            // timestamp.
            self.pending.insert(key, event.ts);
        } else if event.name == self.end_event {
            let key = CorrelationKey::extract(event, &self.end_fields)?;
            match self.pending.remove(&key) {
                Some(start_ts) => {
                    self.durations
                        .push((event.ts - start_ts) as f64 / NANOS_PER_MS);
                }
                None => {
                    self.unmatched += 1;
                    debug!("unmatched end event {} at {}", event.name, event.ts);
                }
            }
        }
        Ok(())
    }

    fn samples(&self) -> &[f64] {
        &self.durations
    }

    fn unmatched_ends(&self) -> u64 {
        self.unmatched
    }

    fn pending_starts(&self) -> usize {
        self.pending.len()
    }
}

/// A fixed series of duration samples loaded from a delimited file
/// instead of the live stream. The first row is a header and is
/// discarded; every following row's first column is one sample value.
#[derive(Debug)]
pub struct CsvDurationSource {
    durations: Vec<f64>,
}

impl CsvDurationSource {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .quoting(false)
            .flexible(true)
            .from_path(path)
            .map_err(|source| DatasetError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut durations = Vec::new();
        for (index, record) in reader.records().enumerate() {
            // The header occupies line 1 and was consumed by the reader.
            let line = index + 2;
            let record = record.map_err(|source| DatasetError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let value = record.get(0).unwrap_or("");
            let parsed =
                value
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| DatasetError::Malformed {
                        path: path.to_path_buf(),
                        line,
                        value: value.to_string(),
                    })?;
            durations.push(parsed);
        }
        Ok(CsvDurationSource { durations })
    }
}

impl SampleSource for CsvDurationSource {
    fn observe(&mut self, _event: &TraceEvent) -> Result<(), CorrelateError> {
        Ok(())
    }

    fn samples(&self) -> &[f64] {
        &self.durations
    }
}

/// Binds a logical series name to one sample source and forwards the
/// stream to it.
pub struct SeriesRecorder {
    name: String,
    source: Box<dyn SampleSource>,
}

impl std::fmt::Debug for SeriesRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesRecorder")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SeriesRecorder {
    pub fn new(name: impl Into<String>, source: Box<dyn SampleSource>) -> Self {
        SeriesRecorder {
            name: name.into(),
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn observe(&mut self, event: &TraceEvent) -> Result<(), CorrelateError> {
        self.source.observe(event)
    }

    pub fn samples(&self) -> &[f64] {
        self.source.samples()
    }

    pub fn unmatched_ends(&self) -> u64 {
        self.source.unmatched_ends()
    }

    pub fn pending_starts(&self) -> usize {
        self.source.pending_starts()
    }
}
