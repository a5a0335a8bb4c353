use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::correlate::{CsvDurationSource, DurationRecorder, SeriesRecorder};
use crate::report::HistogramReport;

// The JSON config file format is
// {
//   "reports": [
//     {
//       "title": "Round Trip Latency",
//       "x_label": "duration (ms)",
//       "y_label": "count",
//       "series": [
//         {
//           "kind": "duration",
//           "name": "rtt",
//           "start_event": "net:send",
//           "start_fields": ["id"],
//           "end_event": "net:recv",
//           "end_fields": ["id"]
//         },
//         {
//           "kind": "duration-csv",
//           "name": "baseline",
//           "path": "baseline.csv"
//         }
//       ]
//     }
//   ]
// }
//
// The start and end field lists are independent; they only have to
// produce equal key values for events that belong together. Series names
// cannot be duplicated within a report. "duration-csv" paths are loaded
// here, before any streaming starts.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct JsonConfig {
    reports: Vec<JsonReport>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct JsonReport {
    title: String,
    x_label: String,
    y_label: String,
    series: Vec<JsonSeries>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct JsonSeries {
    kind: String,
    name: String,
    start_event: Option<String>,
    start_fields: Option<Vec<String>>,
    end_event: Option<String>,
    end_fields: Option<Vec<String>>,
    path: Option<PathBuf>,
}

fn build_series(series: JsonSeries) -> Result<SeriesRecorder> {
    match series.kind.as_str() {
        "duration" => {
            if series.path.is_some() {
                bail!("series {}: path is only valid for duration-csv", series.name);
            }
            let start_event = series
                .start_event
                .with_context(|| format!("series {}: duration requires start_event", series.name))?;
            let start_fields = series
                .start_fields
                .with_context(|| format!("series {}: duration requires start_fields", series.name))?;
            let end_event = series
                .end_event
                .with_context(|| format!("series {}: duration requires end_event", series.name))?;
            let end_fields = series
                .end_fields
                .with_context(|| format!("series {}: duration requires end_fields", series.name))?;
            Ok(SeriesRecorder::new(
                series.name,
                Box::new(DurationRecorder::new(
                    start_event,
                    start_fields,
                    end_event,
                    end_fields,
                )),
            ))
        }
        "duration-csv" => {
            if series.start_event.is_some()
                || series.start_fields.is_some()
                || series.end_event.is_some()
                || series.end_fields.is_some()
            {
                bail!(
                    "series {}: event members are only valid for duration",
                    series.name
                );
            }
            let path = series
                .path
                .with_context(|| format!("series {}: duration-csv requires path", series.name))?;
            let source = CsvDurationSource::load(&path)
                .with_context(|| format!("series {}", series.name))?;
            Ok(SeriesRecorder::new(series.name, Box::new(source)))
        }
        other => bail!("unknown series kind {} for series {}", other, series.name),
    }
}

pub fn from_json(buf: &str) -> Result<Vec<HistogramReport>> {
    let config: JsonConfig = serde_json::from_str(buf)?;
    let mut reports = Vec::with_capacity(config.reports.len());
    for report in config.reports {
        let mut seen = HashSet::new();
        let mut series = Vec::with_capacity(report.series.len());
        for entry in report.series {
            if !seen.insert(entry.name.clone()) {
                bail!(
                    "series {} already exists in report {}",
                    entry.name,
                    report.title
                );
            }
            series.push(build_series(entry)?);
        }
        reports.push(HistogramReport::new(
            report.title,
            report.x_label,
            report.y_label,
            series,
        ));
    }
    Ok(reports)
}

pub fn load_config(config: &Path) -> Result<Vec<HistogramReport>> {
    let buf = fs::read_to_string(config)
        .with_context(|| format!("failed to read config {}", config.display()))?;
    from_json(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DURATION_SERIES: &str = r#"
        {
            "kind": "duration",
            "name": "rtt",
            "start_event": "net:send",
            "start_fields": ["id"],
            "end_event": "net:recv",
            "end_fields": ["id"]
        }
    "#;

    fn config_with_series(series: &str) -> String {
        format!(
            r#"
            {{
                "reports": [
                    {{
                        "title": "Round Trip Latency",
                        "x_label": "duration (ms)",
                        "y_label": "count",
                        "series": [{}]
                    }}
                ]
            }}
            "#,
            series
        )
    }

    #[test]
    fn test_duration_series() {
        let reports = from_json(&config_with_series(DURATION_SERIES)).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].title(), "Round Trip Latency");
        assert_eq!(reports[0].series().len(), 1);
        assert_eq!(reports[0].series()[0].name(), "rtt");
    }

    #[test]
    fn test_duration_csv_series() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "duration (ms)").unwrap();
        writeln!(file, "2.5").unwrap();
        file.flush().unwrap();

        let series = format!(
            r#"{{"kind": "duration-csv", "name": "baseline", "path": "{}"}}"#,
            file.path().display()
        );
        let reports = from_json(&config_with_series(&series)).unwrap();
        assert_eq!(reports[0].series()[0].samples(), &[2.5]);
    }

    #[test]
    fn test_unknown_series_kind() {
        let series = r#"{"kind": "frequency", "name": "x"}"#;
        let err = from_json(&config_with_series(series)).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("unknown series kind frequency"), "{}", msg);
        assert!(msg.contains("x"), "{}", msg);
    }

    #[test]
    fn test_duration_missing_member() {
        let series = r#"
            {
                "kind": "duration",
                "name": "rtt",
                "start_event": "net:send",
                "start_fields": ["id"],
                "end_event": "net:recv"
            }
        "#;
        let err = from_json(&config_with_series(series)).unwrap_err();
        assert!(format!("{:#}", err).contains("end_fields"));
    }

    #[test]
    fn test_duration_csv_missing_path() {
        let series = r#"{"kind": "duration-csv", "name": "baseline"}"#;
        let err = from_json(&config_with_series(series)).unwrap_err();
        assert!(format!("{:#}", err).contains("path"));
    }

    #[test]
    fn test_duration_csv_missing_file() {
        let series = r#"{"kind": "duration-csv", "name": "baseline", "path": "/nonexistent/x.csv"}"#;
        assert!(from_json(&config_with_series(series)).is_err());
    }

    #[test]
    fn test_misplaced_members_rejected() {
        let series = r#"
            {
                "kind": "duration",
                "name": "rtt",
                "start_event": "a",
                "start_fields": [],
                "end_event": "b",
                "end_fields": [],
                "path": "x.csv"
            }
        "#;
        assert!(from_json(&config_with_series(series)).is_err());
    }

    #[test]
    fn test_duplicate_series_name() {
        let series = format!("{}, {}", DURATION_SERIES, DURATION_SERIES);
        let err = from_json(&config_with_series(&series)).unwrap_err();
        assert!(format!("{:#}", err).contains("already exists"));
    }

    #[test]
    fn test_unknown_member_rejected() {
        let series = r#"{"kind": "duration", "name": "rtt", "bogus": 1}"#;
        assert!(from_json(&config_with_series(series)).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config(Path::new("/nonexistent/config.json")).is_err());
    }
}
