use std::io::BufRead;

use anyhow::{Context, Result};

use crate::events::StreamMessage;
use crate::report::HistogramReport;

/// Pull iterator over a JSON-lines trace: one message per non-empty
/// line. Malformed lines are fatal and carry the line number.
pub struct JsonlEventStream<R: BufRead> {
    reader: R,
    line: usize,
}

impl<R: BufRead> JsonlEventStream<R> {
    pub fn new(reader: R) -> Self {
        JsonlEventStream { reader, line: 0 }
    }
}

impl<R: BufRead> Iterator for JsonlEventStream<R> {
    type Item = Result<StreamMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut buf = String::new();
            self.line += 1;
            match self.reader.read_line(&mut buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => {
                    return Some(Err(err).with_context(|| {
                        format!("failed to read trace line {}", self.line)
                    }))
                }
            }
            let trimmed = buf.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(trimmed)
                    .with_context(|| format!("malformed trace message at line {}", self.line)),
            );
        }
    }
}

/// Drive the stream to completion: boundary markers are dropped, every
/// event is fanned out to every report.
pub fn consume<I>(reports: &mut [HistogramReport], stream: I) -> Result<()>
where
    I: IntoIterator<Item = Result<StreamMessage>>,
{
    for message in stream {
        match message? {
            StreamMessage::Event(event) => {
                for report in reports.iter_mut() {
                    report.observe(&event)?;
                }
            }
            // Stream and packet boundaries carry no payload.
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use std::io::Cursor;

    const TRACE: &str = r#"
{"type": "stream-begin"}
{"type": "packet-begin"}
{"type": "event", "name": "net:send", "ts": 1000000000, "fields": {"id": 1}}
{"type": "event", "name": "net:recv", "ts": 1050000000, "fields": {"id": 1}}
{"type": "packet-end"}
{"type": "stream-end"}
"#;

    fn reports() -> Vec<HistogramReport> {
        config::from_json(
            r#"
            {
                "reports": [
                    {
                        "title": "Round Trip Latency",
                        "x_label": "duration (ms)",
                        "y_label": "count",
                        "series": [
                            {
                                "kind": "duration",
                                "name": "rtt",
                                "start_event": "net:send",
                                "start_fields": ["id"],
                                "end_event": "net:recv",
                                "end_fields": ["id"]
                            }
                        ]
                    }
                ]
            }
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_consume_ignores_boundaries() {
        let mut reports = reports();
        consume(&mut reports, JsonlEventStream::new(Cursor::new(TRACE))).unwrap();
        assert_eq!(reports[0].series()[0].samples(), &[50.0]);
    }

    #[test]
    fn test_malformed_line_names_line_number() {
        let mut reports = reports();
        let trace = "{\"type\": \"stream-begin\"}\nnot json\n";
        let err = consume(&mut reports, JsonlEventStream::new(Cursor::new(trace))).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_stream_yields_messages() {
        let stream = JsonlEventStream::new(Cursor::new(TRACE));
        let messages: Result<Vec<_>> = stream.collect();
        assert_eq!(messages.unwrap().len(), 6);
    }
}
