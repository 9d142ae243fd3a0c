//! Record sources
//!
//! The live stream is read line by line, either as plain JSON Lines or as a
//! server-sent-event stream whose records arrive on `data:` lines. Training
//! batches are read whole.

use crate::artifact::read_bytes;
use crate::error::{ArtifactError, ArtifactKind, SourceError};
use serde_json::{Map, Value};
use std::io::BufRead;
use std::path::Path;

/// How records are laid out on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFormat {
    /// One JSON object per line
    #[default]
    JsonLines,
    /// Server-sent events; only `data:` lines carry records
    EventStream,
}

/// Blocking iterator of records read from a line-oriented stream.
///
/// Yields `SourceError::Malformed` for a line that is not valid UTF-8 or not a
/// JSON object, and `SourceError::Io` only when the underlying reader fails.
pub struct JsonLinesSource<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    format: LineFormat,
    stamp_field: Option<String>,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R, format: LineFormat) -> Self {
        JsonLinesSource {
            reader,
            buf: Vec::new(),
            line_no: 0,
            format,
            stamp_field: None,
        }
    }

    /// Add the local ingestion time to every record under `field`
    pub fn with_ingest_stamp(mut self, field: Option<String>) -> Self {
        self.stamp_field = field;
        self
    }

    fn payload<'a>(&self, line: &'a str) -> Option<&'a str> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match self.format {
            LineFormat::JsonLines => Some(line),
            LineFormat::EventStream => line.strip_prefix("data:").map(str::trim_start),
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesSource<R> {
    type Item = Result<Map<String, Value>, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(SourceError::Io(e))),
            }
            self.line_no += 1;

            // A line that is not UTF-8 is a bad record, not a broken stream
            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(SourceError::Malformed {
                        line: self.line_no,
                        reason: format!("invalid UTF-8: {}", e),
                    }))
                }
            };

            let Some(payload) = self.payload(line) else {
                continue;
            };

            let record = match serde_json::from_str::<Value>(payload) {
                Ok(Value::Object(obj)) => obj,
                Ok(other) => {
                    return Some(Err(SourceError::Malformed {
                        line: self.line_no,
                        reason: format!("expected an object, found {}", json_kind(&other)),
                    }))
                }
                Err(e) => {
                    return Some(Err(SourceError::Malformed {
                        line: self.line_no,
                        reason: e.to_string(),
                    }))
                }
            };

            return Some(Ok(self.stamp(record)));
        }
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    fn stamp(&self, mut record: Map<String, Value>) -> Map<String, Value> {
        if let Some(field) = &self.stamp_field {
            record.insert(field.clone(), Value::String(chrono::Local::now().to_rfc3339()));
        }
        record
    }
}

/// A training batch read from disk
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub records: Vec<Map<String, Value>>,
    /// Entries that were not JSON objects
    pub skipped: usize,
}

/// Load a whole batch: a JSON array of objects, a single object, or JSON Lines.
pub fn load_batch<P: AsRef<Path>>(path: P) -> Result<Batch, ArtifactError> {
    let path = path.as_ref();
    let content = read_bytes(path, ArtifactKind::Batch)?;
    let batch = parse_batch(content);

    tracing::info!(
        path = %path.display(),
        records = batch.records.len(),
        skipped = batch.skipped,
        "loaded batch"
    );
    Ok(batch)
}

/// Parse batch bytes, trying the SIMD parser on the whole document first.
pub fn parse_batch(content: Vec<u8>) -> Batch {
    // simd-json parses in place, so keep the original bytes for the fallback
    let mut scratch = content.clone();
    let mut batch = Batch::default();

    match simd_json::serde::from_slice::<Value>(&mut scratch) {
        Ok(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::Object(obj) => batch.records.push(obj),
                    _ => batch.skipped += 1,
                }
            }
        }
        Ok(Value::Object(obj)) => batch.records.push(obj),
        Ok(_) => batch.skipped += 1,
        Err(_) => {
            // Fall back to JSON Lines
            let source = JsonLinesSource::new(content.as_slice(), LineFormat::JsonLines);
            for result in source {
                match result {
                    Ok(record) => batch.records.push(record),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping batch entry");
                        batch.skipped += 1;
                    }
                }
            }
        }
    }

    batch
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_json_lines() {
        let input = "{\"a\": 1}\n\n{\"a\": 2}\n";
        let records: Vec<_> = JsonLinesSource::new(Cursor::new(input), LineFormat::JsonLines)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["a"], 2);
    }

    #[test]
    fn test_event_stream_ignores_non_data_lines() {
        let input = ": keepalive\nevent: record\ndata: {\"a\": 1}\n\ndata:{\"a\": 2}\n";
        let records: Vec<_> = JsonLinesSource::new(Cursor::new(input), LineFormat::EventStream)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["a"], 1);
    }

    #[test]
    fn test_malformed_lines_do_not_end_stream() {
        let input = "{\"a\": 1}\n{broken\n[1, 2]\n{\"a\": 3}\n";
        let results: Vec<_> = JsonLinesSource::new(Cursor::new(input), LineFormat::JsonLines).collect();

        assert_eq!(results.len(), 4);
        assert!(matches!(results[1], Err(SourceError::Malformed { line: 2, .. })));
        assert!(matches!(results[2], Err(SourceError::Malformed { line: 3, .. })));
        assert!(results[3].is_ok());
    }

    #[test]
    fn test_invalid_utf8_line_is_malformed_not_fatal() {
        let input: &[u8] = b"{\"a\": 1}\n{\"a\": \"\xff\xfe\"}\n{\"a\": 3}\n{\"a\": 4}\n";
        let results: Vec<_> = JsonLinesSource::new(input, LineFormat::JsonLines).collect();

        assert_eq!(results.len(), 4);
        assert!(matches!(results[1], Err(SourceError::Malformed { line: 2, .. })));
        assert!(results[1].as_ref().unwrap_err().is_recoverable());
        assert_eq!(results[3].as_ref().unwrap()["a"], 4);
    }

    #[test]
    fn test_crlf_line_endings() {
        let input = "{\"a\": 1}\r\n{\"a\": 2}\r\n";
        let records: Vec<_> = JsonLinesSource::new(Cursor::new(input), LineFormat::JsonLines)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_ingest_stamp() {
        let input = "{\"a\": 1}\n";
        let record = JsonLinesSource::new(Cursor::new(input), LineFormat::JsonLines)
            .with_ingest_stamp(Some("sys_ingested_time".to_string()))
            .next()
            .unwrap()
            .unwrap();

        let stamp = record["sys_ingested_time"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_parse_batch_array() {
        let batch = parse_batch(br#"[{"a": 1}, 5, {"b": 2}]"#.to_vec());
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_parse_batch_preserves_field_order() {
        let batch = parse_batch(br#"[{"zeta": 1, "alpha": 2}]"#.to_vec());
        let keys: Vec<&String> = batch.records[0].keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_parse_batch_falls_back_to_json_lines() {
        let batch = parse_batch(b"{\"a\": 1}\n{\"a\": 2}\nnope\n".to_vec());
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 1);
        assert_eq!(Value::Object(batch.records[0].clone()), json!({"a": 1}));
    }

    #[test]
    fn test_parse_batch_skips_non_utf8_lines() {
        let batch = parse_batch(b"{\"a\": 1}\n{\"a\": \"\xff\"}\n{\"a\": 2}\n".to_vec());
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_missing_batch() {
        let err = load_batch("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ArtifactError::PreconditionNotMet { kind: ArtifactKind::Batch, .. }));
    }
}
