//! Per-file run reports in JSON or JSONL.
//!
//! [`Outcome`] carries a typed error that does not serialize; [`OutcomeRecord`]
//! is the flattened view written to report files.

use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::pipeline::{Action, Outcome};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

/// One line of a run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    pub path: PathBuf,
    pub destination: PathBuf,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Outcome> for OutcomeRecord {
    fn from(outcome: &Outcome) -> Self {
        Self {
            path: outcome.path.clone(),
            destination: outcome.destination.clone(),
            action: outcome.action,
            error: outcome.error.as_ref().map(|e| e.to_string()),
        }
    }
}

/// A writer that serializes items to JSON or JSONL format.
///
/// JSONL items are written as they arrive. JSON output has to be a single
/// array, so items are buffered until [`OutputWriter::finish`].
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    pending: Vec<serde_json::Value>,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects the JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            pending: Vec::new(),
            items_written: 0,
        }
    }

    /// Write (or, for JSON, queue) a single item.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::to_value(item).map_err(io::Error::other)?;
                self.pending.push(value);
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.items_written += 1;
        Ok(())
    }

    /// Number of items accepted so far.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Emit any buffered JSON array, flush, and hand back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.format == OutputFormat::Json {
            let items = std::mem::take(&mut self.pending);
            if self.pretty {
                serde_json::to_writer_pretty(&mut self.writer, &items)
                    .map_err(io::Error::other)?;
            } else {
                serde_json::to_writer(&mut self.writer, &items).map_err(io::Error::other)?;
            }
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn outcome(name: &str, action: Action, error: Option<PipelineError>) -> Outcome {
        Outcome {
            path: PathBuf::from("/in").join(name),
            destination: PathBuf::from("/out").join(name),
            action,
            error,
        }
    }

    #[test]
    fn test_record_from_outcome() {
        let failed = outcome(
            "b.jpg",
            Action::FellBack,
            Some(PipelineError::Transform {
                path: PathBuf::from("/in/b.jpg"),
                message: "no faces".to_string(),
            }),
        );
        let record = OutcomeRecord::from(&failed);

        assert_eq!(record.action, Action::FellBack);
        assert_eq!(
            record.error.as_deref(),
            Some("Error rescaling image /in/b.jpg. Reason: no faces")
        );
    }

    #[test]
    fn test_write_jsonl() {
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::JsonLines, false);
        writer
            .write(&OutcomeRecord::from(&outcome("a.jpg", Action::Copied, None)))
            .unwrap();
        writer
            .write(&OutcomeRecord::from(&outcome("b.png", Action::Transformed, None)))
            .unwrap();
        assert_eq!(writer.items_written(), 2);

        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"action\":\"copied\""));
        assert!(!lines[0].contains("error"));
        assert!(lines[1].contains("\"action\":\"transformed\""));
    }

    #[test]
    fn test_json_is_single_array() {
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::Json, true);
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            writer
                .write(&OutcomeRecord::from(&outcome(name, Action::Copied, None)))
                .unwrap();
        }

        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 3);
        assert_eq!(parsed[2]["destination"], "/out/c.jpg");
    }

    #[test]
    fn test_empty_json_report() {
        let writer = OutputWriter::new(Vec::new(), OutputFormat::Json, false);
        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(output.trim(), "[]");
    }
}
