//! Output formatting for classification results.
//!
//! Results are written as aligned text (percent, rank, name), as JSON, or as
//! JSON Lines with one record per score vector.

use serde::Serialize;
use std::io::{self, Write};

use crate::types::Classification;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// Single JSON object or array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

/// A classification tagged with where its scores came from.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRecord {
    /// Score file and, for multi-vector files, the line number
    pub source: String,
    #[serde(flatten)]
    pub classification: Classification,
}

/// Writes classification records in the chosen format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// `pretty` only affects [`OutputFormat::Json`].
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write one record.
    pub fn write(&mut self, record: &ClassificationRecord) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                if self.items_written > 0 {
                    writeln!(self.writer)?;
                }
                writeln!(self.writer, "Classification of '{}':", record.source)?;
                self.writer
                    .write_all(format_text(&record.classification).as_bytes())?;
            }
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, record)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.items_written += 1;
        Ok(())
    }

    /// Write several records; JSON output becomes one array.
    pub fn write_all(&mut self, records: &[ClassificationRecord]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, records)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, records).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += records.len();
            }
            OutputFormat::Text | OutputFormat::JsonLines => {
                for record in records {
                    self.write(record)?;
                }
            }
        }
        Ok(())
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Render a classification as text, one line per entry.
///
/// Paths print as `" 70.0%     kingdom Animalia"`, labels as `" 70.0% Parus major"`.
pub fn format_text(classification: &Classification) -> String {
    let mut out = String::new();
    match classification {
        Classification::Path(steps) => {
            for step in steps {
                out.push_str(&format!(
                    "{:5.1}% {:>11} {}\n",
                    100.0 * step.score,
                    step.rank,
                    step.name
                ));
            }
        }
        Classification::Labels(labels) => {
            for label in labels {
                out.push_str(&format!("{:5.1}% {}\n", 100.0 * label.score, label.name));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LabelScore, PathStep};

    fn path_record() -> ClassificationRecord {
        ClassificationRecord {
            source: "scores.json".to_string(),
            classification: Classification::Path(vec![
                PathStep {
                    score: 0.7,
                    taxon_id: 1,
                    rank: "kingdom".to_string(),
                    name: "Animalia".to_string(),
                },
                PathStep {
                    score: 0.4,
                    taxon_id: -1,
                    rank: String::new(),
                    name: "background".to_string(),
                },
            ]),
        }
    }

    #[test]
    fn test_format_text_path() {
        let text = format_text(&path_record().classification);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], " 70.0%     kingdom Animalia");
        assert_eq!(lines[1], " 40.0%             background");
    }

    #[test]
    fn test_format_text_labels() {
        let classification = Classification::Labels(vec![LabelScore {
            score: 0.125,
            class_id: 2,
            name: "Great Tit (Parus major)".to_string(),
        }]);
        assert_eq!(format_text(&classification), " 12.5% Great Tit (Parus major)\n");
    }

    #[test]
    fn test_write_json_flattens_classification() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write(&path_record()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let value: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(value["source"], "scores.json");
        assert_eq!(value["mode"], "path");
        assert_eq!(value["results"][0]["name"], "Animalia");
    }

    #[test]
    fn test_write_jsonl() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, false);
        writer.write_all(&[path_record(), path_record()]).unwrap();
        assert_eq!(writer.items_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output.trim().split('\n').count(), 2);
    }

    #[test]
    fn test_write_all_json_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write_all(&[path_record()]).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with('['));
        assert!(output.trim().ends_with(']'));
    }

    #[test]
    fn test_write_text_separates_records() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Text, false);
        writer.write_all(&[path_record(), path_record()]).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output.matches("Classification of 'scores.json':").count(), 2);
        assert!(output.contains("\n\nClassification of"));
    }
}
