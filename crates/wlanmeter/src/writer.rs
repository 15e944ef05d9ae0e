//! Append-only sample file.
//!
//! One record per line, flushed after every sample so an interrupted run
//! loses at most the tick in flight. The CSV header goes in only when the
//! file is new or empty, so repeated runs keep extending one log.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use wlanmeter_core::{RecordFormat, Sample};

use crate::error::CliError;

#[derive(Debug)]
pub struct SampleWriter {
    path: PathBuf,
    format: RecordFormat,
    out: BufWriter<File>,
}

impl SampleWriter {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn open(path: &Path, format: RecordFormat) -> Result<Self, CliError> {
        let io_err = |source| CliError::OutputFile {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        let is_empty = file.metadata().map_err(io_err)?.len() == 0;

        let mut writer = Self {
            path: path.to_path_buf(),
            format,
            out: BufWriter::new(file),
        };
        if let Some(header) = format.header().filter(|_| is_empty) {
            writer.write_line(&header)?;
        }
        debug!(path = %path.display(), %format, fresh = is_empty, "opened sample file");
        Ok(writer)
    }

    pub fn write(&mut self, sample: &Sample) -> Result<(), CliError> {
        let line = sample.to_record(self.format)?;
        self.write_line(&line)
    }

    fn write_line(&mut self, line: &str) -> Result<(), CliError> {
        writeln!(self.out, "{line}")
            .and_then(|()| self.out.flush())
            .map_err(|source| CliError::OutputFile {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use wlanmeter_core::{SpeedMetrics, csv_header};

    use super::*;

    fn sample(second: u32) -> Sample {
        let ts = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(9, 0, second)
            .unwrap();
        let speed = SpeedMetrics {
            download_mbps: Some(50.0),
            upload_mbps: None,
            ping_ms: Some(8.0),
            jitter_ms: None,
            server: None,
            bytes_downloaded: Some(1_000_000),
            bytes_uploaded: None,
            duration_secs: 0.5,
        };
        Sample::new(ts, None, Some(speed))
    }

    #[test]
    fn csv_header_written_once_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.csv");

        let mut writer = SampleWriter::open(&path, RecordFormat::Csv).unwrap();
        writer.write(&sample(1)).unwrap();
        drop(writer);

        let mut writer = SampleWriter::open(&path, RecordFormat::Csv).unwrap();
        writer.write(&sample(2)).unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], csv_header());
        assert_eq!(lines[1], "2026-10-16T09:00:01;;;;;;;;;50.00;;8.00;");
        assert!(lines[2].starts_with("2026-10-16T09:00:02;"));
    }

    #[test]
    fn header_added_to_existing_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();

        SampleWriter::open(&path, RecordFormat::Csv).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}\n", csv_header()));
    }

    #[test]
    fn jsonl_has_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");

        let mut writer = SampleWriter::open(&path, RecordFormat::Jsonl).unwrap();
        writer.write(&sample(3)).unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        let parsed = Sample::from_json_line(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed, sample(3));
    }

    #[test]
    fn unwritable_path_is_an_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let err = SampleWriter::open(&blocker.join("run.csv"), RecordFormat::Csv).unwrap_err();
        assert!(matches!(err, CliError::OutputFile { .. }));
    }
}
