#[macro_use]
extern crate log;

use chrono::{DateTime, TimeZone, Utc};
use hubsink_output::{FieldValue, Metric, Output};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "hubsink", about = "Forwards metrics read from stdin to Azure IoT Hub")]
pub struct Options {
    /// Agent configuration with `[[outputs.azure_iothub]]` tables
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Print the output's sample configuration and exit
    #[structopt(long = "sample-config")]
    pub sample_config: bool,

    /// Send everything on stdin as a single batch
    #[structopt(long = "once")]
    pub once: bool,

    #[structopt(short = "b", long = "batch-size", default_value = "100")]
    pub batch_size: usize,
}

impl Options {
    pub fn from_cmd_line() -> Options {
        Options::from_args()
    }
}

/// One metric per input line, e.g.
/// `{"name":"cpu","tags":{"host":"a"},"fields":{"usage":0.5},"timestamp":1600000000}`
#[derive(Debug, Deserialize)]
pub struct MetricLine {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    /// Unix seconds; missing means now
    pub timestamp: Option<i64>,
}

impl MetricLine {
    pub fn into_metric(self, now: DateTime<Utc>) -> Metric {
        let time = self
            .timestamp
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or(now);
        Metric {
            name: self.name,
            tags: self.tags,
            fields: self.fields,
            time,
        }
    }
}

pub fn parse_metric(line: &str, now: DateTime<Utc>) -> serde_json::Result<Metric> {
    let line: MetricLine = serde_json::from_str(line)?;
    Ok(line.into_metric(now))
}

/// What a `forward` run did
#[derive(Debug, Default, Eq, PartialEq)]
pub struct Forwarded {
    pub metrics: usize,
    pub skipped_lines: usize,
    pub failed_writes: usize,
}

/// Reads metric lines and writes them to every output, `batch_size` at a time,
/// or all at once with `once`. Malformed lines are skipped, failed writes counted.
pub fn forward<R: BufRead>(
    input: R,
    outputs: &[Box<dyn Output>],
    batch_size: usize,
    once: bool,
) -> io::Result<Forwarded> {
    let batch_size = batch_size.max(1);
    let mut forwarded = Forwarded::default();
    let mut batch = Vec::new();

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_metric(&line, Utc::now()) {
            Ok(metric) => batch.push(metric),
            Err(e) => {
                warn!("Skipping malformed metric line: {}", e);
                forwarded.skipped_lines += 1;
            }
        }
        if !once && batch.len() >= batch_size {
            write_batch(outputs, &mut batch, &mut forwarded);
        }
    }
    write_batch(outputs, &mut batch, &mut forwarded);
    Ok(forwarded)
}

fn write_batch(outputs: &[Box<dyn Output>], batch: &mut Vec<Metric>, forwarded: &mut Forwarded) {
    if batch.is_empty() {
        return;
    }
    for output in outputs {
        if let Err(e) = output.write(batch) {
            error!("Failed to write {} metrics: {}", batch.len(), e);
            forwarded.failed_writes += 1;
        }
    }
    forwarded.metrics += batch.len();
    batch.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubsink_output::OutputError;
    use std::sync::{Arc, Mutex};

    struct RecordingOutput {
        batches: Arc<Mutex<Vec<usize>>>,
        failing: bool,
    }

    impl Output for RecordingOutput {
        fn description(&self) -> &'static str {
            "recording"
        }

        fn sample_config(&self) -> &'static str {
            ""
        }

        fn init(&mut self) -> Result<(), OutputError> {
            Ok(())
        }

        fn connect(&self) -> Result<(), OutputError> {
            Ok(())
        }

        fn close(&self) -> Result<(), OutputError> {
            Ok(())
        }

        fn write(&self, metrics: &[Metric]) -> Result<(), OutputError> {
            self.batches.lock().unwrap().push(metrics.len());
            if self.failing {
                return Err(OutputError::NotInitialized);
            }
            Ok(())
        }
    }

    const LINES: &str = "{\"name\":\"a\",\"fields\":{\"v\":1}}\n\
                         not json\n\
                         \n\
                         {\"name\":\"b\",\"fields\":{\"v\":2}}\n\
                         {\"name\":\"c\",\"fields\":{\"v\":3}}\n";

    fn recording(failing: bool) -> (Box<dyn Output>, Arc<Mutex<Vec<usize>>>) {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let output = RecordingOutput {
            batches: batches.clone(),
            failing,
        };
        (Box::new(output), batches)
    }

    #[test]
    fn test_forward_in_batches() {
        let (output, batches) = recording(false);
        let forwarded = forward(LINES.as_bytes(), &[output], 2, false).unwrap();
        assert_eq!(
            forwarded,
            Forwarded {
                metrics: 3,
                skipped_lines: 1,
                failed_writes: 0,
            }
        );
        assert_eq!(*batches.lock().unwrap(), vec![2, 1]);
    }

    #[test]
    fn test_forward_once_sends_one_batch() {
        let (output, batches) = recording(false);
        forward(LINES.as_bytes(), &[output], 2, true).unwrap();
        assert_eq!(*batches.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_forward_counts_failed_writes() {
        let (failing, _) = recording(true);
        let (healthy, batches) = recording(false);
        let forwarded = forward(LINES.as_bytes(), &[failing, healthy], 2, false).unwrap();
        assert_eq!(forwarded.failed_writes, 2);
        assert_eq!(forwarded.metrics, 3);
        assert_eq!(*batches.lock().unwrap(), vec![2, 1]);
    }

    #[test]
    fn test_forward_empty_input() {
        let (output, batches) = recording(false);
        let forwarded = forward(&b""[..], &[output], 2, false).unwrap();
        assert_eq!(forwarded, Forwarded::default());
        assert!(batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parse_metric() {
        let now = Utc.timestamp_opt(1, 0).unwrap();
        let metric = parse_metric(
            r#"{"name":"cpu","tags":{"host":"a"},"fields":{"usage":0.5,"cores":4},"timestamp":1600000000}"#,
            now,
        )
        .unwrap();
        assert_eq!(metric.name, "cpu");
        assert_eq!(metric.tags["host"], "a");
        assert_eq!(metric.fields["usage"], FieldValue::Float(0.5));
        assert_eq!(metric.fields["cores"], FieldValue::Integer(4));
        assert_eq!(metric.time.timestamp(), 1_600_000_000);
    }

    #[test]
    fn test_missing_timestamp_is_now() {
        let now = Utc.timestamp_opt(42, 0).unwrap();
        let metric = parse_metric(r#"{"name":"mem","fields":{"free":1}}"#, now).unwrap();
        assert_eq!(metric.time, now);
        assert!(metric.tags.is_empty());
    }

    #[test]
    fn test_missing_fields_is_an_error() {
        assert!(parse_metric(r#"{"name":"mem"}"#, Utc::now()).is_err());
    }
}
