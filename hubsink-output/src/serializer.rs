//! JSON batch serialization, one object per metric.

use crate::metric::{FieldValue, Metric};
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("field {field:?} of metric {metric:?} is not a finite number")]
    NonFiniteField { metric: String, field: String },

    #[error("timestamp of metric {metric:?} does not fit the timestamp units")]
    TimestampOutOfRange { metric: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Turns metrics into message payloads
pub trait Serializer: fmt::Debug + Send + Sync {
    fn serialize(&self, metric: &Metric) -> Result<Vec<u8>, SerializeError>;

    fn serialize_batch(&self, metrics: &[Metric]) -> Result<Vec<u8>, SerializeError>;
}

#[derive(Serialize)]
struct JsonMetric<'a> {
    fields: &'a BTreeMap<String, FieldValue>,
    name: &'a str,
    tags: &'a BTreeMap<String, String>,
    timestamp: i64,
}

#[derive(Serialize)]
struct JsonBatch<'a> {
    metrics: Vec<JsonMetric<'a>>,
}

/// Renders `{"fields":{..},"name":"..","tags":{..},"timestamp":N}`, where N counts
/// timestamp units since the epoch
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct JsonSerializer {
    timestamp_units: Duration,
}

impl JsonSerializer {
    /// Units are rounded down to a power of ten nanoseconds; zero means seconds
    pub fn new(timestamp_units: Duration) -> JsonSerializer {
        JsonSerializer {
            timestamp_units: truncate_units(timestamp_units),
        }
    }

    pub fn timestamp_units(&self) -> Duration {
        self.timestamp_units
    }

    fn json_metric<'a>(&self, metric: &'a Metric) -> Result<JsonMetric<'a>, SerializeError> {
        for (field, value) in &metric.fields {
            if let FieldValue::Float(value) = value {
                if !value.is_finite() {
                    return Err(SerializeError::NonFiniteField {
                        metric: metric.name.clone(),
                        field: field.clone(),
                    });
                }
            }
        }

        let units = i128::try_from(self.timestamp_units.as_nanos()).unwrap_or(i128::MAX);
        let timestamp = i64::try_from(metric.unix_nanos() / units).map_err(|_| {
            SerializeError::TimestampOutOfRange {
                metric: metric.name.clone(),
            }
        })?;
        Ok(JsonMetric {
            fields: &metric.fields,
            name: &metric.name,
            tags: &metric.tags,
            timestamp,
        })
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, metric: &Metric) -> Result<Vec<u8>, SerializeError> {
        let mut payload = serde_json::to_vec(&self.json_metric(metric)?)?;
        payload.push(b'\n');
        Ok(payload)
    }

    fn serialize_batch(&self, metrics: &[Metric]) -> Result<Vec<u8>, SerializeError> {
        let metrics = metrics
            .iter()
            .map(|metric| self.json_metric(metric))
            .collect::<Result<Vec<_>, _>>()?;
        let mut payload = serde_json::to_vec(&JsonBatch { metrics })?;
        payload.push(b'\n');
        Ok(payload)
    }
}

fn truncate_units(units: Duration) -> Duration {
    if units == Duration::from_nanos(0) {
        return Duration::from_secs(1);
    }

    let mut unit = Duration::from_nanos(1);
    while unit * 10 <= units {
        unit *= 10;
    }
    unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cpu_metric() -> Metric {
        Metric::new("cpu", Utc.timestamp_opt(1_600_000_000, 500_000_000).unwrap())
            .with_tag("host", "edge-01")
            .with_field("usage_idle", 91.5)
            .with_field("cores", 4i64)
    }

    #[test]
    fn test_serialize_single_metric() {
        let sut = JsonSerializer::new(Duration::from_secs(1));
        let payload = sut.serialize(&cpu_metric()).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            "{\"fields\":{\"cores\":4,\"usage_idle\":91.5},\"name\":\"cpu\",\"tags\":{\"host\":\"edge-01\"},\"timestamp\":1600000000}\n"
        );
    }

    #[test]
    fn test_serialize_batch_layout() {
        let sut = JsonSerializer::new(Duration::from_secs(1));
        let second = Metric::new("mem", Utc.timestamp_opt(1_600_000_001, 0).unwrap())
            .with_field("ok", true)
            .with_field("state", "green");
        let payload = sut.serialize_batch(&[cpu_metric(), second]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        let metrics = value["metrics"].as_array().unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[1]["name"], "mem");
        assert_eq!(metrics[1]["fields"]["state"], "green");
        assert_eq!(metrics[1]["timestamp"], 1_600_000_001i64);
        assert_eq!(payload.last(), Some(&b'\n'));
    }

    #[test]
    fn test_empty_batch() {
        let sut = JsonSerializer::new(Duration::from_secs(1));
        assert_eq!(sut.serialize_batch(&[]).unwrap(), b"{\"metrics\":[]}\n".to_vec());
    }

    #[test]
    fn test_millisecond_units() {
        let sut = JsonSerializer::new(Duration::from_millis(1));
        let payload = sut.serialize(&cpu_metric()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["timestamp"], 1_600_000_000_500i64);
    }

    #[test]
    fn test_units_truncate_to_power_of_ten() {
        assert_eq!(
            JsonSerializer::new(Duration::from_millis(25)).timestamp_units(),
            Duration::from_millis(10)
        );
        assert_eq!(
            JsonSerializer::new(Duration::from_nanos(0)).timestamp_units(),
            Duration::from_secs(1)
        );
        assert_eq!(
            JsonSerializer::new(Duration::from_secs(1)).timestamp_units(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_non_finite_field_fails() {
        let sut = JsonSerializer::new(Duration::from_secs(1));
        let metric = cpu_metric().with_field("ratio", std::f64::NAN);
        match sut.serialize_batch(&[metric]) {
            Err(SerializeError::NonFiniteField { metric, field }) => {
                assert_eq!(metric, "cpu");
                assert_eq!(field, "ratio");
            }
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_timestamp_overflow_fails() {
        // 2286-11-20 has more nanoseconds since the epoch than an i64 holds
        let far = Metric::new("far", Utc.timestamp_opt(10_000_000_000, 0).unwrap())
            .with_field("value", 1i64);

        let seconds = JsonSerializer::new(Duration::from_secs(1));
        let value: serde_json::Value =
            serde_json::from_slice(&seconds.serialize(&far).unwrap()).unwrap();
        assert_eq!(value["timestamp"], 10_000_000_000i64);

        let nanos = JsonSerializer::new(Duration::from_nanos(1));
        match nanos.serialize_batch(&[far]) {
            Err(SerializeError::TimestampOutOfRange { metric }) => assert_eq!(metric, "far"),
            other => panic!("Unexpected result {:?}", other),
        }
    }
}
