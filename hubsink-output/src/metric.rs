use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single field value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Unsigned(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_owned())
    }
}

/// A telemetry record collected by the agent
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub time: DateTime<Utc>,
}

impl Metric {
    pub fn new(name: &str, time: DateTime<Utc>) -> Metric {
        Metric {
            name: name.to_owned(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            time,
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Metric {
        self.tags.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn with_field<V: Into<FieldValue>>(mut self, key: &str, value: V) -> Metric {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    /// Nanoseconds since the unix epoch
    pub fn unix_nanos(&self) -> i128 {
        i128::from(self.time.timestamp()) * 1_000_000_000
            + i128::from(self.time.timestamp_subsec_nanos())
    }
}
