//! Data snapshots - the only channel through which control data reaches
//! the instruments.
//!
//! Parsing is lenient per field: a field with the wrong shape is dropped and
//! reads as "no new information", it never fails the whole snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A discrete solar flare event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlareEvent {
    pub id: String,
    /// GOES class label such as `"X1.0"` or `"M5.2"`.
    pub class_type: String,
}

impl FlareEvent {
    pub fn new(id: impl Into<String>, class_type: impl Into<String>) -> Self {
        FlareEvent {
            id: id.into(),
            class_type: class_type.into(),
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let id = str_field(obj, &["id", "flrID"])?;
        // Upstream defaults to C class when the label is missing
        let class_type = str_field(obj, &["class_type", "classType"]).unwrap_or("C");
        Some(FlareEvent::new(id, class_type))
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| obj.get(*name)?.as_str())
}

/// Immutable bundle of externally sourced fields.
///
/// `None` means the field was absent or malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct DataSnapshot {
    /// CME speeds in km/s, most recent last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cme_speed_series: Option<Vec<f64>>,
    /// Maximum planetary K index, nominally 0 to 9.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_kp_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunspot_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_flare: Option<FlareEvent>,
}

impl From<Value> for DataSnapshot {
    fn from(value: Value) -> Self {
        DataSnapshot::from_value(&value)
    }
}

impl DataSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document. Only a syntactically broken document is an
    /// error; anything else degrades to missing fields.
    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(source)?;
        Ok(Self::from_value(&value))
    }

    /// Extract the recognised fields from an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        DataSnapshot {
            cme_speed_series: obj.get("cme_speed_series").and_then(speed_series),
            max_kp_index: obj.get("max_kp_index").and_then(integer),
            sunspot_number: obj.get("sunspot_number").and_then(integer),
            latest_flare: obj.get("latest_flare").and_then(FlareEvent::from_value),
        }
    }

    pub fn with_speed_series(mut self, series: Vec<f64>) -> Self {
        self.cme_speed_series = Some(series);
        self
    }

    pub fn with_kp_index(mut self, kp: i64) -> Self {
        self.max_kp_index = Some(kp);
        self
    }

    pub fn with_sunspot_number(mut self, count: i64) -> Self {
        self.sunspot_number = Some(count);
        self
    }

    pub fn with_flare(mut self, flare: FlareEvent) -> Self {
        self.latest_flare = Some(flare);
        self
    }

    /// True when the snapshot carries no information at all.
    pub fn is_empty(&self) -> bool {
        self.cme_speed_series.is_none()
            && self.max_kp_index.is_none()
            && self.sunspot_number.is_none()
            && self.latest_flare.is_none()
    }

    /// Overlay the fields present in `newer` onto `self`.
    pub fn merge(mut self, newer: DataSnapshot) -> Self {
        if newer.cme_speed_series.is_some() {
            self.cme_speed_series = newer.cme_speed_series;
        }
        if newer.max_kp_index.is_some() {
            self.max_kp_index = newer.max_kp_index;
        }
        if newer.sunspot_number.is_some() {
            self.sunspot_number = newer.sunspot_number;
        }
        if newer.latest_flare.is_some() {
            self.latest_flare = newer.latest_flare;
        }
        self
    }
}

/// A malformed entry invalidates the whole series.
fn speed_series(value: &Value) -> Option<Vec<f64>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().filter(|s| s.is_finite()))
        .collect()
}

/// Integers pass through; fractional readings (Kp 5.67) truncate.
fn integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite())
        .map(|f| f.trunc() as i64)
}
