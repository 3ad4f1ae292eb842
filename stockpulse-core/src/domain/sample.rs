//! Price sample: one observed stock value at a point in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A single observed stock price.
///
/// Wire form is `{ "date": "<RFC 3339>", "currentValue": 123.4 }`. The backend
/// sometimes sends `currentValue` as a numeric string, so both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "currentValue", deserialize_with = "number_or_string")]
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Build a sample from epoch seconds. Out-of-range seconds clamp to the epoch.
    pub fn at_secs(secs: i64, value: f64) -> Self {
        let timestamp = DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH);
        Self { timestamp, value }
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid currentValue '{s}': {e}"))),
    }
}
