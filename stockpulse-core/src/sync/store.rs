//! Series store: the ordered sample series of one session plus its watermark.

use crate::domain::Sample;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("sample at {timestamp} is older than watermark {watermark}")]
    BehindWatermark {
        timestamp: DateTime<Utc>,
        watermark: DateTime<Utc>,
    },

    #[error("duplicate sample timestamp {0}")]
    DuplicateTimestamp(DateTime<Utc>),
}

/// Ordered, duplicate-free series with a watermark.
///
/// The watermark is always the timestamp of the last stored sample, or `None`
/// while the series is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesStore {
    samples: Vec<Sample>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `batch` in the order given and advance the watermark.
    ///
    /// No windowing happens here. The whole batch is validated first and
    /// rejected without touching the store if any sample would break
    /// ordering: each timestamp must be strictly greater than the one before
    /// it (the current watermark for the first sample).
    pub fn append(&mut self, batch: &[Sample]) -> Result<usize, SeriesError> {
        let mut last = self.watermark();
        for sample in batch {
            if let Some(prev) = last {
                if sample.timestamp < prev {
                    return Err(SeriesError::BehindWatermark {
                        timestamp: sample.timestamp,
                        watermark: prev,
                    });
                }
                if sample.timestamp == prev {
                    return Err(SeriesError::DuplicateTimestamp(sample.timestamp));
                }
            }
            last = Some(sample.timestamp);
        }

        self.samples.extend_from_slice(batch);
        Ok(batch.len())
    }

    /// Clear samples and watermark.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// `(timestamp, value)` pairs in series order.
    pub fn points(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.samples.iter().map(|s| (s.timestamp, s.value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(secs: i64, v: f64) -> Sample {
        Sample::at_secs(secs, v)
    }

    #[test]
    fn empty_store_has_no_watermark() {
        let store = SeriesStore::new();
        assert!(store.is_empty());
        assert_eq!(store.watermark(), None);
    }

    #[test]
    fn append_advances_watermark() {
        let mut store = SeriesStore::new();
        assert_eq!(store.append(&[s(10, 5.0), s(15, 6.0)]).unwrap(), 2);
        assert_eq!(store.watermark(), Some(s(15, 0.0).timestamp));
        assert_eq!(store.append(&[s(20, 7.0)]).unwrap(), 1);
        assert_eq!(store.watermark(), Some(s(20, 0.0).timestamp));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut store = SeriesStore::new();
        store.append(&[s(10, 5.0)]).unwrap();
        assert_eq!(store.append(&[]).unwrap(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn rejects_sample_behind_watermark_atomically() {
        let mut store = SeriesStore::new();
        store.append(&[s(10, 5.0)]).unwrap();
        let err = store.append(&[s(12, 1.0), s(5, 1.0)]).unwrap_err();
        assert!(matches!(err, SeriesError::BehindWatermark { .. }));
        assert_eq!(store.len(), 1);
        assert_eq!(store.watermark(), Some(s(10, 0.0).timestamp));
    }

    #[test]
    fn rejects_duplicate_of_watermark() {
        let mut store = SeriesStore::new();
        store.append(&[s(10, 5.0)]).unwrap();
        let err = store.append(&[s(10, 5.0)]).unwrap_err();
        assert_eq!(err, SeriesError::DuplicateTimestamp(s(10, 0.0).timestamp));
    }

    #[test]
    fn rejects_duplicate_inside_batch() {
        let mut store = SeriesStore::new();
        assert!(store.append(&[s(1, 1.0), s(1, 2.0)]).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = SeriesStore::new();
        store.append(&[s(1, 1.0), s(2, 2.0)]).unwrap();
        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.watermark(), None);
        store.append(&[s(1, 1.0)]).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn points_follow_series_order() {
        let mut store = SeriesStore::new();
        store.append(&[s(1, 1.0), s(2, 2.5)]).unwrap();
        let pts = store.points();
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1].1, 2.5);
    }
}
