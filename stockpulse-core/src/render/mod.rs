//! Rendering boundary.
//!
//! The sync controller emits a `ChartFrame` every time the visible series
//! changes. A `RenderSink` consumes frames; `ChartFormat` turns a frame into
//! the payload a particular chart library expects. Two formats ship:
//! - `AreaChartFormat` (row-oriented area chart with date column)
//! - `StockChartFormat` (series-oriented, epoch-millisecond points)

pub mod area;
pub mod stock;

pub use area::AreaChartFormat;
pub use stock::StockChartFormat;

use crate::domain::{Company, SessionId, UpstreamStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use tracing::warn;

/// Snapshot of the visible series handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFrame {
    pub session: SessionId,
    pub company: Company,
    pub status: UpstreamStatus,
    /// Full series, oldest first.
    pub points: Vec<(DateTime<Utc>, f64)>,
    /// How many of `points` arrived with the latest fetch.
    pub appended: usize,
    /// The series is empty and `points` holds the explicit placeholder.
    pub placeholder: bool,
}

impl ChartFrame {
    /// The tail of `points` that arrived with the latest fetch.
    pub fn new_points(&self) -> &[(DateTime<Utc>, f64)] {
        let start = self.points.len().saturating_sub(self.appended);
        &self.points[start..]
    }
}

/// Turns a frame into a chart-library payload.
pub trait ChartFormat: Send {
    fn name(&self) -> &'static str;

    fn build(&self, frame: &ChartFrame) -> serde_json::Value;
}

/// Consumer of chart frames.
pub trait RenderSink: Send {
    fn render(&mut self, frame: &ChartFrame);
}

/// Which chart format to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormatKind {
    #[default]
    Area,
    Stock,
}

impl ChartFormatKind {
    pub fn format(self) -> Box<dyn ChartFormat> {
        match self {
            ChartFormatKind::Area => Box::new(AreaChartFormat::default()),
            ChartFormatKind::Stock => Box::new(StockChartFormat),
        }
    }
}

impl fmt::Display for ChartFormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartFormatKind::Area => f.write_str("area"),
            ChartFormatKind::Stock => f.write_str("stock"),
        }
    }
}

impl FromStr for ChartFormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "area" => Ok(ChartFormatKind::Area),
            "stock" => Ok(ChartFormatKind::Stock),
            other => Err(format!("unknown chart format '{other}' (expected area or stock)")),
        }
    }
}

/// Keeps the latest payload in memory.
pub struct PayloadSink<F: ChartFormat> {
    format: F,
    latest: Option<serde_json::Value>,
    frames: usize,
}

impl<F: ChartFormat> PayloadSink<F> {
    pub fn new(format: F) -> Self {
        Self {
            format,
            latest: None,
            frames: 0,
        }
    }

    pub fn latest(&self) -> Option<&serde_json::Value> {
        self.latest.as_ref()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl<F: ChartFormat> RenderSink for PayloadSink<F> {
    fn render(&mut self, frame: &ChartFrame) {
        self.latest = Some(self.format.build(frame));
        self.frames += 1;
    }
}

/// Writes one JSON payload per line.
pub struct JsonLinesSink<W: Write + Send> {
    format: Box<dyn ChartFormat>,
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(format: Box<dyn ChartFormat>, writer: W) -> Self {
        Self { format, writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RenderSink for JsonLinesSink<W> {
    fn render(&mut self, frame: &ChartFrame) {
        let payload = self.format.build(frame);
        let result = serde_json::to_writer(&mut self.writer, &payload)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            warn!(format = self.format.name(), error = %e, "failed to write chart payload");
        }
    }
}

/// Placeholder point shown when a finished run produced no data.
pub(crate) fn placeholder_points(now: DateTime<Utc>) -> Vec<(DateTime<Utc>, f64)> {
    vec![(now, 0.0)]
}
