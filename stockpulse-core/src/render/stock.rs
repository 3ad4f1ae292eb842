//! Series-oriented stock chart payload.

use super::{ChartFormat, ChartFrame};
use serde_json::{json, Value};

/// `{ chart, title, subtitle, xAxis, series: [{ name, type, data: [[epoch_ms, value], ...] }] }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockChartFormat;

impl ChartFormat for StockChartFormat {
    fn name(&self) -> &'static str {
        "stock"
    }

    fn build(&self, frame: &ChartFrame) -> Value {
        let data: Vec<Value> = frame
            .points
            .iter()
            .map(|(t, v)| json!([t.timestamp_millis(), v]))
            .collect();
        let name = &frame.company.company_name;

        json!({
            "chart": { "type": "area" },
            "title": { "text": format!("{name} Stock Price") },
            "subtitle": { "text": frame.company.company_short_code },
            "xAxis": { "type": "datetime", "title": { "text": "Date" } },
            "yAxis": { "title": { "text": "Stock Price" } },
            "series": [{
                "name": name,
                "type": "area",
                "data": data
            }],
            "status": frame.status.as_str(),
            "placeholder": frame.placeholder
        })
    }
}
