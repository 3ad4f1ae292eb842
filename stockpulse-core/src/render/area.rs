//! Row-oriented area chart payload.

use super::{ChartFormat, ChartFrame};
use chrono::SecondsFormat;
use serde_json::{json, Value};

/// `{ type: "AreaChart", data: [[date, value], ...], columnNames, options, height }`.
///
/// Dates are RFC 3339 strings. The placeholder frame renders as a bare
/// `{ type, data }` with its single zero point.
#[derive(Debug, Clone)]
pub struct AreaChartFormat {
    pub height: u32,
}

impl Default for AreaChartFormat {
    fn default() -> Self {
        Self { height: 600 }
    }
}

impl ChartFormat for AreaChartFormat {
    fn name(&self) -> &'static str {
        "area"
    }

    fn build(&self, frame: &ChartFrame) -> Value {
        let data: Vec<Value> = frame
            .points
            .iter()
            .map(|(t, v)| json!([t.to_rfc3339_opts(SecondsFormat::Millis, true), v]))
            .collect();

        if frame.placeholder {
            return json!({ "type": "AreaChart", "data": data });
        }

        let name = &frame.company.company_name;
        json!({
            "type": "AreaChart",
            "data": data,
            "columnNames": ["Date", name],
            "options": {
                "legend": { "position": "left" },
                "title": format!("{name} Stock Price"),
                "chartArea": { "width": "85%", "height": "75%" },
                "hAxis": {
                    "title": "Date",
                    "direction": -1,
                    "slantedText": true,
                    "slantedTextAngle": 90
                },
                "vAxis": { "title": "Stock Price" }
            },
            "height": self.height
        })
    }
}
