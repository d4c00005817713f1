//! Human-readable rendering of nodes, process values and the watch list.

use crate::change::LiveValue;
use crate::types::{LogMessage, ProcessValue, VeapObject};
use crate::watch::WatchedDataPoint;
use chrono::{DateTime, Local, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::Value;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Converts a value to a short human-readable string.
pub fn pretty_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => pretty_float(f),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(pretty_value).collect();
            format!("({})", parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}={}", k, pretty_value(v)))
                .collect();
            format!("({})", parts.join(", "))
        }
    }
}

/// Very large and very small magnitudes use scientific notation.
fn pretty_float(f: f64) -> String {
    let abs = f.abs();
    if abs > 1e11 || (abs > 0.0 && abs < 1e-9) {
        format!("{:e}", f)
    } else {
        f.to_string()
    }
}

pub fn pretty_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|ts| {
        ts.with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S%.3f")
            .to_string()
    })
    .unwrap_or_default()
}

pub fn pretty_quality(pv: &ProcessValue) -> String {
    pv.quality_band()
        .map(|q| q.to_string())
        .unwrap_or_default()
}

fn value_cells(live: &LiveValue) -> [String; 3] {
    match (&live.pv, &live.error) {
        (Some(pv), _) => {
            let value = pretty_value(&pv.value);
            let value = if live.changed {
                format!("{}", value.black().on_yellow())
            } else {
                format!("{}", value.bold())
            };
            [value, pretty_timestamp(pv.timestamp), pretty_quality(pv)]
        }
        (None, Some(error)) => [
            format!("{}", format!("Error: {}", error).red()),
            String::new(),
            String::new(),
        ],
        (None, None) => [String::new(), String::new(), String::new()],
    }
}

/// Format a node: properties, live value flag and navigable links.
pub fn format_object_text(object: &VeapObject) -> String {
    let mut out = String::new();
    let heading = object.title.as_deref().unwrap_or(&object.address);
    out.push_str(&format!("{}\n\n", format_section_heading(heading)));
    out.push_str(&format!("  Address: {}\n", object.address));
    out.push_str(&format!(
        "  Variable: {}\n\n",
        if object.has_process_value() { "yes" } else { "no" }
    ));

    out.push_str(&format!("{}\n\n", format_section_heading("Properties")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Value"]);
    table.add_row(vec![
        "Title".to_string(),
        object.title.clone().unwrap_or_default(),
    ]);
    table.add_row(vec![
        "Description".to_string(),
        object.description.clone().unwrap_or_default(),
    ]);
    for (key, value) in object.display_properties() {
        table.add_row(vec![key.clone(), pretty_value(value)]);
    }
    out.push_str(&format!("{}\n\n", table));

    out.push_str(&format!("{}\n\n", format_section_heading("Links")));
    let links = object.navigable_links();
    if links.is_empty() {
        out.push_str("No links.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Title", "Type", "Address", "Target"]);
    for link in links {
        table.add_row(vec![
            link.title.clone().unwrap_or_default(),
            link.rel.clone().unwrap_or_default(),
            link.href.clone(),
            object.resolve(&link.href),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

/// Format one live value as a single table row.
pub fn format_live_value_text(address: &str, live: &LiveValue) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Address", "Value", "Timestamp", "Quality"]);
    let [value, ts, quality] = value_cells(live);
    table.add_row(vec![address.to_string(), value, ts, quality]);
    format!("{}", table)
}

/// Format the watch list.
pub fn format_watch_list_text(points: &[WatchedDataPoint]) -> String {
    if points.is_empty() {
        return "No data points watched.\n".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Address", "Value", "Timestamp", "Quality"]);
    for point in points {
        let [value, ts, quality] = value_cells(point.live());
        table.add_row(vec![
            point.name.clone(),
            point.address.clone(),
            value,
            ts,
            quality,
        ]);
    }
    format!("{}\n", table)
}

/// Format the server's diagnostic log.
pub fn format_log_text(log: &[LogMessage]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Log messages"));
    if log.is_empty() {
        out.push_str("No log messages.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Timestamp", "Level", "Module", "Message"]);
    for entry in log {
        let level = match entry.level.as_str() {
            "ERROR" => format!("{}", entry.level.red()),
            "WARNING" => format!("{}", entry.level.yellow()),
            "DEBUG" | "TRACE" => format!("{}", entry.level.dimmed()),
            _ => entry.level.clone(),
        };
        table.add_row(vec![
            entry.timestamp.clone(),
            level,
            entry.module.clone(),
            entry.message.clone(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
