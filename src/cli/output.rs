//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::domain::models::Sample;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Borderless two-column table for command summaries.
pub fn detail_table(rows: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);
    for (key, value) in rows {
        table.add_row(vec![
            Cell::new(key.to_uppercase()).set_alignment(CellAlignment::Left),
            Cell::new(value),
        ]);
    }
    table
}

/// One fixed-width console line per sample.
///
/// Counter zero-padded to nine digits, time and rate to one decimal. An
/// unconvertible reading shows `-` in the temperature column.
pub fn format_report_line(sample: &Sample) -> String {
    let temperature = sample
        .converted_value
        .map_or_else(|| "-".to_string(), |t| format!("{t:.3}"));
    format!(
        "{:09}{:>10.1}{:>10.1}  {:<30}{:>20.3}{:>10}",
        sample.counter,
        sample.elapsed_time,
        sample.rate,
        sample.timestamp,
        sample.raw_value,
        temperature,
    )
}

/// Header matching [`format_report_line`].
pub fn report_header() -> String {
    format!(
        "{:<9}{:>10}{:>10}  {:<30}{:>20}{:>10}",
        "Counter", "Time", "Rate", "TimeStamp", "Raw", "Temp"
    )
}
