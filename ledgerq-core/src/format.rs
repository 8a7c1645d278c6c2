//! Output shaping and size limits for search results.
//!
//! Shaping (id only / allow-listed fields / full) happens first; the
//! character budgets then apply to each shaped record's serialized JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::Record;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    IdOnly,
    Specified,
    #[default]
    Full,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputControl {
    #[serde(default)]
    pub mode: OutputMode,
    /// Allow-list used when `mode` is `specified`
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub max_chars_per_record: Option<usize>,
    #[serde(default)]
    pub max_total_chars: Option<usize>,
    #[serde(default)]
    pub max_records: Option<usize>,
}

impl OutputControl {
    pub fn id_only() -> Self {
        Self {
            mode: OutputMode::IdOnly,
            ..Self::default()
        }
    }

    pub fn specified(fields: &[&str]) -> Self {
        Self {
            mode: OutputMode::Specified,
            fields: Some(fields.iter().map(|f| f.to_string()).collect()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedOutput {
    pub records: Vec<Value>,
    pub count: usize,
    pub truncated: bool,
    pub truncated_count: usize,
}

pub fn format_records(records: &[Record], control: &OutputControl) -> FormattedOutput {
    let limit = control.max_records.unwrap_or(records.len());
    let mut out = Vec::new();
    let mut total_chars = 0usize;

    for record in records.iter().take(limit) {
        let shaped = shape(record, control);
        let text = shaped.to_string();
        let len = text.chars().count();

        let (item, len) = match control.max_chars_per_record {
            // The marker itself is the shortest clipped form.
            Some(cap) if len > cap.max(ELLIPSIS.len()) => {
                let cap = cap.max(ELLIPSIS.len());
                let cut: String = text.chars().take(cap - ELLIPSIS.len()).collect();
                let clipped = format!("{cut}{ELLIPSIS}");
                let n = clipped.chars().count();
                (Value::String(clipped), n)
            }
            _ => (shaped, len),
        };

        if let Some(budget) = control.max_total_chars {
            if total_chars + len > budget {
                break;
            }
        }

        total_chars += len;
        out.push(item);
    }

    let count = out.len();
    FormattedOutput {
        records: out,
        count,
        truncated: count < records.len(),
        truncated_count: records.len() - count,
    }
}

fn shape(record: &Record, control: &OutputControl) -> Value {
    match (control.mode, control.fields.as_ref()) {
        (OutputMode::IdOnly, _) => Value::from(record.id),
        (OutputMode::Specified, Some(fields)) => Value::Object(project(record, fields)),
        (OutputMode::Specified, None) | (OutputMode::Full, _) => full(record),
    }
}

fn full(record: &Record) -> Value {
    serde_json::to_value(record).unwrap_or(Value::Null)
}

fn project(record: &Record, fields: &[String]) -> Map<String, Value> {
    let Value::Object(all) = full(record) else {
        return Map::new();
    };
    fields
        .iter()
        .filter_map(|f| all.get(f).map(|v| (f.clone(), v.clone())))
        .collect()
}
