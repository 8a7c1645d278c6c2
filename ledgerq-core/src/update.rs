//! Update specs for bulk mutation: which fields change and how.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::condition::{Condition, Field};
use crate::record::{Kind, Record};

/// Fields a bulk update may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MutableField {
    Amount,
    Date,
    CategoryId,
    GenreId,
    AccountId,
    FromAccountId,
    ToAccountId,
    Place,
    Name,
    Comment,
}

impl MutableField {
    pub const ALL: [MutableField; 10] = [
        MutableField::Amount,
        MutableField::Date,
        MutableField::CategoryId,
        MutableField::GenreId,
        MutableField::AccountId,
        MutableField::FromAccountId,
        MutableField::ToAccountId,
        MutableField::Place,
        MutableField::Name,
        MutableField::Comment,
    ];

    /// The filterable field with the same name.
    pub fn field(&self) -> Field {
        match self {
            MutableField::Amount => Field::Amount,
            MutableField::Date => Field::Date,
            MutableField::CategoryId => Field::CategoryId,
            MutableField::GenreId => Field::GenreId,
            MutableField::AccountId => Field::AccountId,
            MutableField::FromAccountId => Field::FromAccountId,
            MutableField::ToAccountId => Field::ToAccountId,
            MutableField::Place => Field::Place,
            MutableField::Name => Field::Name,
            MutableField::Comment => Field::Comment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.field().as_str()
    }

    pub fn parse(name: &str) -> Option<MutableField> {
        MutableField::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextChange {
    Replace(String),
    /// Literal substring replacement of every occurrence of `pattern`.
    Partial { pattern: String, replacement: String },
}

impl TextChange {
    pub fn apply(&self, current: Option<&str>) -> String {
        match self {
            TextChange::Replace(v) => v.clone(),
            TextChange::Partial {
                pattern,
                replacement,
            } => {
                let current = current.unwrap_or("");
                if pattern.is_empty() {
                    current.to_string()
                } else {
                    current.replace(pattern.as_str(), replacement)
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Number(f64),
    Id(i64),
    Date(String),
    Text(TextChange),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpdateError {
    #[error("updates must be a non-empty object")]
    Empty,
    #[error("field `{0}` cannot be updated")]
    NotMutable(String),
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Ordered set of field changes applied to every target record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    changes: BTreeMap<MutableField, FieldChange>,
}

impl UpdateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: MutableField, change: FieldChange) -> Self {
        self.changes.insert(field, change);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = MutableField> + '_ {
        self.changes.keys().copied()
    }

    /// Parse caller JSON such as
    /// `{"category_id": 5, "place": {"mode": "partial", "search": "Cafe", "replace": "Café"}}`.
    ///
    /// Text fields also accept a bare string (replace) or
    /// `{"mode": "replace", "value": "..."}`.
    pub fn from_json(value: &Value) -> Result<Self, UpdateError> {
        let obj = value.as_object().filter(|o| !o.is_empty()).ok_or(UpdateError::Empty)?;

        let mut spec = UpdateSpec::new();
        for (name, raw) in obj {
            let field = MutableField::parse(name).ok_or_else(|| UpdateError::NotMutable(name.clone()))?;
            let change = parse_change(field, raw)?;
            spec.changes.insert(field, change);
        }
        Ok(spec)
    }

    /// Updated fields the criteria never test, by name.
    pub fn uncovered_fields(&self, criteria: &Condition) -> Vec<String> {
        let tested = criteria.fields();
        self.fields()
            .filter(|f| !tested.contains(&f.field()))
            .map(|f| f.as_str().to_string())
            .collect()
    }

    /// The record as it would look after the update.
    pub fn apply(&self, record: &Record) -> Record {
        let mut out = record.clone();
        for (field, change) in &self.changes {
            match (field, change) {
                (MutableField::Amount, FieldChange::Number(n)) => out.amount = *n,
                (MutableField::Date, FieldChange::Date(d)) => out.date = d.clone(),
                (MutableField::CategoryId, FieldChange::Id(id)) => out.category_id = Some(*id),
                (MutableField::GenreId, FieldChange::Id(id)) => out.genre_id = Some(*id),
                (MutableField::AccountId, FieldChange::Id(id)) => out.account_id = Some(*id),
                (MutableField::FromAccountId, FieldChange::Id(id)) => out.from_account_id = Some(*id),
                (MutableField::ToAccountId, FieldChange::Id(id)) => out.to_account_id = Some(*id),
                (MutableField::Place, FieldChange::Text(t)) => {
                    out.place = Some(t.apply(record.place.as_deref()))
                }
                (MutableField::Name, FieldChange::Text(t)) => {
                    out.name = Some(t.apply(record.name.as_deref()))
                }
                (MutableField::Comment, FieldChange::Text(t)) => {
                    out.comment = Some(t.apply(record.comment.as_deref()))
                }
                _ => {}
            }
        }
        self.sync_account_alias(&mut out);
        out
    }

    /// `account_id` mirrors `from_account_id` on outflows and
    /// `to_account_id` on inflows. The kind-specific field wins when both
    /// are changed.
    fn sync_account_alias(&self, out: &mut Record) {
        let (specific, slot) = match out.kind {
            Kind::Outflow => (MutableField::FromAccountId, &mut out.from_account_id),
            Kind::Inflow => (MutableField::ToAccountId, &mut out.to_account_id),
            Kind::Transfer => return,
        };
        if self.changes.contains_key(&specific) {
            out.account_id = *slot;
        } else if self.changes.contains_key(&MutableField::AccountId) {
            *slot = out.account_id;
        }
    }

    /// Before/after values of every touched field, keyed by field name.
    pub fn preview(&self, record: &Record) -> (Map<String, Value>, Map<String, Value>) {
        let after_record = self.apply(record);
        let mut before = Map::new();
        let mut after = Map::new();
        for field in self.fields() {
            before.insert(field.as_str().to_string(), field_json(record, field));
            after.insert(field.as_str().to_string(), field_json(&after_record, field));
        }
        (before, after)
    }
}

fn field_json(record: &Record, field: MutableField) -> Value {
    let id = |v: Option<i64>| v.map(Value::from).unwrap_or(Value::Null);
    let text = |v: &Option<String>| v.clone().map(Value::String).unwrap_or(Value::Null);
    match field {
        MutableField::Amount => Value::from(record.amount),
        MutableField::Date => Value::String(record.date.clone()),
        MutableField::CategoryId => id(record.category_id),
        MutableField::GenreId => id(record.genre_id),
        MutableField::AccountId => id(record.account_id),
        MutableField::FromAccountId => id(record.from_account_id),
        MutableField::ToAccountId => id(record.to_account_id),
        MutableField::Place => text(&record.place),
        MutableField::Name => text(&record.name),
        MutableField::Comment => text(&record.comment),
    }
}

fn parse_change(field: MutableField, raw: &Value) -> Result<FieldChange, UpdateError> {
    let invalid = |reason: String| UpdateError::InvalidValue {
        field: field.as_str().to_string(),
        reason,
    };

    match field {
        MutableField::Amount => raw
            .as_f64()
            .map(FieldChange::Number)
            .ok_or_else(|| invalid(format!("expected a number, got {raw}"))),
        MutableField::Date => {
            let s = raw
                .as_str()
                .ok_or_else(|| invalid(format!("expected YYYY-MM-DD, got {raw}")))?;
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| invalid(format!("expected YYYY-MM-DD, got {raw}")))?;
            Ok(FieldChange::Date(s.to_string()))
        }
        MutableField::CategoryId
        | MutableField::GenreId
        | MutableField::AccountId
        | MutableField::FromAccountId
        | MutableField::ToAccountId => raw
            .as_i64()
            .map(FieldChange::Id)
            .ok_or_else(|| invalid(format!("expected an integer id, got {raw}"))),
        MutableField::Place | MutableField::Name | MutableField::Comment => {
            parse_text_change(raw).map(FieldChange::Text).map_err(invalid)
        }
    }
}

fn parse_text_change(raw: &Value) -> Result<TextChange, String> {
    let obj = match raw {
        Value::String(s) => return Ok(TextChange::Replace(s.clone())),
        Value::Object(obj) => obj,
        other => return Err(format!("expected a string or update object, got {other}")),
    };

    let get = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
    match obj.get("mode").and_then(Value::as_str).unwrap_or("replace") {
        "replace" => get("value")
            .map(TextChange::Replace)
            .ok_or_else(|| "replace mode needs a string `value`".to_string()),
        "partial" => {
            let pattern = get("search").ok_or("partial mode needs a string `search`")?;
            let replacement = get("replace").ok_or("partial mode needs a string `replace`")?;
            if pattern.is_empty() {
                return Err("partial mode needs a non-empty `search`".to_string());
            }
            Ok(TextChange::Partial {
                pattern,
                replacement,
            })
        }
        other => Err(format!("unknown mode `{other}` (expected replace or partial)")),
    }
}
