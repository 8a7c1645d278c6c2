//! Ledger record types as returned by the remote API.

use serde::{Deserialize, Serialize};

use crate::condition::Field;

/// Direction of money movement for a record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Outflow,
    Inflow,
    Transfer,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Outflow => "outflow",
            Kind::Inflow => "inflow",
            Kind::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Kind> {
        match s {
            "outflow" => Some(Kind::Outflow),
            "inflow" => Some(Kind::Inflow),
            "transfer" => Some(Kind::Transfer),
            _ => None,
        }
    }
}

/// A single ledger entry.
///
/// Records are read-only from this crate's point of view; the only place a
/// modified copy exists is as the proposed value of an update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: i64,
    pub kind: Kind,
    /// Calendar date, `YYYY-MM-DD` (a trailing time part is tolerated)
    pub date: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<i64>,
    /// Source account, transfers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_account_id: Option<i64>,
    /// Destination account, transfers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Display name of `category_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Display name of `genre_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Display name of `account_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// A typed view of one field of a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    Date(&'a str),
    Kind(Kind),
}

impl Record {
    /// Minimal record; optional fields start empty.
    pub fn new(id: i64, kind: Kind, date: impl Into<String>, amount: f64) -> Self {
        Self {
            id,
            kind,
            date: date.into(),
            amount,
            category_id: None,
            genre_id: None,
            account_id: None,
            from_account_id: None,
            to_account_id: None,
            place: None,
            name: None,
            comment: None,
            category: None,
            genre: None,
            account: None,
        }
    }

    pub fn with_place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_category(mut self, id: i64, display: impl Into<String>) -> Self {
        self.category_id = Some(id);
        self.category = Some(display.into());
        self
    }

    pub fn with_genre(mut self, id: i64, display: impl Into<String>) -> Self {
        self.genre_id = Some(id);
        self.genre = Some(display.into());
        self
    }

    pub fn with_account(mut self, id: i64, display: impl Into<String>) -> Self {
        self.account_id = Some(id);
        self.account = Some(display.into());
        self
    }

    pub fn with_transfer(mut self, from: i64, to: i64) -> Self {
        self.from_account_id = Some(from);
        self.to_account_id = Some(to);
        self
    }

    /// The `YYYY-MM-DD` part of `date`.
    pub fn date_key(&self) -> &str {
        self.date.get(..10).unwrap_or(&self.date)
    }

    /// Look up a field by name. Absent optionals and an empty date are `None`.
    pub fn field_value(&self, field: Field) -> Option<FieldValue<'_>> {
        match field {
            Field::Place => text(&self.place),
            Field::Name => text(&self.name),
            Field::Comment => text(&self.comment),
            Field::Category => text(&self.category),
            Field::Genre => text(&self.genre),
            Field::Account => text(&self.account),
            Field::Id => Some(FieldValue::Number(self.id as f64)),
            Field::CategoryId => id(self.category_id),
            Field::GenreId => id(self.genre_id),
            Field::AccountId => id(self.account_id),
            Field::FromAccountId => id(self.from_account_id),
            Field::ToAccountId => id(self.to_account_id),
            Field::Amount => Some(FieldValue::Number(self.amount)),
            Field::Date => {
                if self.date.is_empty() {
                    None
                } else {
                    Some(FieldValue::Date(self.date_key()))
                }
            }
            Field::Kind => Some(FieldValue::Kind(self.kind)),
        }
    }

    /// One-line description used by delete previews.
    pub fn summary(&self) -> String {
        let mut parts = vec![self.date_key().to_string(), format_amount(self.amount)];
        if let Some(place) = self.place.as_deref().filter(|s| !s.is_empty()) {
            parts.push(place.to_string());
        }
        if let Some(name) = self.name.as_deref().filter(|s| !s.is_empty()) {
            parts.push(name.to_string());
        }
        parts.join(" | ")
    }
}

fn text(v: &Option<String>) -> Option<FieldValue<'_>> {
    v.as_deref().map(FieldValue::Text)
}

fn id(v: Option<i64>) -> Option<FieldValue<'static>> {
    v.map(|n| FieldValue::Number(n as f64))
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{amount:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_missing() {
        let r = Record::new(1, Kind::Outflow, "2024-01-15", 1000.0);
        assert!(r.field_value(Field::Place).is_none());
        assert!(r.field_value(Field::FromAccountId).is_none());
        assert_eq!(r.field_value(Field::Amount), Some(FieldValue::Number(1000.0)));
    }

    #[test]
    fn test_date_key_strips_time() {
        let r = Record::new(1, Kind::Inflow, "2024-01-15 09:30:00", 1.0);
        assert_eq!(r.date_key(), "2024-01-15");
        assert_eq!(r.field_value(Field::Date), Some(FieldValue::Date("2024-01-15")));
    }

    #[test]
    fn test_empty_date_is_missing() {
        let r = Record::new(1, Kind::Inflow, "", 1.0);
        assert!(r.field_value(Field::Date).is_none());
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let r = Record::new(7, Kind::Transfer, "2024-03-01", 50.0).with_transfer(1, 2);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["kind"], "transfer");
        assert_eq!(v["from_account_id"], 1);
        assert!(v.get("place").is_none());
    }

    #[test]
    fn test_summary() {
        let r = Record::new(1, Kind::Outflow, "2024-01-15", 1000.0)
            .with_place("Cafe")
            .with_name("Latte");
        assert_eq!(r.summary(), "2024-01-15 | 1000 | Cafe | Latte");
    }
}
