//! Condition model: typed predicates combined by AND/OR trees.
//!
//! Callers send conditions as JSON (`ConditionSpec`). Conversion into
//! `Condition` is where operator/field/operand combinations are checked, so
//! the evaluator only ever sees well-typed trees.
//!
//! Wire form:
//!
//! ```json
//! {"type": "logical", "operator": "AND", "conditions": [
//!     {"type": "condition", "field": "place", "operator": "contains", "value": "cafe"},
//!     {"type": "condition", "field": "amount", "operator": "between", "min": 500, "max": 2000}
//! ]}
//! ```

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::record::Kind;

/// Every field a predicate can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Place,
    Name,
    Comment,
    Category,
    Genre,
    Account,
    Id,
    CategoryId,
    GenreId,
    AccountId,
    FromAccountId,
    ToAccountId,
    Amount,
    Date,
    Kind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    Date,
    Kind,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::Place,
        Field::Name,
        Field::Comment,
        Field::Category,
        Field::Genre,
        Field::Account,
        Field::Id,
        Field::CategoryId,
        Field::GenreId,
        Field::AccountId,
        Field::FromAccountId,
        Field::ToAccountId,
        Field::Amount,
        Field::Date,
        Field::Kind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Place => "place",
            Field::Name => "name",
            Field::Comment => "comment",
            Field::Category => "category",
            Field::Genre => "genre",
            Field::Account => "account",
            Field::Id => "id",
            Field::CategoryId => "category_id",
            Field::GenreId => "genre_id",
            Field::AccountId => "account_id",
            Field::FromAccountId => "from_account_id",
            Field::ToAccountId => "to_account_id",
            Field::Amount => "amount",
            Field::Date => "date",
            Field::Kind => "kind",
        }
    }

    pub fn parse(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Place
            | Field::Name
            | Field::Comment
            | Field::Category
            | Field::Genre
            | Field::Account => FieldType::Text,
            Field::Id
            | Field::CategoryId
            | Field::GenreId
            | Field::AccountId
            | Field::FromAccountId
            | Field::ToAccountId
            | Field::Amount => FieldType::Number,
            Field::Date => FieldType::Date,
            Field::Kind => FieldType::Kind,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumberOp {
    Equals(f64),
    NotEquals(f64),
    GreaterThan(f64),
    LessThan(f64),
    GreaterOrEqual(f64),
    LessOrEqual(f64),
    /// Inclusive on both ends; a missing bound never matches.
    Between { min: Option<f64>, max: Option<f64> },
}

/// Operands are `YYYY-MM-DD` strings compared lexicographically.
#[derive(Debug, Clone, PartialEq)]
pub enum DateOp {
    Equals(String),
    Before(String),
    After(String),
    OnOrBefore(String),
    OnOrAfter(String),
    /// Inclusive on both ends; a missing bound never matches.
    Between {
        start: Option<String>,
        end: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Text {
        field: Field,
        op: TextOp,
        value: String,
        case_sensitive: bool,
    },
    Number {
        field: Field,
        op: NumberOp,
    },
    Date {
        op: DateOp,
    },
    Kind {
        value: Kind,
    },
}

impl Predicate {
    pub fn field(&self) -> Field {
        match self {
            Predicate::Text { field, .. } | Predicate::Number { field, .. } => *field,
            Predicate::Date { .. } => Field::Date,
            Predicate::Kind { .. } => Field::Kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Predicate(Predicate),
    Composite {
        op: LogicalOp,
        conditions: Vec<Condition>,
    },
}

impl Condition {
    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::Composite {
            op: LogicalOp::And,
            conditions,
        }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Composite {
            op: LogicalOp::Or,
            conditions,
        }
    }

    /// Case-insensitive text predicate.
    pub fn text(field: Field, op: TextOp, value: impl Into<String>) -> Self {
        Condition::Predicate(Predicate::Text {
            field,
            op,
            value: value.into(),
            case_sensitive: false,
        })
    }

    pub fn number(field: Field, op: NumberOp) -> Self {
        Condition::Predicate(Predicate::Number { field, op })
    }

    pub fn date(op: DateOp) -> Self {
        Condition::Predicate(Predicate::Date { op })
    }

    pub fn kind(value: Kind) -> Self {
        Condition::Predicate(Predicate::Kind { value })
    }

    /// Every field some predicate anywhere in the tree tests.
    pub fn fields(&self) -> BTreeSet<Field> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut BTreeSet<Field>) {
        match self {
            Condition::Predicate(p) => {
                out.insert(p.field());
            }
            Condition::Composite { conditions, .. } => {
                for c in conditions {
                    c.collect_fields(out);
                }
            }
        }
    }

    /// A tree with no predicate at all matches every record.
    pub fn is_unconditional(&self) -> bool {
        match self {
            Condition::Predicate(_) => false,
            Condition::Composite { conditions, .. } if conditions.is_empty() => true,
            Condition::Composite {
                op: LogicalOp::And,
                conditions,
            } => conditions.iter().all(Condition::is_unconditional),
            Condition::Composite {
                op: LogicalOp::Or,
                conditions,
            } => conditions.iter().any(Condition::is_unconditional),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("condition is missing `field`")]
    MissingField,
    #[error("condition on `{0}` is missing `operator`")]
    MissingOperator(String),
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("operator `{operator}` is not valid for field `{field}`")]
    InvalidOperator { field: String, operator: String },
    #[error("invalid operand for `{field}`: {reason}")]
    InvalidOperand { field: String, reason: String },
}

/// JSON shape of a condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConditionSpec {
    Condition(PredicateSpec),
    Logical(LogicalSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateSpec {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub min: Option<Value>,
    #[serde(default)]
    pub max: Option<Value>,
    #[serde(default)]
    pub start: Option<Value>,
    #[serde(default)]
    pub end: Option<Value>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalSpec {
    pub operator: LogicalOp,
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
}

impl TryFrom<ConditionSpec> for Condition {
    type Error = ConditionError;

    fn try_from(spec: ConditionSpec) -> Result<Self, Self::Error> {
        match spec {
            ConditionSpec::Condition(p) => Ok(Condition::Predicate(Predicate::try_from(p)?)),
            ConditionSpec::Logical(l) => Ok(Condition::Composite {
                op: l.operator,
                conditions: l
                    .conditions
                    .into_iter()
                    .map(Condition::try_from)
                    .collect::<Result<_, _>>()?,
            }),
        }
    }
}

impl Condition {
    /// Parse a condition tree straight from caller JSON.
    pub fn from_json(value: Value) -> Result<Self, ConditionError> {
        let spec: ConditionSpec =
            serde_json::from_value(value).map_err(|e| ConditionError::InvalidOperand {
                field: "criteria".to_string(),
                reason: e.to_string(),
            })?;
        Condition::try_from(spec)
    }
}

impl TryFrom<PredicateSpec> for Predicate {
    type Error = ConditionError;

    fn try_from(spec: PredicateSpec) -> Result<Self, Self::Error> {
        let name = spec
            .field
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConditionError::MissingField)?;
        let field = Field::parse(name).ok_or_else(|| ConditionError::UnknownField(name.to_string()))?;
        let operator = spec
            .operator
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConditionError::MissingOperator(name.to_string()))?;

        let invalid_op = || ConditionError::InvalidOperator {
            field: name.to_string(),
            operator: operator.to_string(),
        };

        match field.field_type() {
            FieldType::Text => {
                let op = match operator {
                    "equals" => TextOp::Equals,
                    "contains" => TextOp::Contains,
                    "startsWith" => TextOp::StartsWith,
                    "endsWith" => TextOp::EndsWith,
                    _ => return Err(invalid_op()),
                };
                Ok(Predicate::Text {
                    field,
                    op,
                    value: text_operand(field, spec.value.as_ref())?,
                    case_sensitive: spec.case_sensitive.unwrap_or(false),
                })
            }
            FieldType::Number => {
                let op = match operator {
                    "between" => {
                        let (min, max) =
                            bounds((spec.min.as_ref(), spec.max.as_ref()), spec.value.as_ref());
                        NumberOp::Between {
                            min: optional(min, |v| number_operand(field, v))?,
                            max: optional(max, |v| number_operand(field, v))?,
                        }
                    }
                    _ => {
                        let n = number_operand(field, required(field, spec.value.as_ref())?)?;
                        match operator {
                            "equals" => NumberOp::Equals(n),
                            "notEquals" => NumberOp::NotEquals(n),
                            "greaterThan" => NumberOp::GreaterThan(n),
                            "lessThan" => NumberOp::LessThan(n),
                            "greaterOrEqual" => NumberOp::GreaterOrEqual(n),
                            "lessOrEqual" => NumberOp::LessOrEqual(n),
                            _ => return Err(invalid_op()),
                        }
                    }
                };
                Ok(Predicate::Number { field, op })
            }
            FieldType::Date => {
                let op = match operator {
                    "between" => {
                        let (start, end) =
                            bounds((spec.start.as_ref(), spec.end.as_ref()), spec.value.as_ref());
                        DateOp::Between {
                            start: optional(start, date_operand)?,
                            end: optional(end, date_operand)?,
                        }
                    }
                    _ => {
                        let d = date_operand(required(field, spec.value.as_ref())?)?;
                        match operator {
                            "equals" => DateOp::Equals(d),
                            "before" => DateOp::Before(d),
                            "after" => DateOp::After(d),
                            "onOrBefore" => DateOp::OnOrBefore(d),
                            "onOrAfter" => DateOp::OnOrAfter(d),
                            _ => return Err(invalid_op()),
                        }
                    }
                };
                Ok(Predicate::Date { op })
            }
            FieldType::Kind => {
                if operator != "equals" {
                    return Err(invalid_op());
                }
                let raw = text_operand(field, spec.value.as_ref())?;
                let value = Kind::parse(&raw).ok_or_else(|| ConditionError::InvalidOperand {
                    field: name.to_string(),
                    reason: format!("expected outflow, inflow or transfer, got `{raw}`"),
                })?;
                Ok(Predicate::Kind { value })
            }
        }
    }
}

/// Bounds for `between`: named operands first, then a two-element `value` array.
fn bounds<'a>(
    named: (Option<&'a Value>, Option<&'a Value>),
    value: Option<&'a Value>,
) -> (Option<&'a Value>, Option<&'a Value>) {
    if named.0.is_some() || named.1.is_some() {
        return named;
    }
    match value {
        Some(Value::Array(items)) => (items.first(), items.get(1)),
        _ => (None, None),
    }
}

fn optional<T>(
    v: Option<&Value>,
    parse: impl Fn(&Value) -> Result<T, ConditionError>,
) -> Result<Option<T>, ConditionError> {
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(v) => parse(v).map(Some),
    }
}

fn required(field: Field, v: Option<&Value>) -> Result<&Value, ConditionError> {
    v.filter(|v| !v.is_null()).ok_or_else(|| ConditionError::InvalidOperand {
        field: field.to_string(),
        reason: "missing `value`".to_string(),
    })
}

fn text_operand(field: Field, v: Option<&Value>) -> Result<String, ConditionError> {
    match required(field, v)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(ConditionError::InvalidOperand {
            field: field.to_string(),
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn number_operand(field: Field, v: &Value) -> Result<f64, ConditionError> {
    v.as_f64().ok_or_else(|| ConditionError::InvalidOperand {
        field: field.to_string(),
        reason: format!("expected a number, got {v}"),
    })
}

fn date_operand(v: &Value) -> Result<String, ConditionError> {
    let invalid = || ConditionError::InvalidOperand {
        field: "date".to_string(),
        reason: format!("expected YYYY-MM-DD, got {v}"),
    };
    let s = v.as_str().ok_or_else(invalid)?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())?;
    Ok(s.to_string())
}
