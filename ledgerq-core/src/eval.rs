//! Condition evaluator: `(record, condition) -> bool`.
//!
//! Total and pure. A predicate on a field the record does not carry is
//! false whatever the operator; an empty composite is true for both AND
//! and OR.

use crate::condition::{Condition, DateOp, LogicalOp, NumberOp, Predicate, TextOp};
use crate::record::{FieldValue, Record};

pub fn evaluate(record: &Record, condition: &Condition) -> bool {
    match condition {
        Condition::Predicate(p) => eval_predicate(record, p),
        Condition::Composite { conditions, .. } if conditions.is_empty() => true,
        Condition::Composite {
            op: LogicalOp::And,
            conditions,
        } => conditions.iter().all(|c| evaluate(record, c)),
        Condition::Composite {
            op: LogicalOp::Or,
            conditions,
        } => conditions.iter().any(|c| evaluate(record, c)),
    }
}

/// Records satisfying `condition`, input order preserved.
pub fn matches_all<'a>(records: &'a [Record], condition: &Condition) -> Vec<&'a Record> {
    records.iter().filter(|r| evaluate(r, condition)).collect()
}

fn eval_predicate(record: &Record, predicate: &Predicate) -> bool {
    let Some(actual) = record.field_value(predicate.field()) else {
        return false;
    };

    match (predicate, actual) {
        (
            Predicate::Text {
                op,
                value,
                case_sensitive,
                ..
            },
            FieldValue::Text(s),
        ) => eval_text(s, *op, value, *case_sensitive),
        (Predicate::Number { op, .. }, FieldValue::Number(n)) => eval_number(n, op),
        (Predicate::Date { op }, FieldValue::Date(d)) => eval_date(d, op),
        (Predicate::Kind { value }, FieldValue::Kind(k)) => k == *value,
        _ => false,
    }
}

fn eval_text(actual: &str, op: TextOp, expected: &str, case_sensitive: bool) -> bool {
    let (actual, expected) = if case_sensitive {
        (actual.to_string(), expected.to_string())
    } else {
        (actual.to_lowercase(), expected.to_lowercase())
    };

    match op {
        TextOp::Equals => actual == expected,
        TextOp::Contains => actual.contains(&expected),
        TextOp::StartsWith => actual.starts_with(&expected),
        TextOp::EndsWith => actual.ends_with(&expected),
    }
}

fn eval_number(actual: f64, op: &NumberOp) -> bool {
    match *op {
        NumberOp::Equals(v) => actual == v,
        NumberOp::NotEquals(v) => actual != v,
        NumberOp::GreaterThan(v) => actual > v,
        NumberOp::LessThan(v) => actual < v,
        NumberOp::GreaterOrEqual(v) => actual >= v,
        NumberOp::LessOrEqual(v) => actual <= v,
        NumberOp::Between {
            min: Some(lo),
            max: Some(hi),
        } => actual >= lo && actual <= hi,
        NumberOp::Between { .. } => false,
    }
}

fn eval_date(actual: &str, op: &DateOp) -> bool {
    match op {
        DateOp::Equals(v) => actual == v.as_str(),
        DateOp::Before(v) => actual < v.as_str(),
        DateOp::After(v) => actual > v.as_str(),
        DateOp::OnOrBefore(v) => actual <= v.as_str(),
        DateOp::OnOrAfter(v) => actual >= v.as_str(),
        DateOp::Between {
            start: Some(lo),
            end: Some(hi),
        } => actual >= lo.as_str() && actual <= hi.as_str(),
        DateOp::Between { .. } => false,
    }
}
