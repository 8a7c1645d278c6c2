//! ledgerq-core: records, condition trees, evaluation, update specs and output shaping.
//!
//! Everything here is deterministic and free of I/O.

pub mod condition;
pub mod eval;
pub mod format;
pub mod record;
pub mod update;

pub use condition::{
    Condition, ConditionError, ConditionSpec, DateOp, Field, FieldType, LogicalOp, NumberOp,
    Predicate, TextOp,
};
pub use eval::{evaluate, matches_all};
pub use format::{FormattedOutput, OutputControl, OutputMode, format_records};
pub use record::{FieldValue, Kind, Record};
pub use update::{FieldChange, MutableField, TextChange, UpdateError, UpdateSpec};
