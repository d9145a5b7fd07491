//! Advisory findings collected while building a flow graph.
//!
//! Nothing in here ever stops processing. Callers get the full list back with the result
//! and decide whether to surface, log or ignore it.

use crate::inference::InferenceRule;
use crate::schema::FieldName;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// The extractor reported a failure through the statement's `error` field.
    SourceError { message: String },
    /// A statement field whose value could not be read as a number.
    UnparseableField { field: FieldName, raw: Value },
    /// A key that is not one of the six statement fields.
    IgnoredField { key: String },
    /// A cleaned value of exactly zero (or NaN), which usually means "not found".
    ZeroOrNanField { field: FieldName },
    InsufficientData { cleaned: usize, required: usize },
    FieldInferred {
        field: FieldName,
        rule: InferenceRule,
        value: f64,
        logic: String,
    },
    /// A node whose outgoing flows do not add up to its own width.
    FlowImbalance {
        node: FieldName,
        expected: f64,
        actual: f64,
        difference: f64,
    },
}

impl Finding {
    pub fn severity(&self) -> Severity {
        match self {
            Finding::IgnoredField { .. } | Finding::FieldInferred { .. } => Severity::Info,
            Finding::SourceError { .. }
            | Finding::UnparseableField { .. }
            | Finding::ZeroOrNanField { .. }
            | Finding::InsufficientData { .. }
            | Finding::FlowImbalance { .. } => Severity::Warning,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::SourceError { message } => {
                write!(f, "Source reported an extraction error: {}", message)
            }
            Finding::UnparseableField { field, raw } => {
                write!(f, "Could not parse {} from value {}", field, raw)
            }
            Finding::IgnoredField { key } => write!(f, "Ignored unrecognized field '{}'", key),
            Finding::ZeroOrNanField { field } => {
                write!(f, "{} is zero or not a number; data may be incomplete", field)
            }
            Finding::InsufficientData { cleaned, required } => write!(
                f,
                "Only {} usable field(s) found (at least {} expected); the diagram is largely estimated",
                cleaned, required
            ),
            Finding::FieldInferred {
                field, value, logic, ..
            } => write!(f, "{} inferred as {}: {}", field, value, logic),
            Finding::FlowImbalance {
                node,
                expected,
                actual,
                difference,
            } => write!(
                f,
                "Flows out of {} sum to {} but the node carries {} (off by {:.2})",
                node, actual, expected, difference
            ),
        }
    }
}

/// Emits each finding through the `log` facade at a level matching its severity.
pub fn log_findings(findings: &[Finding]) {
    for finding in findings {
        match finding.severity() {
            Severity::Warning => warn!("{}", finding),
            Severity::Info => debug!("{}", finding),
        }
    }
}

pub fn warnings(findings: &[Finding]) -> impl Iterator<Item = &Finding> {
    findings.iter().filter(|finding| finding.is_warning())
}
