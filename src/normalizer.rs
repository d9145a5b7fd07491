use crate::diagnostics::Finding;
use crate::schema::{CleanedFields, FieldName, RawStatement, ERROR_FIELD};
use log::debug;
use serde_json::Value;

/// Placeholder extractors emit when a figure is not in the document.
pub const UNKNOWN_MARKER: &str = "Unknown";

/// Output of the cleaning stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedStatement {
    pub cleaned: CleanedFields,
    /// Statement fields that were present but could not be read as numbers.
    pub rejected: Vec<FieldName>,
    pub findings: Vec<Finding>,
}

pub struct Normalizer {
    min_cleaned_fields: usize,
}

impl Normalizer {
    pub fn new(min_cleaned_fields: usize) -> Self {
        Self { min_cleaned_fields }
    }

    pub fn normalize(&self, statement: &RawStatement) -> NormalizedStatement {
        let mut normalized = NormalizedStatement::default();

        if let Some(message) = statement.error_message() {
            normalized.findings.push(Finding::SourceError {
                message: message.to_string(),
            });
        }

        for (key, value) in statement.iter() {
            if key == ERROR_FIELD {
                continue;
            }

            let Some(field) = FieldName::from_key(key) else {
                normalized
                    .findings
                    .push(Finding::IgnoredField { key: key.clone() });
                continue;
            };

            match clean_value(value) {
                Some(number) => {
                    normalized.cleaned.insert(field, number);
                }
                None => {
                    debug!("Rejected {} with value {}", field, value);
                    normalized.rejected.push(field);
                    normalized.findings.push(Finding::UnparseableField {
                        field,
                        raw: value.clone(),
                    });
                }
            }
        }

        normalized
            .findings
            .extend(assess_data_quality(&normalized.cleaned, self.min_cleaned_fields));

        debug!(
            "Cleaned {} field(s), rejected {}",
            normalized.cleaned.len(),
            normalized.rejected.len()
        );

        normalized
    }
}

/// Reads one raw value as a number.
///
/// Numbers pass through. Strings other than [`UNKNOWN_MARKER`] are stripped down to digits,
/// `.` and `-` and parsed. Everything else is rejected.
pub fn clean_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|number| number.is_finite()),
        Value::String(text) if text != UNKNOWN_MARKER => parse_numeric_string(text),
        _ => None,
    }
}

/// Parses a display-formatted number such as `"$1,234.50"` or `"(12.3) million"`.
///
/// Only the leading numeric part of the stripped string is used, so `"12.3.4"` yields 12.3.
/// Parentheses and currency symbols are discarded, not interpreted as a sign.
pub fn parse_numeric_string(text: &str) -> Option<f64> {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    parse_leading_float(&stripped)
}

fn parse_leading_float(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = usize::from(bytes.first() == Some(&b'-'));

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        let frac_digits = frac_end - frac_start;
        if digits + frac_digits > 0 {
            digits += frac_digits;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    text[..end].parse::<f64>().ok().filter(|number| number.is_finite())
}

/// Flags cleaned data that is present but not trustworthy. Purely advisory.
pub fn assess_data_quality(cleaned: &CleanedFields, min_cleaned_fields: usize) -> Vec<Finding> {
    let mut findings: Vec<Finding> = cleaned
        .iter()
        .filter(|(_, value)| **value == 0.0 || value.is_nan())
        .map(|(field, _)| Finding::ZeroOrNanField { field: *field })
        .collect();

    if cleaned.len() < min_cleaned_fields {
        findings.push(Finding::InsufficientData {
            cleaned: cleaned.len(),
            required: min_cleaned_fields,
        });
    }

    findings
}
