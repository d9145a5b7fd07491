use crate::error::{IncomeFlowError, Result};
use crate::schema::{RawStatement, ERROR_FIELD};
use log::debug;
use serde_json::Value;

/// Prefix the model runner uses when it gives up on a request.
const MODEL_ERROR_PREFIX: &str = "Error:";

/// Converts an arbitrary JSON value into a statement.
///
/// `null` means no statement was produced at all, which is the one input the pipeline
/// cannot turn into a graph.
pub fn statement_from_value(value: Value) -> Result<RawStatement> {
    match value {
        Value::Null => Err(IncomeFlowError::MissingStatement),
        Value::Object(fields) => Ok(RawStatement::from(fields)),
        other => Err(IncomeFlowError::InvalidStatement(format!(
            "expected a JSON object of statement fields, got {}",
            json_type_name(&other)
        ))),
    }
}

pub fn statement_from_json(json: &str) -> Result<RawStatement> {
    let value: Value = serde_json::from_str(json)?;
    statement_from_value(value)
}

/// Reads a statement out of free-form model output.
///
/// Handles Markdown fences and chatter around the JSON by taking the outermost `{ ... }`.
/// A runner failure message becomes a statement carrying only an `error` field, so the
/// caller still gets a (degenerate) graph and a finding explaining why.
pub fn statement_from_model_response(response: &str) -> Result<RawStatement> {
    let trimmed = response.trim();

    if let Some(message) = trimmed.strip_prefix(MODEL_ERROR_PREFIX) {
        debug!("Model runner reported an error: {}", message.trim());
        return Ok(RawStatement::new().with(ERROR_FIELD, message.trim()));
    }

    let json = extract_json_object(trimmed).ok_or_else(|| {
        IncomeFlowError::ExtractionFailed(format!(
            "no JSON object found in model response ({} chars)",
            trimmed.len()
        ))
    })?;

    let value: Value = serde_json::from_str(json).map_err(|e| {
        IncomeFlowError::ExtractionFailed(format!("model response is not valid JSON: {}", e))
    })?;

    statement_from_value(value)
}

/// The span from the first `{` to the last `}`, if there is one.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
