//! Request validation run before any model is touched.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::policy::ClampPolicy;
use crate::rank::RankRequest;
use crate::summarize::SummarizeRequest;
use crate::{Error, Result};

pub const ERR_INVALID_JSON: &str = "Invalid JSON";
pub const ERR_RANK_FIELDS: &str = "query and documents required";
pub const ERR_NO_TEXTS: &str = "No texts provided";

/// Reject a body whose declared length exceeds `limit`, before reading it.
pub fn check_content_length(declared: Option<u64>, limit: u64) -> Result<()> {
    match declared {
        Some(declared) if declared > limit => Err(Error::PayloadTooLarge {
            declared: Some(declared),
            limit,
        }),
        _ => Ok(()),
    }
}

/// Parse a JSON body. Syntax errors are reported as `Invalid JSON`; a
/// well-formed body with the wrong shape is reported with `shape_error`.
pub fn parse_body<T: DeserializeOwned>(body: &[u8], shape_error: &str) -> Result<T> {
    let value = parse_json(body)?;
    serde_json::from_value(value).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        Error::InvalidRequest(shape_error.to_string())
    })
}

/// Parse a summarization body. Only a missing, null or empty `texts` is
/// reported as `No texts provided`; other shape errors name the field.
pub fn parse_summarize(body: &[u8]) -> Result<SummarizeRequest> {
    let value = parse_json(body)?;

    let no_texts = match value.get("texts") {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    };
    if no_texts {
        return Err(Error::InvalidRequest(ERR_NO_TEXTS.to_string()));
    }

    for field in ["max_length", "min_length"] {
        match value.get(field) {
            None | Some(Value::Null) => {}
            Some(v) if v.as_u64().is_some() => {}
            Some(_) => {
                return Err(Error::InvalidRequest(format!(
                    "{} must be a non-negative integer",
                    field
                )))
            }
        }
    }

    serde_json::from_value(value)
        .map_err(|e| Error::InvalidRequest(format!("Invalid request: {}", e)))
}

fn parse_json(body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(|_| Error::InvalidRequest(ERR_INVALID_JSON.to_string()))
}

/// Ranking input after validation and clamping
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRank {
    pub query: String,
    pub documents: Vec<String>,
}

pub fn validate_rank(request: RankRequest, policy: &ClampPolicy) -> Result<ValidRank> {
    if request.query.is_empty() || request.documents.is_empty() {
        return Err(Error::InvalidRequest(ERR_RANK_FIELDS.to_string()));
    }
    Ok(ValidRank {
        query: request.query,
        documents: policy.clamp_documents(request.documents),
    })
}

pub fn validate_summarize(request: &SummarizeRequest) -> Result<()> {
    if request.texts.is_empty() {
        return Err(Error::InvalidRequest(ERR_NO_TEXTS.to_string()));
    }
    Ok(())
}
