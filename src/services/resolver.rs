use crate::models::{ExecutionPayload, UploadRequest};
use crate::services::error::PipelineError;
use serde_json::Value;

const MISSING_FIELDS: &str = "Missing archiveId or context in payload";

/// Turn a normalized payload into a validated [`UploadRequest`].
///
/// Fails when the payload is not an object or either field is missing, not a string,
/// or blank.
pub fn resolve(payload: &Value) -> Result<UploadRequest, PipelineError> {
    if !payload.is_object() {
        return Err(PipelineError::InvalidRequest(
            "Payload must be a JSON object".to_string(),
        ));
    }

    let parsed = ExecutionPayload::deserialize_from(payload)?;

    match (non_blank(parsed.archive_id), non_blank(parsed.context)) {
        (Some(archive_id), Some(context)) => Ok(UploadRequest {
            archive_id,
            context,
        }),
        _ => Err(PipelineError::InvalidRequest(MISSING_FIELDS.to_string())),
    }
}

impl ExecutionPayload {
    fn deserialize_from(payload: &Value) -> Result<Self, PipelineError> {
        serde_json::from_value(payload.clone()).map_err(|e| {
            PipelineError::InvalidRequest(format!("{} ({})", MISSING_FIELDS, e))
        })
    }
}

/// Identifiers are opaque: blankness is checked on the trimmed value, but the
/// original string is kept.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_valid_payload() {
        let request = resolve(&json!({ "archiveId": "abc", "context": "tenant-a" })).unwrap();
        assert_eq!(request.archive_id, "abc");
        assert_eq!(request.context, "tenant-a");
    }

    #[test]
    fn test_resolve_keeps_identifiers_verbatim() {
        let request = resolve(&json!({ "archiveId": " abc ", "context": "x " })).unwrap();
        assert_eq!(request.archive_id, " abc ");
        assert_eq!(request.context, "x ");
    }

    #[test]
    fn test_missing_or_empty_fields_are_rejected() {
        for payload in [
            json!({ "context": "x" }),
            json!({ "archiveId": "abc" }),
            json!({ "archiveId": "", "context": "x" }),
            json!({ "archiveId": "abc", "context": "   " }),
            json!({}),
        ] {
            let err = resolve(&payload).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidRequest(_)), "{payload}");
        }
    }

    #[test]
    fn test_non_string_field_is_rejected() {
        let err = resolve(&json!({ "archiveId": 42, "context": "x" })).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        assert!(resolve(&json!("abc")).is_err());
        assert!(resolve(&Value::Null).is_err());
    }
}
