//! The JSON error body posted to `.../error` and `/init/error`.

use crate::error::RuntimeError;
use serde::{Deserialize, Serialize};

/// `{"errorType": ..., "errorMessage": ...}`, the shape the Runtime API
/// requires for both invocation errors and init errors.
///
/// `Diagnostic` is derived from [`RuntimeError`], whose variants carry the
/// stable `errorType` tags from the taxonomy. A handler's own error type
/// never needs to convert to `Diagnostic` directly: it only needs
/// `Into<BoxError>`, which `TypedAdapter` folds into
/// [`RuntimeError::HandlerFailure`] before this conversion ever runs, so the
/// tag stays keyed to the closed taxonomy rather than to a caller's Rust type
/// name.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// The stable error kind, e.g. `"HandlerFailure"`.
    pub error_type: String,
    /// Human-readable description of the failure.
    pub error_message: String,
}

impl From<&RuntimeError> for Diagnostic {
    fn from(value: &RuntimeError) -> Self {
        Diagnostic {
            error_type: value.error_type().to_string(),
            error_message: value.to_string(),
        }
    }
}

impl From<RuntimeError> for Diagnostic {
    fn from(value: RuntimeError) -> Self {
        Diagnostic::from(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn serializes_in_runtime_api_shape() {
        let diagnostic = Diagnostic {
            error_type: "HandlerFailure".into(),
            error_message: "boom".into(),
        };
        let actual: Value = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(actual, json!({"errorType": "HandlerFailure", "errorMessage": "boom"}));
    }

    #[test]
    fn runtime_error_carries_its_taxonomy_tag() {
        let err = RuntimeError::HandlerFailure("db unreachable".into());
        let diagnostic: Diagnostic = (&err).into();
        assert_eq!(diagnostic.error_type, "HandlerFailure");
        assert!(diagnostic.error_message.contains("db unreachable"));
    }
}
