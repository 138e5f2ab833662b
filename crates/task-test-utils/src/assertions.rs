//! Custom test assertions for the response envelope
//!
//! Every JSON response carries `{success, message, body?, errors}`.

use serde_json::Value;
use task_service::errors::UNAUTHORIZED_MESSAGE;

/// Custom assertions for envelope responses
///
/// # Example
/// ```rust,ignore
/// body.assert_success()
///     .assert_message("Task created successfully");
/// ```
pub trait EnvelopeAssertions {
    /// Assert `success: true`
    fn assert_success(&self) -> &Self;

    /// Assert `success: false` with no body
    fn assert_failure(&self) -> &Self;

    /// Assert the envelope message
    fn assert_message(&self, message: &str) -> &Self;

    /// Assert the fixed unauthorized envelope
    fn assert_unauthorized(&self) -> &Self;

    /// Assert that `errors` names the given field
    fn assert_field_error(&self, field: &str) -> &Self;
}

impl EnvelopeAssertions for Value {
    fn assert_success(&self) -> &Self {
        assert_eq!(
            self["success"], true,
            "expected a success envelope, got {self}"
        );
        self
    }

    fn assert_failure(&self) -> &Self {
        assert_eq!(
            self["success"], false,
            "expected a failure envelope, got {self}"
        );
        assert!(
            self.get("body").is_none(),
            "failure envelope must not carry a body: {self}"
        );
        self
    }

    fn assert_message(&self, message: &str) -> &Self {
        assert_eq!(
            self["message"], message,
            "unexpected envelope message in {self}"
        );
        self
    }

    fn assert_unauthorized(&self) -> &Self {
        self.assert_failure().assert_message(UNAUTHORIZED_MESSAGE);
        assert!(
            self["errors"].is_null(),
            "unauthorized envelope must not carry errors: {self}"
        );
        self
    }

    fn assert_field_error(&self, field: &str) -> &Self {
        assert!(
            self["errors"].get(field).is_some(),
            "expected a validation error for '{field}' in {self}"
        );
        self
    }
}
