use super::Identity;
use crate::errors::TaskError;
use crate::observability::metrics::record_authorization_decision;

/// Operation being authorized against a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Access,
    Update,
    Delete,
}

impl TaskAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskAction::Access => "access",
            TaskAction::Update => "update",
            TaskAction::Delete => "delete",
        }
    }
}

/// Allow the action only when `identity` owns the resource.
///
/// Call after the resource has been found and before any projection or
/// mutation. Absence is the caller's 404; this only ever yields 403.
pub fn ensure_owner(owner_id: i64, identity: &Identity, action: TaskAction) -> Result<(), TaskError> {
    if owner_id == identity.subject_id() {
        record_authorization_decision(action.as_str(), "allowed");
        return Ok(());
    }

    tracing::warn!(
        target: "task.auth.ownership",
        action = action.as_str(),
        user_id = identity.subject_id(),
        "Ownership check failed"
    );
    record_authorization_decision(action.as_str(), "denied");

    Err(TaskError::Forbidden(format!(
        "User is not authorized to {} this task",
        action.as_str()
    )))
}
