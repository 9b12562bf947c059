// Remediation Actuator
//
// Performs the side effects the classifier plans: tagging an instance or
// stopping it. Each action is a single compute-service call and is not
// verified after it returns.

use serde::{Deserialize, Serialize};

use crate::item::Tag;
use crate::services::{ComputeService, ServiceError};

/// A side effect requested by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemediationAction {
    /// Attach `key=value` to the resource.
    AssignTag {
        resource_id: String,
        key: String,
        value: String,
    },

    /// Move the instance to a stopped power state.
    StopInstance { resource_id: String },
}

impl RemediationAction {
    pub fn resource_id(&self) -> &str {
        match self {
            RemediationAction::AssignTag { resource_id, .. } => resource_id,
            RemediationAction::StopInstance { resource_id } => resource_id,
        }
    }
}

/// Attach a single tag to `resource_id`.
pub fn assign_tag(compute: &dyn ComputeService, resource_id: &str, key: &str, value: &str) -> Result<(), ServiceError> {
    compute.create_tags(resource_id, &[Tag::new(key, value)])?;
    tracing::info!(resource_id, key, value, "tagged non-compliant instance");
    Ok(())
}

/// Request that `resource_id` be stopped.
pub fn stop_resource(compute: &dyn ComputeService, resource_id: &str) -> Result<(), ServiceError> {
    compute.stop_instances(&[resource_id.to_string()])?;
    tracing::info!(resource_id, "stopped non-compliant instance");
    Ok(())
}

/// Apply `actions` in order. Stops at the first failure.
pub fn apply(compute: &dyn ComputeService, actions: &[RemediationAction]) -> Result<(), ServiceError> {
    for action in actions {
        match action {
            RemediationAction::AssignTag { resource_id, key, value } => assign_tag(compute, resource_id, key, value)?,
            RemediationAction::StopInstance { resource_id } => stop_resource(compute, resource_id)?,
        }
    }
    Ok(())
}
