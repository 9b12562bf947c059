// Collaborator Service Contracts
//
// Defines the calls the evaluator makes against the configuration
// service, the compute service and the credential service.
// Implementations may talk to AWS, record calls in memory, etc.
//
// This module defines *interfaces only*; see `memory` for the
// in-process implementations.

use std::sync::Arc;

use crate::adapters::config_history::HistoryRecord;
use crate::credentials::TemporaryCredentials;
use crate::evaluation::EvaluationSubmission;
use crate::item::Tag;

pub mod memory;

/// A collaborator call failed.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{operation} failed: {message}")]
pub struct ServiceError {
    pub operation: &'static str,
    pub code: Option<String>,
    pub message: String,
}

impl ServiceError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Configuration-history lookup parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub resource_type: String,
    pub resource_id: String,
    /// Only records captured at or before this time are returned.
    pub later_time: String,
    pub limit: u32,
}

impl HistoryQuery {
    /// Query for the single most recent record at or before `later_time`.
    pub fn latest(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        later_time: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            later_time: later_time.into(),
            limit: 1,
        }
    }
}

/// Configuration-tracking service.
///
/// Implementations must:
/// - return history records newest first
/// - never return more than `query.limit` records
/// - accept repeated submissions of the same evaluation
pub trait ConfigService: Send + Sync {
    fn get_resource_config_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, ServiceError>;

    fn put_evaluations(&self, submission: &EvaluationSubmission) -> Result<(), ServiceError>;
}

/// Compute service managing instance tags and power state.
///
/// Both calls must be idempotent: re-applying an identical tag or stopping
/// an instance that is already stopping or stopped is a no-op.
pub trait ComputeService: Send + Sync {
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<(), ServiceError>;

    fn stop_instances(&self, instance_ids: &[String]) -> Result<(), ServiceError>;
}

/// Temporary-credential exchange for a named role.
pub trait CredentialExchange: Send + Sync {
    fn assume_role(&self, role_arn: &str, session_name: &str) -> Result<TemporaryCredentials, ServiceError>;
}

impl<T: ConfigService + ?Sized> ConfigService for Arc<T> {
    fn get_resource_config_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, ServiceError> {
        (**self).get_resource_config_history(query)
    }

    fn put_evaluations(&self, submission: &EvaluationSubmission) -> Result<(), ServiceError> {
        (**self).put_evaluations(submission)
    }
}

impl<T: ComputeService + ?Sized> ComputeService for Arc<T> {
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<(), ServiceError> {
        (**self).create_tags(resource_id, tags)
    }

    fn stop_instances(&self, instance_ids: &[String]) -> Result<(), ServiceError> {
        (**self).stop_instances(instance_ids)
    }
}

/// Clients used for the lifetime of one invocation.
pub struct ServiceClients {
    pub config: Box<dyn ConfigService>,
    pub compute: Box<dyn ComputeService>,
}

/// Builds invocation clients, optionally from temporary credentials.
pub trait ClientConnector {
    fn connect(&self, credentials: Option<&TemporaryCredentials>) -> Result<ServiceClients, ServiceError>;
}
