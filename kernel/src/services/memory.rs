// In-Memory Services
//
// Process-local implementations of the collaborator contracts. They
// serve canned configuration history and record every mutating call,
// which makes them suitable for dry runs and tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::{
    ClientConnector, ComputeService, ConfigService, CredentialExchange, HistoryQuery, ServiceClients, ServiceError,
};
use crate::adapters::config_history::HistoryRecord;
use crate::credentials::TemporaryCredentials;
use crate::evaluation::EvaluationSubmission;
use crate::item::Tag;
use crate::remediation::RemediationAction;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Configuration service backed by a fixed set of history records.
#[derive(Debug, Default)]
pub struct InMemoryConfigService {
    history: Vec<HistoryRecord>,
    queries: Mutex<Vec<HistoryQuery>>,
    submissions: Mutex<Vec<EvaluationSubmission>>,
}

impl InMemoryConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: Vec<HistoryRecord>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    /// History lookups received so far.
    pub fn queries(&self) -> Vec<HistoryQuery> {
        guard(&self.queries).clone()
    }

    /// Evaluation submissions received so far.
    pub fn submissions(&self) -> Vec<EvaluationSubmission> {
        guard(&self.submissions).clone()
    }
}

impl ConfigService for InMemoryConfigService {
    fn get_resource_config_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, ServiceError> {
        guard(&self.queries).push(query.clone());

        let later_time: DateTime<Utc> = query.later_time.parse().map_err(|e| {
            ServiceError::new("GetResourceConfigHistory", format!("invalid laterTime: {e}"))
                .with_code("ValidationException")
        })?;

        let mut matches: Vec<HistoryRecord> = self
            .history
            .iter()
            .filter(|r| r.resource_type == query.resource_type && r.resource_id == query.resource_id)
            .filter(|r| r.configuration_item_capture_time.map_or(true, |t| t <= later_time))
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.configuration_item_capture_time.cmp(&a.configuration_item_capture_time));
        matches.truncate(query.limit as usize);
        Ok(matches)
    }

    fn put_evaluations(&self, submission: &EvaluationSubmission) -> Result<(), ServiceError> {
        guard(&self.submissions).push(submission.clone());
        Ok(())
    }
}

/// Compute service that records remediation calls instead of making them.
#[derive(Debug, Default)]
pub struct InMemoryCompute {
    calls: Mutex<Vec<RemediationAction>>,
    failure: Option<ServiceError>,
}

impl InMemoryCompute {
    pub fn new() -> Self {
        Self::default()
    }

    /// A compute service whose every call fails with `err`.
    pub fn failing(err: ServiceError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<RemediationAction> {
        guard(&self.calls).clone()
    }

    fn check(&self) -> Result<(), ServiceError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl ComputeService for InMemoryCompute {
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<(), ServiceError> {
        self.check()?;
        let mut calls = guard(&self.calls);
        for tag in tags {
            calls.push(RemediationAction::AssignTag {
                resource_id: resource_id.to_string(),
                key: tag.key.clone(),
                value: tag.value.clone(),
            });
        }
        Ok(())
    }

    fn stop_instances(&self, instance_ids: &[String]) -> Result<(), ServiceError> {
        self.check()?;
        let mut calls = guard(&self.calls);
        for id in instance_ids {
            calls.push(RemediationAction::StopInstance {
                resource_id: id.clone(),
            });
        }
        Ok(())
    }
}

/// Credential exchange that returns a fixed outcome.
#[derive(Debug)]
pub struct StaticCredentialExchange {
    outcome: Result<TemporaryCredentials, ServiceError>,
    requests: Mutex<Vec<(String, String)>>,
}

impl StaticCredentialExchange {
    pub fn granting(credentials: TemporaryCredentials) -> Self {
        Self {
            outcome: Ok(credentials),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: ServiceError) -> Self {
        Self {
            outcome: Err(err),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(role_arn, session_name)` pairs requested so far.
    pub fn requests(&self) -> Vec<(String, String)> {
        guard(&self.requests).clone()
    }
}

impl CredentialExchange for StaticCredentialExchange {
    fn assume_role(&self, role_arn: &str, session_name: &str) -> Result<TemporaryCredentials, ServiceError> {
        guard(&self.requests).push((role_arn.to_string(), session_name.to_string()));
        self.outcome.clone()
    }
}

/// Hands out shared in-memory clients so callers can inspect them after
/// an invocation.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConnector {
    pub config: Arc<InMemoryConfigService>,
    pub compute: Arc<InMemoryCompute>,
    connections: Arc<Mutex<Vec<Option<TemporaryCredentials>>>>,
}

impl InMemoryConnector {
    pub fn new(config: InMemoryConfigService, compute: InMemoryCompute) -> Self {
        Self {
            config: Arc::new(config),
            compute: Arc::new(compute),
            connections: Arc::default(),
        }
    }

    /// Credentials passed to each `connect` call.
    pub fn connections(&self) -> Vec<Option<TemporaryCredentials>> {
        guard(&self.connections).clone()
    }
}

impl ClientConnector for InMemoryConnector {
    fn connect(&self, credentials: Option<&TemporaryCredentials>) -> Result<ServiceClients, ServiceError> {
        guard(&self.connections).push(credentials.cloned());
        Ok(ServiceClients {
            config: Box::new(Arc::clone(&self.config)),
            compute: Box::new(Arc::clone(&self.compute)),
        })
    }
}
