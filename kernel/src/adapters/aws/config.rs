use std::sync::Arc;

use aws_sdk_config::primitives::{DateTime, DateTimeFormat};
use aws_sdk_config::types::{ComplianceType, ConfigurationItem, Evaluation, ResourceType};
use serde_json::Value;
use tokio::runtime::Runtime;

use super::service_error;
use crate::adapters::config_history::{HistoryRecord, HistoryRelationship};
use crate::evaluation::EvaluationSubmission;
use crate::item::ItemStatus;
use crate::services::{ConfigService, HistoryQuery, ServiceError};

const GET_HISTORY: &str = "GetResourceConfigHistory";
const PUT_EVALUATIONS: &str = "PutEvaluations";

/// Configuration service backed by AWS Config.
pub struct AwsConfigService {
    client: aws_sdk_config::Client,
    runtime: Arc<Runtime>,
}

impl AwsConfigService {
    pub fn new(client: aws_sdk_config::Client, runtime: Arc<Runtime>) -> Self {
        Self { client, runtime }
    }
}

impl ConfigService for AwsConfigService {
    fn get_resource_config_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, ServiceError> {
        let later_time = parse_timestamp(GET_HISTORY, &query.later_time)?;

        let output = self
            .runtime
            .block_on(
                self.client
                    .get_resource_config_history()
                    .resource_type(ResourceType::from(query.resource_type.as_str()))
                    .resource_id(&query.resource_id)
                    .later_time(later_time)
                    .limit(query.limit as i32)
                    .send(),
            )
            .map_err(|e| service_error(GET_HISTORY, e))?;

        Ok(output.configuration_items().iter().map(history_record).collect())
    }

    fn put_evaluations(&self, submission: &EvaluationSubmission) -> Result<(), ServiceError> {
        let mut request = self.client.put_evaluations().result_token(&submission.result_token);

        for evaluation in &submission.evaluations {
            let built = Evaluation::builder()
                .compliance_resource_type(&evaluation.compliance_resource_type)
                .compliance_resource_id(&evaluation.compliance_resource_id)
                .compliance_type(ComplianceType::from(evaluation.compliance_type.as_str()))
                .ordering_timestamp(parse_timestamp(PUT_EVALUATIONS, &evaluation.ordering_timestamp)?)
                .build()
                .map_err(|e| ServiceError::new(PUT_EVALUATIONS, e.to_string()))?;
            request = request.evaluations(built);
        }

        let output = self
            .runtime
            .block_on(request.send())
            .map_err(|e| service_error(PUT_EVALUATIONS, e))?;

        let failed = output.failed_evaluations();
        if !failed.is_empty() {
            return Err(ServiceError::new(
                PUT_EVALUATIONS,
                format!("{} evaluation(s) rejected", failed.len()),
            ));
        }
        Ok(())
    }
}

fn parse_timestamp(operation: &'static str, text: &str) -> Result<DateTime, ServiceError> {
    DateTime::from_str(text, DateTimeFormat::DateTime).map_err(|e| {
        ServiceError::new(operation, format!("invalid timestamp {text:?}: {e}")).with_code("ValidationException")
    })
}

fn to_chrono(ts: &DateTime) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

fn history_record(item: &ConfigurationItem) -> HistoryRecord {
    let owned = |s: Option<&str>| s.map(str::to_string);

    HistoryRecord {
        version: owned(item.version()),
        account_id: owned(item.account_id()),
        configuration_item_capture_time: item.configuration_item_capture_time().and_then(to_chrono),
        configuration_item_status: item.configuration_item_status().map(|s| {
            serde_json::from_value(Value::String(s.as_str().to_string())).unwrap_or(ItemStatus::Unknown)
        }),
        configuration_state_id: owned(item.configuration_state_id()),
        configuration_item_md5_hash: owned(item.configuration_item_md5_hash()),
        arn: owned(item.arn()),
        resource_type: item.resource_type().map(|t| t.as_str().to_string()).unwrap_or_default(),
        resource_id: item.resource_id().unwrap_or_default().to_string(),
        resource_name: owned(item.resource_name()),
        aws_region: owned(item.aws_region()),
        availability_zone: owned(item.availability_zone()),
        resource_creation_time: item.resource_creation_time().and_then(to_chrono),
        tags: item
            .tags()
            .map(|tags| tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default(),
        related_events: item.related_events().to_vec(),
        relationships: item
            .relationships()
            .iter()
            .map(|r| HistoryRelationship {
                resource_type: r.resource_type().map(|t| t.as_str().to_string()),
                resource_id: owned(r.resource_id()),
                resource_name: owned(r.resource_name()),
                relationship_name: owned(r.relationship_name()),
            })
            .collect(),
        configuration: owned(item.configuration()),
        supplementary_configuration: item
            .supplementary_configuration()
            .map(|sc| sc.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default(),
    }
}
