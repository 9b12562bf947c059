// Rule Invocation Handler
//
// Runs one evaluation end to end:
// decode → clients → normalize → filter → classify → remediate → report

use serde::Serialize;
use uuid::Uuid;

use crate::compliance::applicability::is_applicable;
use crate::compliance::classifier::{classify, Classification};
use crate::compliance::ComplianceVerdict;
use crate::credentials::{assume_role_credentials, CredentialError};
use crate::evaluation::{self, EvaluationSubmission};
use crate::event::{InputError, RuleEvent};
use crate::normalize::{self, NormalizeError};
use crate::remediation::{self, RemediationAction};
use crate::services::{ClientConnector, CredentialExchange, ServiceClients, ServiceError};
use crate::settings::Settings;

/// Result of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    pub invocation_id: Uuid,
    pub applicable: bool,
    pub verdict: ComplianceVerdict,
    /// Remediation actions applied, in order.
    pub actions: Vec<RemediationAction>,
    pub submission: EvaluationSubmission,
}

/// Errors that abort an invocation. No evaluation is reported for any of
/// them; redelivery is left to the caller.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("service call failed: {0}")]
    Service(#[from] ServiceError),
}

/// Build the invocation's clients, assuming the execution role first in
/// cross-account mode.
pub fn acquire_clients(
    event: &RuleEvent,
    connector: &dyn ClientConnector,
    exchange: &dyn CredentialExchange,
    settings: &Settings,
) -> Result<ServiceClients, HandlerError> {
    if !settings.assume_role {
        return Ok(connector.connect(None)?);
    }

    let role_arn = event.execution_role_arn()?;
    let credentials = assume_role_credentials(exchange, role_arn, &settings.role_session_name)?;
    Ok(connector.connect(Some(&credentials))?)
}

/// Evaluate `event` and report the verdict.
///
/// Every successful invocation submits exactly one evaluation, including
/// when the resource is not applicable.
pub fn handle_event(
    event: &RuleEvent,
    connector: &dyn ClientConnector,
    exchange: &dyn CredentialExchange,
    settings: &Settings,
) -> Result<EvaluationOutcome, HandlerError> {
    let invocation_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "evaluate",
        %invocation_id,
        resource_id = tracing::field::Empty
    );
    let _entered = span.enter();

    // Validate everything the report needs before touching any service.
    let invoking = event.invoking_event()?;
    let params = event.rule_parameters()?;
    let result_token = event.result_token()?;
    let subject = invoking.subject()?;
    span.record("resource_id", subject.resource_id.as_str());

    let clients = acquire_clients(event, connector, exchange, settings)?;

    let item = normalize::configuration_item(&invoking, clients.config.as_ref())?;
    tracing::debug!(?item, "configuration item");

    let applicable = is_applicable(Some(&item), Some(event));
    let Classification { verdict, actions } = if applicable {
        classify(&item, &params, &settings.policy)?
    } else {
        Classification::verdict(ComplianceVerdict::NotApplicable)
    };

    remediation::apply(clients.compute.as_ref(), &actions)?;

    let submission = evaluation::report(clients.config.as_ref(), &subject, verdict, result_token)?;

    Ok(EvaluationOutcome {
        invocation_id,
        applicable,
        verdict,
        actions,
        submission,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::config_history::HistoryRecord;
    use crate::credentials::{TemporaryCredentials, PERMISSION_DENIED_MESSAGE};
    use crate::services::memory::{InMemoryCompute, InMemoryConfigService, InMemoryConnector, StaticCredentialExchange};
    use serde_json::{json, Value};

    const TOKEN: &str = "result-token-1";
    const CAPTURE: &str = "2024-05-02T10:15:30.000Z";

    fn inline(resource_type: &str, status: &str, tags: Value) -> Value {
        json!({
            "messageType": "ConfigurationItemChangeNotification",
            "configurationItem": {
                "configurationItemCaptureTime": CAPTURE,
                "configurationItemStatus": status,
                "resourceType": resource_type,
                "resourceId": "i-0abc",
                "configuration": { "instanceType": "t3.micro", "tags": tags }
            }
        })
    }

    fn rule_event(invoking: Value) -> RuleEvent {
        RuleEvent {
            invoking_event: Some(invoking.to_string()),
            rule_parameters: Some(json!({ "desiredInstanceType": ["t3.micro"] }).to_string()),
            result_token: Some(TOKEN.into()),
            ..RuleEvent::default()
        }
    }

    fn no_role() -> StaticCredentialExchange {
        StaticCredentialExchange::failing(ServiceError::new("AssumeRole", "unexpected"))
    }

    fn run(event: &RuleEvent) -> (Result<EvaluationOutcome, HandlerError>, InMemoryConnector) {
        let connector = InMemoryConnector::default();
        let outcome = handle_event(event, &connector, &no_role(), &Settings::default());
        (outcome, connector)
    }

    fn assert_single_report(connector: &InMemoryConnector, resource_type: &str, verdict: ComplianceVerdict) {
        let submissions = connector.config.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].result_token, TOKEN);
        assert_eq!(submissions[0].evaluations.len(), 1);

        let evaluation = &submissions[0].evaluations[0];
        assert_eq!(evaluation.compliance_resource_type, resource_type);
        assert_eq!(evaluation.compliance_resource_id, "i-0abc");
        assert_eq!(evaluation.compliance_type, verdict);
        assert_eq!(evaluation.ordering_timestamp, CAPTURE);
    }

    #[test]
    fn compliant_instance_is_reported_without_remediation() {
        let event = rule_event(inline(
            "AWS::EC2::Instance",
            "OK",
            json!([{ "key": "env", "value": "prod" }, { "key": "owner", "value": "alice" }]),
        ));

        let (outcome, connector) = run(&event);

        assert_eq!(outcome.unwrap().verdict, ComplianceVerdict::Compliant);
        assert!(connector.compute.calls().is_empty());
        assert_single_report(&connector, "AWS::EC2::Instance", ComplianceVerdict::Compliant);
    }

    #[test]
    fn missing_owner_is_assigned_before_reporting() {
        let event = rule_event(inline("AWS::EC2::Instance", "OK", json!([{ "key": "env", "value": "prod" }])));

        let (outcome, connector) = run(&event);

        let outcome = outcome.unwrap();
        assert_eq!(outcome.verdict, ComplianceVerdict::Compliant);
        assert_eq!(
            connector.compute.calls(),
            vec![RemediationAction::AssignTag {
                resource_id: "i-0abc".into(),
                key: "owner".into(),
                value: Settings::default().policy.default_owner,
            }]
        );
        assert_eq!(outcome.actions, connector.compute.calls());
        assert_single_report(&connector, "AWS::EC2::Instance", ComplianceVerdict::Compliant);
    }

    #[test]
    fn non_prod_instance_is_stopped_and_reported_non_compliant() {
        let event = rule_event(inline("AWS::EC2::Instance", "OK", json!([{ "key": "env", "value": "staging" }])));

        let (outcome, connector) = run(&event);

        assert_eq!(outcome.unwrap().verdict, ComplianceVerdict::NonCompliant);
        assert_eq!(
            connector.compute.calls(),
            vec![RemediationAction::StopInstance {
                resource_id: "i-0abc".into()
            }]
        );
        assert_single_report(&connector, "AWS::EC2::Instance", ComplianceVerdict::NonCompliant);
    }

    #[test]
    fn other_resource_type_is_reported_not_applicable() {
        let event = rule_event(inline("AWS::EC2::Volume", "OK", json!([{ "key": "env", "value": "dev" }])));

        let (outcome, connector) = run(&event);

        assert_eq!(outcome.unwrap().verdict, ComplianceVerdict::NotApplicable);
        assert!(connector.compute.calls().is_empty());
        assert_single_report(&connector, "AWS::EC2::Volume", ComplianceVerdict::NotApplicable);
    }

    #[test]
    fn deleted_resource_is_reported_not_applicable() {
        let event = rule_event(inline(
            "AWS::EC2::Instance",
            "ResourceDeleted",
            json!([{ "key": "env", "value": "dev" }]),
        ));

        let (outcome, connector) = run(&event);

        let outcome = outcome.unwrap();
        assert!(!outcome.applicable);
        assert_eq!(outcome.verdict, ComplianceVerdict::NotApplicable);
        assert!(connector.compute.calls().is_empty());
        assert_single_report(&connector, "AWS::EC2::Instance", ComplianceVerdict::NotApplicable);
    }

    #[test]
    fn unrecorded_deletion_with_null_collections_is_reported_not_applicable() {
        let event = rule_event(json!({
            "messageType": "ConfigurationItemChangeNotification",
            "configurationItem": {
                "configurationItemCaptureTime": CAPTURE,
                "configurationItemStatus": "ResourceDeletedNotRecorded",
                "resourceType": "AWS::EC2::Instance",
                "resourceId": "i-0abc",
                "tags": null,
                "relatedEvents": null,
                "relationships": null,
                "supplementaryConfiguration": null,
                "configuration": null
            }
        }));

        let (outcome, connector) = run(&event);

        let outcome = outcome.unwrap();
        assert!(!outcome.applicable);
        assert_eq!(outcome.verdict, ComplianceVerdict::NotApplicable);
        assert!(connector.compute.calls().is_empty());
        assert_single_report(&connector, "AWS::EC2::Instance", ComplianceVerdict::NotApplicable);
    }

    #[test]
    fn oversized_notification_is_evaluated_like_inline() {
        let mut record = HistoryRecord::new("AWS::EC2::Instance", "i-0abc");
        record.configuration_item_capture_time = Some(CAPTURE.parse().unwrap());
        record.configuration_item_status = Some(crate::item::ItemStatus::Ok);
        record.configuration = Some(r#"{"instanceType":"t3.micro","tags":[{"key":"env","value":"staging"}]}"#.into());

        let connector = InMemoryConnector::new(InMemoryConfigService::with_history(vec![record]), InMemoryCompute::new());
        let event = rule_event(json!({
            "messageType": "OversizedConfigurationItemChangeNotification",
            "configurationItemSummary": {
                "resourceType": "AWS::EC2::Instance",
                "resourceId": "i-0abc",
                "configurationItemCaptureTime": CAPTURE
            }
        }));

        let outcome = handle_event(&event, &connector, &no_role(), &Settings::default()).unwrap();

        assert_eq!(outcome.verdict, ComplianceVerdict::NonCompliant);
        assert_eq!(connector.config.queries().len(), 1);
        assert_eq!(connector.compute.calls().len(), 1);
        assert_single_report(&connector, "AWS::EC2::Instance", ComplianceVerdict::NonCompliant);
    }

    #[test]
    fn missing_result_token_aborts_before_any_call() {
        let mut event = rule_event(inline("AWS::EC2::Instance", "OK", json!([{ "key": "env", "value": "dev" }])));
        event.result_token = None;

        let (outcome, connector) = run(&event);

        assert!(matches!(outcome, Err(HandlerError::Input(InputError::Missing("resultToken")))));
        assert!(connector.connections().is_empty());
        assert!(connector.compute.calls().is_empty());
        assert!(connector.config.submissions().is_empty());
    }

    #[test]
    fn classification_input_error_aborts_before_remediation() {
        let mut invoking = inline("AWS::EC2::Instance", "OK", json!([]));
        invoking["configurationItem"]["configuration"]
            .as_object_mut()
            .unwrap()
            .remove("tags");

        let (outcome, connector) = run(&rule_event(invoking));

        assert!(matches!(outcome, Err(HandlerError::Input(InputError::Missing("configuration.tags")))));
        assert!(connector.compute.calls().is_empty());
        assert!(connector.config.submissions().is_empty());
    }

    #[test]
    fn remediation_failure_suppresses_report() {
        let connector = InMemoryConnector::new(
            InMemoryConfigService::new(),
            InMemoryCompute::failing(ServiceError::new("StopInstances", "IncorrectInstanceState")),
        );
        let event = rule_event(inline("AWS::EC2::Instance", "OK", json!([{ "key": "env", "value": "dev" }])));

        let outcome = handle_event(&event, &connector, &no_role(), &Settings::default());

        assert!(matches!(outcome, Err(HandlerError::Service(_))));
        assert!(connector.config.submissions().is_empty());
    }

    #[test]
    fn cross_account_mode_connects_with_assumed_credentials() {
        let credentials = TemporaryCredentials {
            access_key_id: "ASIAEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: "token".into(),
        };
        let exchange = StaticCredentialExchange::granting(credentials.clone());
        let connector = InMemoryConnector::default();
        let settings = Settings {
            assume_role: true,
            ..Settings::default()
        };
        let mut event = rule_event(inline("AWS::EC2::Volume", "OK", json!([])));
        event.execution_role_arn = Some("arn:aws:iam::123456789012:role/config-eval".into());

        handle_event(&event, &connector, &exchange, &settings).unwrap();

        assert_eq!(
            exchange.requests(),
            vec![(
                "arn:aws:iam::123456789012:role/config-eval".to_string(),
                "configLambdaExecution".to_string()
            )]
        );
        assert_eq!(connector.connections(), vec![Some(credentials)]);
    }

    #[test]
    fn cross_account_mode_requires_role_arn() {
        let connector = InMemoryConnector::default();
        let settings = Settings {
            assume_role: true,
            ..Settings::default()
        };
        let event = rule_event(inline("AWS::EC2::Instance", "OK", json!([])));

        let outcome = handle_event(&event, &connector, &no_role(), &settings);

        assert!(matches!(outcome, Err(HandlerError::Input(InputError::Missing("executionRoleArn")))));
    }

    #[test]
    fn denied_role_assumption_is_sanitized() {
        let exchange = StaticCredentialExchange::failing(
            ServiceError::new("AssumeRole", "account 123456789012 denied").with_code("AccessDenied"),
        );
        let connector = InMemoryConnector::default();
        let settings = Settings {
            assume_role: true,
            ..Settings::default()
        };
        let mut event = rule_event(inline("AWS::EC2::Instance", "OK", json!([])));
        event.execution_role_arn = Some("arn:aws:iam::123456789012:role/config-eval".into());

        let err = handle_event(&event, &connector, &exchange, &settings).unwrap_err();

        assert!(err.to_string().contains(PERMISSION_DENIED_MESSAGE));
        assert!(!err.to_string().contains("123456789012"));
        assert!(connector.connections().is_empty());
        assert!(connector.config.submissions().is_empty());
    }
}
