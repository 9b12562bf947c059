// Evaluation Reporter
//
// Packages the verdict for the notification's resource and submits it to
// the configuration service together with the result token.

use serde::{Deserialize, Serialize};

use crate::compliance::ComplianceVerdict;
use crate::event::NotificationSubject;
use crate::services::{ConfigService, ServiceError};

/// A single evaluation, in the service's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Evaluation {
    pub compliance_resource_type: String,
    pub compliance_resource_id: String,
    pub compliance_type: ComplianceVerdict,
    pub ordering_timestamp: String,
}

/// Payload of one put-evaluations call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EvaluationSubmission {
    pub evaluations: Vec<Evaluation>,
    pub result_token: String,
}

impl EvaluationSubmission {
    pub fn single(subject: &NotificationSubject, verdict: ComplianceVerdict, result_token: &str) -> Self {
        Self {
            evaluations: vec![Evaluation {
                compliance_resource_type: subject.resource_type.clone(),
                compliance_resource_id: subject.resource_id.clone(),
                compliance_type: verdict,
                ordering_timestamp: subject.capture_time.clone(),
            }],
            result_token: result_token.to_string(),
        }
    }
}

/// Submit exactly one evaluation for `subject`.
pub fn report(
    config: &dyn ConfigService,
    subject: &NotificationSubject,
    verdict: ComplianceVerdict,
    result_token: &str,
) -> Result<EvaluationSubmission, ServiceError> {
    let submission = EvaluationSubmission::single(subject, verdict, result_token);
    config.put_evaluations(&submission)?;
    tracing::info!(
        resource_type = %subject.resource_type,
        resource_id = %subject.resource_id,
        %verdict,
        "evaluation submitted"
    );
    Ok(submission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryConfigService;

    fn subject() -> NotificationSubject {
        NotificationSubject {
            resource_type: "AWS::EC2::Instance".into(),
            resource_id: "i-0abc".into(),
            capture_time: "2024-05-02T10:15:30.000Z".into(),
        }
    }

    #[test]
    fn submission_matches_wire_shape() {
        let submission = EvaluationSubmission::single(&subject(), ComplianceVerdict::Compliant, "token-1");

        let value = serde_json::to_value(&submission).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "Evaluations": [{
                    "ComplianceResourceType": "AWS::EC2::Instance",
                    "ComplianceResourceId": "i-0abc",
                    "ComplianceType": "COMPLIANT",
                    "OrderingTimestamp": "2024-05-02T10:15:30.000Z"
                }],
                "ResultToken": "token-1"
            })
        );
    }

    #[test]
    fn report_submits_once() {
        let config = InMemoryConfigService::new();

        let submission = report(&config, &subject(), ComplianceVerdict::NotApplicable, "token-1").unwrap();

        assert_eq!(config.submissions(), vec![submission]);
    }
}
