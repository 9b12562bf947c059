// Compliance Classifier
//
// Tag-based decision tree for compute instances:
//
//   wrong resource type            -> NOT_APPLICABLE
//   no instance-type constraint    -> NON_COMPLIANT (configurable)
//   instance type not allowed      -> NON_COMPLIANT
//   first `env` tag is `prod`      -> COMPLIANT, default owner assigned if missing
//   first `env` tag is anything else -> NON_COMPLIANT, instance stopped
//   no `env` tag                   -> NON_COMPLIANT

use serde::Serialize;

use crate::compliance::policy_config::{MissingTypeConstraint, PolicyConfig};
use crate::compliance::ComplianceVerdict;
use crate::event::{InputError, RuleParameters};
use crate::item::{ConfigurationItem, Tag};
use crate::remediation::RemediationAction;

/// Verdict plus the remediation it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub verdict: ComplianceVerdict,
    pub actions: Vec<RemediationAction>,
}

impl Classification {
    pub fn verdict(verdict: ComplianceVerdict) -> Self {
        Self {
            verdict,
            actions: Vec::new(),
        }
    }

    fn with_action(mut self, action: RemediationAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Classify `item` against `params`.
pub fn classify(
    item: &ConfigurationItem,
    params: &RuleParameters,
    policy: &PolicyConfig,
) -> Result<Classification, InputError> {
    if item.resource_type != policy.monitored_resource_type {
        return Ok(Classification::verdict(ComplianceVerdict::NotApplicable));
    }

    match params.desired_instance_types() {
        Some(desired) => {
            let allowed = item
                .configuration
                .instance_type
                .as_ref()
                .is_some_and(|t| desired.contains(t));
            if !allowed {
                tracing::debug!(
                    resource_id = %item.resource_id,
                    instance_type = ?item.configuration.instance_type,
                    "instance type not in desired set"
                );
                return Ok(Classification::verdict(ComplianceVerdict::NonCompliant));
            }
        }
        None => {
            if policy.missing_type_constraint == MissingTypeConstraint::NonCompliant {
                return Ok(Classification::verdict(ComplianceVerdict::NonCompliant));
            }
        }
    }

    let tags = item
        .configuration
        .tags
        .as_deref()
        .ok_or(InputError::Missing("configuration.tags"))?;
    tracing::debug!(resource_id = %item.resource_id, ?tags, "evaluating instance tags");

    classify_tags(&item.resource_id, tags, policy)
}

/// First `env` tag wins; later ones are never examined.
fn classify_tags(resource_id: &str, tags: &[Tag], policy: &PolicyConfig) -> Result<Classification, InputError> {
    let Some(env) = tags.iter().find(|t| t.key == policy.environment_tag_key) else {
        return Ok(Classification::verdict(ComplianceVerdict::NonCompliant));
    };

    if env.value.is_empty() {
        return Err(InputError::Missing("tag value"));
    }

    if env.value == policy.production_value {
        let mut classification = Classification::verdict(ComplianceVerdict::Compliant);
        if !tags.iter().any(|t| t.key == policy.owner_tag_key) {
            classification = classification.with_action(RemediationAction::AssignTag {
                resource_id: resource_id.to_string(),
                key: policy.owner_tag_key.clone(),
                value: policy.default_owner.clone(),
            });
        }
        return Ok(classification);
    }

    Ok(
        Classification::verdict(ComplianceVerdict::NonCompliant).with_action(RemediationAction::StopInstance {
            resource_id: resource_id.to_string(),
        }),
    )
}
