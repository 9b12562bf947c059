// Classifier Policy Configuration
//
// Names the tags and values the classifier looks for and how it treats
// a rule that sets no instance-type constraint.

use serde::{Deserialize, Serialize};

/// What to do when the rule parameters carry no `desiredInstanceType`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTypeConstraint {
    /// Report the instance as non-compliant without looking at its tags.
    #[default]
    NonCompliant,

    /// Treat the constraint as satisfied and continue with the tag check.
    SkipTypeCheck,
}

/// Policy loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub monitored_resource_type: String,
    pub environment_tag_key: String,
    pub production_value: String,
    pub owner_tag_key: String,
    pub default_owner: String,
    pub missing_type_constraint: MissingTypeConstraint,
}

impl PolicyConfig {
    /// Default built-in policy (used if no config is provided).
    pub fn default_policy() -> Self {
        Self {
            monitored_resource_type: "AWS::EC2::Instance".into(),
            environment_tag_key: "env".into(),
            production_value: "prod".into(),
            owner_tag_key: "owner".into(),
            default_owner: "unassigned@example.com".into(),
            missing_type_constraint: MissingTypeConstraint::NonCompliant,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::default_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_policy_fills_defaults() {
        let policy: PolicyConfig = serde_json::from_str(
            r#"{ "default_owner": "ops@example.com", "missing_type_constraint": "skip_type_check" }"#,
        )
        .unwrap();

        assert_eq!(policy.default_owner, "ops@example.com");
        assert_eq!(policy.missing_type_constraint, MissingTypeConstraint::SkipTypeCheck);
        assert_eq!(policy.environment_tag_key, "env");
        assert_eq!(policy.monitored_resource_type, "AWS::EC2::Instance");
    }
}
