// Compliance Evaluation
//
// Decides whether a configuration item is in scope and, if so, which
// verdict it earns and which remediation it needs. This module is pure:
// it plans actions but never performs them.

use serde::{Deserialize, Serialize};

pub mod applicability;
pub mod classifier;
pub mod policy_config;

/// Tri-state compliance verdict. Exactly one is produced per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceVerdict {
    Compliant,
    NonCompliant,
    NotApplicable,
}

impl ComplianceVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceVerdict::Compliant => "COMPLIANT",
            ComplianceVerdict::NonCompliant => "NON_COMPLIANT",
            ComplianceVerdict::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

impl std::fmt::Display for ComplianceVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_wire_names() {
        assert_eq!(serde_json::to_value(ComplianceVerdict::NonCompliant).unwrap(), "NON_COMPLIANT");
        assert_eq!(ComplianceVerdict::NotApplicable.to_string(), "NOT_APPLICABLE");
    }
}
