// Evaluator Settings
//
// Deployment-level configuration loaded from JSON. Every field has a
// default so an empty document is valid.

use serde::{Deserialize, Serialize};

use crate::compliance::policy_config::PolicyConfig;
use crate::credentials::DEFAULT_SESSION_NAME;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Assume the event's execution role before calling any service
    /// (cross-account mode).
    pub assume_role: bool,

    pub role_session_name: String,

    /// Region override; the environment's default region otherwise.
    pub region: Option<String>,

    pub policy: PolicyConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            assume_role: false,
            role_session_name: DEFAULT_SESSION_NAME.into(),
            region: None,
            policy: PolicyConfig::default_policy(),
        }
    }
}
