// Inbound Rule Events
//
// Raw invocation payload delivered by the configuration service and the
// decoded documents embedded in it as JSON strings.

use serde::{Deserialize, Deserializer, Serialize};

use crate::item::ConfigurationItem;

/// Message type of a notification whose configuration item did not fit
/// inline and must be fetched from configuration history.
pub const OVERSIZED_NOTIFICATION: &str = "OversizedConfigurationItemChangeNotification";

/// A required input was missing or could not be decoded.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("{0} is not defined")]
    Missing(&'static str),

    #[error("{field} is malformed: {reason}")]
    Malformed { field: &'static str, reason: String },
}

impl InputError {
    fn malformed(field: &'static str, err: serde_json::Error) -> Self {
        InputError::Malformed {
            field,
            reason: err.to_string(),
        }
    }
}

/// Raw invocation event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvent {
    /// JSON-encoded [`InvokingEvent`].
    #[serde(default)]
    pub invoking_event: Option<String>,

    /// JSON-encoded [`RuleParameters`].
    #[serde(default)]
    pub rule_parameters: Option<String>,

    #[serde(default)]
    pub result_token: Option<String>,

    /// Role to assume in cross-account mode.
    #[serde(default)]
    pub execution_role_arn: Option<String>,

    #[serde(default)]
    pub event_left_scope: Option<bool>,

    #[serde(default)]
    pub config_rule_name: Option<String>,

    #[serde(default)]
    pub account_id: Option<String>,
}

impl RuleEvent {
    /// Decode the embedded invoking event.
    pub fn invoking_event(&self) -> Result<InvokingEvent, InputError> {
        let raw = non_empty(self.invoking_event.as_deref()).ok_or(InputError::Missing("invokingEvent"))?;
        serde_json::from_str(raw).map_err(|e| InputError::malformed("invokingEvent", e))
    }

    /// Decode the embedded rule parameters. Absent parameters decode to
    /// an empty set.
    pub fn rule_parameters(&self) -> Result<RuleParameters, InputError> {
        match non_empty(self.rule_parameters.as_deref()) {
            Some(raw) => serde_json::from_str(raw).map_err(|e| InputError::malformed("ruleParameters", e)),
            None => Ok(RuleParameters::default()),
        }
    }

    pub fn result_token(&self) -> Result<&str, InputError> {
        non_empty(self.result_token.as_deref()).ok_or(InputError::Missing("resultToken"))
    }

    pub fn execution_role_arn(&self) -> Result<&str, InputError> {
        non_empty(self.execution_role_arn.as_deref()).ok_or(InputError::Missing("executionRoleArn"))
    }
}

/// Summary embedded in an oversized notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItemSummary {
    pub resource_type: String,
    pub resource_id: String,

    #[serde(default)]
    pub configuration_item_capture_time: Option<String>,

    #[serde(default)]
    pub configuration_item_status: Option<String>,
}

/// Decoded `invokingEvent` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokingEvent {
    #[serde(default)]
    pub message_type: Option<String>,

    #[serde(default)]
    pub configuration_item: Option<ConfigurationItem>,

    #[serde(default)]
    pub configuration_item_summary: Option<ConfigurationItemSummary>,

    #[serde(default)]
    pub notification_creation_time: Option<String>,

    #[serde(default)]
    pub event_left_scope: Option<bool>,
}

impl InvokingEvent {
    pub fn message_type(&self) -> Result<&str, InputError> {
        non_empty(self.message_type.as_deref()).ok_or(InputError::Missing("messageType"))
    }

    pub fn is_oversized(&self) -> Result<bool, InputError> {
        Ok(self.message_type()? == OVERSIZED_NOTIFICATION)
    }

    /// Resource identity and ordering timestamp of the notification itself,
    /// independent of how the full item is later obtained.
    pub fn subject(&self) -> Result<NotificationSubject, InputError> {
        let (resource_type, resource_id, capture_time) = if self.is_oversized()? {
            let summary = self
                .configuration_item_summary
                .as_ref()
                .ok_or(InputError::Missing("configurationItemSummary"))?;
            (
                &summary.resource_type,
                &summary.resource_id,
                summary.configuration_item_capture_time.as_deref(),
            )
        } else {
            let item = self
                .configuration_item
                .as_ref()
                .ok_or(InputError::Missing("configurationItem"))?;
            (&item.resource_type, &item.resource_id, item.capture_time.as_deref())
        };

        Ok(NotificationSubject {
            resource_type: resource_type.clone(),
            resource_id: resource_id.clone(),
            capture_time: non_empty(capture_time)
                .ok_or(InputError::Missing("configurationItemCaptureTime"))?
                .to_string(),
        })
    }
}

/// Resource and ordering timestamp the evaluation is reported against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationSubject {
    pub resource_type: String,
    pub resource_id: String,
    pub capture_time: String,
}

/// Caller-supplied rule parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleParameters {
    /// Acceptable instance types. Accepts a JSON array or a
    /// comma-separated string.
    #[serde(default, deserialize_with = "instance_type_set")]
    pub desired_instance_type: Option<Vec<String>>,
}

impl RuleParameters {
    pub fn with_desired_instance_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            desired_instance_type: Some(types.into_iter().map(Into::into).collect()),
        }
    }

    /// Configured instance types, or `None` when no constraint is set.
    pub fn desired_instance_types(&self) -> Option<&[String]> {
        self.desired_instance_type.as_deref().filter(|types| !types.is_empty())
    }
}

fn instance_type_set<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Csv(String),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    let values = match raw {
        None => return Ok(None),
        Some(Raw::List(values)) => values,
        Some(Raw::Csv(csv)) => csv.split(',').map(str::to_string).collect(),
    };

    Ok(Some(
        values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect(),
    ))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
