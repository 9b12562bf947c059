// Configuration History Adapter
//
// Models a record returned by the configuration-history API and maps it
// into the canonical configuration item delivered by inline
// notifications.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::item::{Configuration, ConfigurationItem, ItemStatus, Relationship};

/// Relationship entry as returned by the history API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRelationship {
    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub resource_id: Option<String>,

    #[serde(default)]
    pub resource_name: Option<String>,

    #[serde(default)]
    pub relationship_name: Option<String>,
}

/// Configuration item in the history API model.
///
/// Differs from the notification model in field names, in carrying real
/// timestamps, and in holding `configuration` as serialized JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub configuration_item_capture_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub configuration_item_status: Option<ItemStatus>,

    #[serde(default)]
    pub configuration_state_id: Option<String>,

    #[serde(rename = "configurationItemMD5Hash", default)]
    pub configuration_item_md5_hash: Option<String>,

    #[serde(default)]
    pub arn: Option<String>,

    pub resource_type: String,
    pub resource_id: String,

    #[serde(default)]
    pub resource_name: Option<String>,

    #[serde(default)]
    pub aws_region: Option<String>,

    #[serde(default)]
    pub availability_zone: Option<String>,

    #[serde(default)]
    pub resource_creation_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub related_events: Vec<String>,

    #[serde(default)]
    pub relationships: Vec<HistoryRelationship>,

    /// Serialized JSON document.
    #[serde(default)]
    pub configuration: Option<String>,

    /// Values are serialized JSON documents.
    #[serde(default)]
    pub supplementary_configuration: BTreeMap<String, String>,
}

impl HistoryRecord {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            version: None,
            account_id: None,
            configuration_item_capture_time: None,
            configuration_item_status: None,
            configuration_state_id: None,
            configuration_item_md5_hash: None,
            arn: None,
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            resource_name: None,
            aws_region: None,
            availability_zone: None,
            resource_creation_time: None,
            tags: BTreeMap::new(),
            related_events: Vec::new(),
            relationships: Vec::new(),
            configuration: None,
            supplementary_configuration: BTreeMap::new(),
        }
    }

    /// Convert into the notification model.
    ///
    /// Fails only if `configuration` is not valid JSON for a resource
    /// configuration.
    pub fn into_configuration_item(self) -> Result<ConfigurationItem, serde_json::Error> {
        let configuration = match self.configuration.as_deref() {
            Some(text) => match serde_json::from_str::<Value>(text)? {
                Value::Null => Configuration::default(),
                value => serde_json::from_value(value)?,
            },
            None => Configuration::default(),
        };

        let supplementary_configuration: Map<String, Value> = self
            .supplementary_configuration
            .into_iter()
            .map(|(key, text)| {
                let value = match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(e) => {
                        debug!(key = %key, error = %e, "supplementary configuration is not JSON, keeping text");
                        Value::String(text)
                    }
                };
                (key, value)
            })
            .collect();

        let mut other = Map::new();
        if let Some(state_id) = self.configuration_state_id {
            other.insert("configurationStateId".into(), state_id_value(state_id));
        }

        Ok(ConfigurationItem {
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            status: self.configuration_item_status,
            capture_time: self.configuration_item_capture_time.map(render_timestamp),
            aws_account_id: self.account_id,
            arn: self.arn,
            configuration_state_md5_hash: self.configuration_item_md5_hash,
            configuration_item_version: self.version,
            resource_name: self.resource_name,
            aws_region: self.aws_region,
            availability_zone: self.availability_zone,
            resource_creation_time: self.resource_creation_time.map(render_timestamp),
            tags: self.tags,
            related_events: self.related_events,
            relationships: self
                .relationships
                .into_iter()
                .map(|r| Relationship {
                    resource_type: r.resource_type,
                    resource_id: r.resource_id,
                    resource_name: r.resource_name,
                    name: r.relationship_name,
                })
                .collect(),
            configuration,
            supplementary_configuration,
            other,
        })
    }
}

/// Notifications carry the state id as a number, the history API as text.
fn state_id_value(state_id: String) -> Value {
    match state_id.parse::<u64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(state_id),
    }
}

/// Canonical text form for timestamps: RFC 3339, UTC, millisecond precision.
pub fn render_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
