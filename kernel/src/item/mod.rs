// Configuration Item Model
//
// Canonical, strongly typed snapshot of a tracked resource as delivered
// inline by a change notification. Oversized notifications are mapped
// into this same shape by the normalizer.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status recorded for a configuration item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    #[serde(rename = "OK")]
    Ok,
    ResourceDiscovered,
    ResourceNotRecorded,
    ResourceDeleted,
    ResourceDeletedNotRecorded,

    /// Any status this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// A single `{key, value}` tag attached to a resource configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Resource-specific configuration.
///
/// Only the fields the classifier reads are typed. Everything else is
/// kept verbatim so the item round-trips without loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,

    /// Ordered tag list. `None` means the field was absent, which is
    /// distinct from an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Relationship between the item and another resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Evaluated resource snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItem {
    pub resource_type: String,
    pub resource_id: String,

    #[serde(
        rename = "configurationItemStatus",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<ItemStatus>,

    #[serde(
        rename = "configurationItemCaptureTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub capture_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_account_id: Option<String>,

    #[serde(rename = "ARN", default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_state_md5_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_item_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_creation_time: Option<String>,

    /// Resource-level tags as recorded by the configuration service.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub related_events: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships: Vec<Relationship>,

    /// Deleted resources carry a null configuration; it decodes as empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub configuration: Configuration,

    #[serde(default, deserialize_with = "null_as_default")]
    pub supplementary_configuration: Map<String, Value>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ConfigurationItem {
    /// Minimal item for the given resource, with an empty configuration.
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            status: None,
            capture_time: None,
            aws_account_id: None,
            arn: None,
            configuration_state_md5_hash: None,
            configuration_item_version: None,
            resource_name: None,
            aws_region: None,
            availability_zone: None,
            resource_creation_time: None,
            tags: BTreeMap::new(),
            related_events: Vec::new(),
            relationships: Vec::new(),
            configuration: Configuration::default(),
            supplementary_configuration: Map::new(),
            other: Map::new(),
        }
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.configuration.instance_type = Some(instance_type.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.configuration.tags = Some(tags);
        self
    }
}

/// Explicit `null` decodes the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
