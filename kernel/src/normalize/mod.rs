// Configuration Normalizer
//
// Produces the canonical configuration item for a notification, whether
// it was delivered inline or has to be fetched from configuration
// history because it was too large.

use crate::event::{InputError, InvokingEvent};
use crate::item::ConfigurationItem;
use crate::services::{ConfigService, HistoryQuery, ServiceError};

/// Errors that can occur while obtaining the configuration item.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("history lookup failed: {0}")]
    History(#[from] ServiceError),

    #[error("no configuration history for {resource_type} {resource_id}")]
    EmptyHistory { resource_type: String, resource_id: String },

    #[error("configuration text is malformed: {0}")]
    Configuration(#[from] serde_json::Error),
}

/// Return the canonical configuration item for `invoking`.
///
/// Oversized notifications cost exactly one history lookup.
pub fn configuration_item(
    invoking: &InvokingEvent,
    history: &dyn ConfigService,
) -> Result<ConfigurationItem, NormalizeError> {
    let item = if invoking.is_oversized()? {
        let summary = invoking
            .configuration_item_summary
            .as_ref()
            .ok_or(InputError::Missing("configurationItemSummary"))?;
        let capture_time = summary
            .configuration_item_capture_time
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(InputError::Missing("configurationItemCaptureTime"))?;

        let query = HistoryQuery::latest(&summary.resource_type, &summary.resource_id, capture_time);
        tracing::debug!(?query, "fetching oversized configuration item");

        let record = history
            .get_resource_config_history(&query)?
            .into_iter()
            .next()
            .ok_or_else(|| NormalizeError::EmptyHistory {
                resource_type: summary.resource_type.clone(),
                resource_id: summary.resource_id.clone(),
            })?;
        record.into_configuration_item()?
    } else {
        invoking
            .configuration_item
            .clone()
            .ok_or(InputError::Missing("configurationItem"))?
    };

    validate_tags(&item)?;
    Ok(item)
}

fn validate_tags(item: &ConfigurationItem) -> Result<(), InputError> {
    let blank_key = item
        .configuration
        .tags
        .iter()
        .flatten()
        .any(|tag| tag.key.is_empty());
    if blank_key {
        return Err(InputError::Missing("tag key"));
    }
    Ok(())
}
