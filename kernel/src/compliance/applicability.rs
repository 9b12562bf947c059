// Applicability Filter
//
// Deleted, unrecorded and out-of-scope resources are never evaluated.

use crate::event::RuleEvent;
use crate::item::{ConfigurationItem, ItemStatus};

/// Whether `item` should be evaluated at all.
///
/// Missing inputs fail open: without an item or event to inspect, the
/// item is considered applicable.
pub fn is_applicable(item: Option<&ConfigurationItem>, event: Option<&RuleEvent>) -> bool {
    let (Some(item), Some(event)) = (item, event) else {
        return true;
    };

    if item.status == Some(ItemStatus::ResourceDeleted) {
        tracing::info!(
            resource_id = %item.resource_id,
            "resource deleted, setting compliance status to NOT_APPLICABLE"
        );
    }

    let recorded = matches!(item.status, Some(ItemStatus::Ok | ItemStatus::ResourceDiscovered));
    recorded && !left_scope(event)
}

/// `eventLeftScope` may arrive on the rule event itself or inside the
/// decoded invoking event.
fn left_scope(event: &RuleEvent) -> bool {
    if event.event_left_scope == Some(true) {
        return true;
    }
    event
        .invoking_event()
        .ok()
        .and_then(|invoking| invoking.event_left_scope)
        .unwrap_or(false)
}
