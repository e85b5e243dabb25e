//! Canonical arm/group table for one trial.
//!
//! Group definitions appear redundantly across result sections, with ids
//! under different keys. They are merged first-wins per group id, walking
//! the sections in a fixed precedence order.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::models::EventGroup;
use crate::reduce::first_wins;

/// (module, list key) pairs in merge precedence order.
pub const GROUP_SECTIONS: &[(&str, &str)] = &[
    ("baselineCharacteristicsModule", "groups"),
    ("adverseEventsModule", "eventGroups"),
    ("participantFlowModule", "groups"),
];

const ID_KEYS: &[&str] = &["id", "eventGroupId", "groupId"];
const TITLE_KEYS: &[&str] = &["title", "label", "description"];

/// First non-blank string under any of `keys`, trimmed.
pub(crate) fn first_str<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Parse one group definition. `None` when it has no resolvable id or
/// carries neither a title nor a description.
pub fn parse_group(raw: &Value) -> Option<EventGroup> {
    let group_id = first_str(raw, ID_KEYS)?;
    let title = first_str(raw, TITLE_KEYS).map(String::from);
    let description = first_str(raw, &["description"]).map(String::from);
    if title.is_none() && description.is_none() {
        return None;
    }
    Some(EventGroup {
        group_id: group_id.to_string(),
        title,
        description,
    })
}

/// Build the `group_id → EventGroup` map for a trial's `resultsSection`.
pub fn map_event_groups(results: Option<&Value>) -> BTreeMap<String, EventGroup> {
    let mut groups = BTreeMap::new();
    let Some(results) = results else {
        return groups;
    };

    for (module, key) in GROUP_SECTIONS {
        let Some(list) = results
            .get(*module)
            .and_then(|m| m.get(*key))
            .and_then(Value::as_array)
        else {
            continue;
        };

        for raw in list {
            match parse_group(raw) {
                Some(group) => {
                    first_wins(&mut groups, group.group_id.clone(), group);
                }
                None => debug!(module = *module, "Dropping group definition without id or text"),
            }
        }
    }

    groups
}
