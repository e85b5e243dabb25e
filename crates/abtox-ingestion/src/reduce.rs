//! Named reducers for the keyed folds in group mapping and arm summarisation.

use std::collections::BTreeMap;

/// Keep the first value stored under `key`; later values are ignored.
/// Returns true if `value` was stored.
pub fn first_wins<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, value: V) -> bool {
    use std::collections::btree_map::Entry;
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(value);
            true
        }
        Entry::Occupied(_) => false,
    }
}

/// Running maximum that ignores missing observations.
pub fn running_max(current: Option<u64>, observed: Option<u64>) -> Option<u64> {
    match (current, observed) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Sum where a missing observation contributes zero.
pub fn sum(total: u64, observed: Option<u64>) -> u64 {
    total.saturating_add(observed.unwrap_or(0))
}

/// First non-empty text wins.
pub fn first_non_empty(current: Option<String>, observed: Option<&str>) -> Option<String> {
    match current {
        Some(c) if !c.is_empty() => Some(c),
        _ => observed.filter(|s| !s.is_empty()).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_max_skips_missing() {
        let observed = [None, Some(50), Some(40)];
        let max = observed.iter().fold(None, |acc, v| running_max(acc, *v));
        assert_eq!(max, Some(50));
        assert_eq!([None, None].iter().fold(None, |acc, v| running_max(acc, *v)), None);
    }

    #[test]
    fn test_sum_treats_missing_as_zero() {
        let observed = [Some(3), None, Some(4)];
        assert_eq!(observed.iter().fold(0, |acc, v| sum(acc, *v)), 7);
    }

    #[test]
    fn test_first_wins_ignores_later_values() {
        let mut map = BTreeMap::new();
        assert!(first_wins(&mut map, "EG000", "Arm A"));
        assert!(!first_wins(&mut map, "EG000", "Arm B"));
        assert_eq!(map["EG000"], "Arm A");
    }

    #[test]
    fn test_first_non_empty() {
        assert_eq!(first_non_empty(None, Some("")), None);
        assert_eq!(first_non_empty(Some(String::new()), Some("B")), Some("B".to_string()));
        assert_eq!(first_non_empty(Some("A".into()), Some("B")), Some("A".to_string()));
    }
}
