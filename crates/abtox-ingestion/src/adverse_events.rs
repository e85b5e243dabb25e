//! Adverse-event extraction.
//!
//! Walks the serious and other event lists of a trial's adverse-events
//! module, emits one long-form row per (event, group statistic), and folds
//! the rows into per-arm summaries keyed on `(nct_id, group_id)`.
//!
//! Numeric fields are parsed leniently: JSON numbers and numeric strings are
//! accepted, anything else becomes `None`. A `None` count contributes zero
//! to the sums and is skipped by the at-risk maximum.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::groups::{first_str, map_event_groups};
use crate::models::{AdverseEventRecord, AeKind, ArmSummary, TrialMeta, TrialRecord};
use crate::reduce::{first_non_empty, running_max, sum};

pub const UNSPECIFIED_CATEGORY: &str = "Unspecified";

const TERM_KEYS: &[&str] = &["term", "name", "subTitle"];
const STAT_GROUP_KEYS: &[&str] = &["eventGroupId", "groupId"];

/// Rows and arm summaries extracted from one trial.
#[derive(Debug, Clone, Default)]
pub struct TrialEvents {
    pub rows: Vec<AdverseEventRecord>,
    pub arms: Vec<ArmSummary>,
    /// Statistics dropped because they named no group.
    pub skipped_stats: usize,
}

/// Parse a count field: non-negative integer, integral float, or numeric string.
pub fn parse_count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.trunc() as u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.trunc() as u64)
            })
        }
        _ => None,
    }
}

/// Parse a percentage field: number or numeric string.
pub fn parse_percentage(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Extract long-form rows and per-arm summaries for one trial.
///
/// Returns `None` when the trial has no adverse-events module: such a trial
/// is excluded from analysis, which is not the same as reporting zero events.
pub fn extract_adverse_events(trial: &TrialRecord) -> Option<TrialEvents> {
    let module = trial.adverse_events_module()?;
    let groups = map_event_groups(trial.results.as_ref());
    let meta = Arc::new(trial.meta());

    let mut rows = Vec::new();
    let mut skipped_stats = 0;

    for kind in [AeKind::Serious, AeKind::Other] {
        let Some(events) = module.get(kind.module_key()).and_then(Value::as_array) else {
            continue;
        };

        for event in events {
            let event_term = first_str(event, TERM_KEYS).map(String::from);
            let category = first_str(event, &["organSystem"])
                .unwrap_or(UNSPECIFIED_CATEGORY)
                .to_string();

            let Some(stats) = event.get("stats").and_then(Value::as_array) else {
                continue;
            };

            for stat in stats {
                let Some(group_id) = first_str(stat, STAT_GROUP_KEYS) else {
                    skipped_stats += 1;
                    continue;
                };
                rows.push(AdverseEventRecord {
                    meta: Arc::clone(&meta),
                    group_id: group_id.to_string(),
                    group_title: groups.get(group_id).and_then(|g| g.title.clone()),
                    kind,
                    category: category.clone(),
                    event_term: event_term.clone(),
                    num_affected: parse_count(stat.get("numAffected")),
                    num_at_risk: parse_count(stat.get("numAtRisk")),
                    percentage: parse_percentage(stat.get("percentage")),
                });
            }
        }
    }

    if skipped_stats > 0 {
        debug!(nct_id = %trial.nct_id, skipped_stats, "Event statistics without a group id skipped");
    }

    let arms = summarize_arms(&rows);
    Some(TrialEvents { rows, arms, skipped_stats })
}

/// Accumulator for one `(nct_id, group_id)` key.
struct ArmAccumulator {
    meta: Arc<TrialMeta>,
    group_title: Option<String>,
    num_at_risk: Option<u64>,
    total_serious_ae: u64,
    total_other_ae: u64,
}

impl ArmAccumulator {
    fn new(meta: Arc<TrialMeta>) -> Self {
        Self {
            meta,
            group_title: None,
            num_at_risk: None,
            total_serious_ae: 0,
            total_other_ae: 0,
        }
    }

    fn absorb(&mut self, row: &AdverseEventRecord) {
        self.group_title = first_non_empty(self.group_title.take(), row.group_title.as_deref());
        self.num_at_risk = running_max(self.num_at_risk, row.num_at_risk);
        match row.kind {
            AeKind::Serious => self.total_serious_ae = sum(self.total_serious_ae, row.num_affected),
            AeKind::Other => self.total_other_ae = sum(self.total_other_ae, row.num_affected),
        }
    }
}

/// Fold long-form rows into per-arm summaries, ordered by `(nct_id, group_id)`.
pub fn summarize_arms(rows: &[AdverseEventRecord]) -> Vec<ArmSummary> {
    let folded = rows.iter().fold(
        BTreeMap::<(String, String), ArmAccumulator>::new(),
        |mut acc, row| {
            acc.entry((row.meta.nct_id.clone(), row.group_id.clone()))
                .or_insert_with(|| ArmAccumulator::new(Arc::clone(&row.meta)))
                .absorb(row);
            acc
        },
    );

    folded
        .into_iter()
        .map(|((_, group_id), acc)| ArmSummary {
            meta: acc.meta,
            group_id,
            group_title: acc.group_title,
            num_at_risk: acc.num_at_risk,
            total_serious_ae: acc.total_serious_ae,
            total_other_ae: acc.total_other_ae,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trial(results: Option<Value>) -> TrialRecord {
        TrialRecord {
            nct_id: "NCT00000042".into(),
            title: "Rituximab in lymphoma".into(),
            overall_status: Some("COMPLETED".into()),
            study_type: Some("INTERVENTIONAL".into()),
            phases: vec!["PHASE2".into()],
            conditions: vec!["Lymphoma".into()],
            lead_sponsor: Some("Sponsor".into()),
            interventions: vec![],
            has_results: results.is_some(),
            results,
        }
    }

    #[test]
    fn test_parse_count_variants() {
        assert_eq!(parse_count(Some(&json!(12))), Some(12));
        assert_eq!(parse_count(Some(&json!(12.0))), Some(12));
        assert_eq!(parse_count(Some(&json!(" 7 "))), Some(7));
        assert_eq!(parse_count(Some(&json!("n/a"))), None);
        assert_eq!(parse_count(Some(&json!(-3))), None);
        assert_eq!(parse_count(Some(&json!(null))), None);
        assert_eq!(parse_count(None), None);
    }

    #[test]
    fn test_no_adverse_events_module_is_excluded() {
        assert!(extract_adverse_events(&trial(None)).is_none());
        let results = json!({ "baselineCharacteristicsModule": { "groups": [] } });
        assert!(extract_adverse_events(&trial(Some(results))).is_none());
    }

    #[test]
    fn test_rows_and_arm_fold() {
        let results = json!({
            "adverseEventsModule": {
                "eventGroups": [
                    { "id": "EG000", "title": "Rituximab 375 mg/m2 IV" },
                    { "id": "EG001", "title": "Observation" }
                ],
                "seriousEvents": [
                    { "term": "Febrile neutropenia", "organSystem": "Blood and lymphatic system disorders",
                      "stats": [
                        { "groupId": "EG000", "numAffected": 3, "numAtRisk": null },
                        { "groupId": "EG001", "numAffected": 1, "numAtRisk": 48 }
                      ] },
                    { "term": "Pneumonia",
                      "stats": [
                        { "groupId": "EG000", "numAffected": "oops", "numAtRisk": 50 },
                        { "numAffected": 9, "numAtRisk": 9 }
                      ] }
                ],
                "otherEvents": [
                    { "term": "Fatigue", "organSystem": "General disorders",
                      "stats": [
                        { "groupId": "EG000", "numAffected": 10, "numAtRisk": 40, "percentage": "25.0" }
                      ] }
                ]
            }
        });

        let events = extract_adverse_events(&trial(Some(results))).unwrap();
        assert_eq!(events.rows.len(), 4);
        assert_eq!(events.skipped_stats, 1);

        let pneumonia = &events.rows[2];
        assert_eq!(pneumonia.category, UNSPECIFIED_CATEGORY);
        assert_eq!(pneumonia.num_affected, None);
        assert_eq!(pneumonia.group_title.as_deref(), Some("Rituximab 375 mg/m2 IV"));
        assert_eq!(events.rows[3].kind, AeKind::Other);
        assert_eq!(events.rows[3].percentage, Some(25.0));

        assert_eq!(events.arms.len(), 2);
        let arm0 = &events.arms[0];
        assert_eq!(arm0.key(), ("NCT00000042", "EG000"));
        // at-risk observations: null, 50, 40 -> max 50
        assert_eq!(arm0.num_at_risk, Some(50));
        // 3 + unparseable(0)
        assert_eq!(arm0.total_serious_ae, 3);
        assert_eq!(arm0.total_other_ae, 10);
        let arm1 = &events.arms[1];
        assert_eq!(arm1.num_at_risk, Some(48));
        assert_eq!(arm1.total_serious_ae, 1);
        assert_eq!(arm1.group_title.as_deref(), Some("Observation"));
    }

    #[test]
    fn test_all_missing_at_risk_stays_none() {
        let results = json!({
            "adverseEventsModule": {
                "seriousEvents": [
                    { "term": "Sepsis", "stats": [ { "groupId": "EG000", "numAffected": 2 } ] }
                ]
            }
        });
        let events = extract_adverse_events(&trial(Some(results))).unwrap();
        assert_eq!(events.arms[0].num_at_risk, None);
        assert_eq!(events.arms[0].group_title, None);
        assert_eq!(events.arms[0].total_serious_ae, 2);
    }
}
