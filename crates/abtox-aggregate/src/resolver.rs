//! Arm-to-intervention inference.
//!
//! Arm labels are free text ("Rituximab 375 mg/m2 IV", "Placebo + SoC").
//! The longest intervention name found inside a label is taken as the arm's
//! primary intervention. No match is a legitimate outcome: such arms land in
//! the "Unmapped" bucket downstream.

use std::sync::Arc;

use abtox_ingestion::classify::classify_intervention;
use abtox_ingestion::models::{ArmSummary, InterventionClass, TrialMeta};

use crate::stats::rate;

/// Longest candidate occurring (case-insensitively) in `arm_label`.
/// Equal-length matches keep the candidate seen first.
pub fn infer_arm_intervention<S: AsRef<str>>(arm_label: &str, candidates: &[S]) -> Option<String> {
    if arm_label.trim().is_empty() || candidates.is_empty() {
        return None;
    }
    let label = arm_label.to_lowercase();

    let mut best: Option<(usize, &str)> = None;
    for cand in candidates {
        let cand = cand.as_ref().trim();
        if cand.is_empty() {
            continue;
        }
        let lc = cand.to_lowercase();
        if !label.contains(&lc) {
            continue;
        }
        let len = lc.chars().count();
        if best.map_or(true, |(best_len, _)| len > best_len) {
            best = Some((len, cand));
        }
    }
    best.map(|(_, name)| name.to_string())
}

/// Per-arm summary with label, inferred intervention, class and rates.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedArm {
    pub meta: Arc<TrialMeta>,
    pub group_id: String,
    pub group_title: Option<String>,
    pub num_at_risk: Option<u64>,
    pub total_serious_ae: u64,
    pub total_other_ae: u64,
    pub arm_label: String,
    pub inferred_intervention: Option<String>,
    pub intervention_class: InterventionClass,
    pub sae_rate: Option<f64>,
    pub other_ae_rate: Option<f64>,
}

impl EnrichedArm {
    pub fn from_summary(arm: &ArmSummary) -> Self {
        let arm_label = arm.group_title.clone().unwrap_or_default();
        let inferred_intervention = infer_arm_intervention(&arm_label, &arm.meta.intervention_names);
        let intervention_class = inferred_intervention
            .as_deref()
            .map(classify_intervention)
            .unwrap_or(InterventionClass::Other);

        Self {
            meta: Arc::clone(&arm.meta),
            group_id: arm.group_id.clone(),
            group_title: arm.group_title.clone(),
            num_at_risk: arm.num_at_risk,
            total_serious_ae: arm.total_serious_ae,
            total_other_ae: arm.total_other_ae,
            sae_rate: rate(arm.total_serious_ae, arm.num_at_risk),
            other_ae_rate: rate(arm.total_other_ae, arm.num_at_risk),
            arm_label,
            inferred_intervention,
            intervention_class,
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (self.meta.nct_id.as_str(), self.group_id.as_str())
    }
}

pub fn enrich_arms(arms: &[ArmSummary]) -> Vec<EnrichedArm> {
    arms.iter().map(EnrichedArm::from_summary).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_length_matches_keep_first_seen() {
        let got = infer_arm_intervention("Rituximab 375 mg/m2 IV", &["Rituximab", "Rituximab Biosimilar"]);
        assert_eq!(got.as_deref(), Some("Rituximab"));
    }

    #[test]
    fn test_longest_match_wins() {
        let got = infer_arm_intervention(
            "Trastuzumab Emtansine 3.6 mg/kg",
            &["Trastuzumab", "Trastuzumab Emtansine"],
        );
        assert_eq!(got.as_deref(), Some("Trastuzumab Emtansine"));
    }

    #[test]
    fn test_no_match_or_empty_inputs() {
        assert_eq!(infer_arm_intervention("Placebo", &["Nivolumab"]), None);
        assert_eq!(infer_arm_intervention("", &["Nivolumab"]), None);
        let none: [&str; 0] = [];
        assert_eq!(infer_arm_intervention("Nivolumab", &none), None);
    }

    #[test]
    fn test_case_insensitive() {
        let got = infer_arm_intervention("NIVOLUMAB 3 mg/kg", &["nivolumab"]);
        assert_eq!(got.as_deref(), Some("nivolumab"));
    }

    #[test]
    fn test_enrich_sets_rates_and_class() {
        let meta = Arc::new(TrialMeta {
            nct_id: "NCT1".into(),
            intervention_names: vec!["Rituximab".into(), "Placebo".into()],
            ..TrialMeta::default()
        });
        let arms = vec![
            ArmSummary {
                meta: Arc::clone(&meta),
                group_id: "EG000".into(),
                group_title: Some("Rituximab 375 mg/m2".into()),
                num_at_risk: Some(40),
                total_serious_ae: 4,
                total_other_ae: 10,
            },
            ArmSummary {
                meta: Arc::clone(&meta),
                group_id: "EG001".into(),
                group_title: None,
                num_at_risk: Some(0),
                total_serious_ae: 1,
                total_other_ae: 0,
            },
        ];
        let enriched = enrich_arms(&arms);
        assert_eq!(enriched[0].inferred_intervention.as_deref(), Some("Rituximab"));
        assert_eq!(enriched[0].intervention_class, InterventionClass::Mab);
        assert_eq!(enriched[0].sae_rate, Some(0.1));
        assert_eq!(enriched[0].other_ae_rate, Some(0.25));
        assert_eq!(enriched[1].arm_label, "");
        assert_eq!(enriched[1].inferred_intervention, None);
        assert_eq!(enriched[1].intervention_class, InterventionClass::Other);
        assert_eq!(enriched[1].sae_rate, None);
    }
}
