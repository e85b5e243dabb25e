//! Data models for the ingestion pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One registry study, as parsed from a search or detail response.
/// Created by ingestion and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialRecord {
    pub nct_id: String,
    pub title: String,
    pub overall_status: Option<String>,
    pub study_type: Option<String>,
    pub phases: Vec<String>,
    pub conditions: Vec<String>,
    pub lead_sponsor: Option<String>,
    pub interventions: Vec<InterventionDescriptor>,
    pub has_results: bool,
    /// Raw `resultsSection` payload, if the registry returned one.
    pub results: Option<serde_json::Value>,
}

impl TrialRecord {
    /// Non-blank intervention names in registry order, first occurrence kept.
    pub fn intervention_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for iv in &self.interventions {
            let name = iv.name.trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Sorted, de-duplicated intervention names joined with "; ".
    pub fn interventions_text(&self) -> String {
        let mut names = self.intervention_names();
        names.sort();
        names.join("; ")
    }

    /// The `adverseEventsModule`, if results were posted with one.
    pub fn adverse_events_module(&self) -> Option<&serde_json::Value> {
        self.results
            .as_ref()
            .and_then(|r| r.get("adverseEventsModule"))
            .filter(|m| m.is_object())
    }

    /// Flattened metadata carried on every extracted row.
    pub fn meta(&self) -> TrialMeta {
        TrialMeta {
            nct_id: self.nct_id.clone(),
            title: self.title.clone(),
            overall_status: self.overall_status.clone(),
            study_type: self.study_type.clone(),
            phases: self.phases.join(", "),
            conditions: self.conditions.join(", "),
            lead_sponsor: self.lead_sponsor.clone(),
            interventions: self.interventions_text(),
            intervention_names: self.intervention_names(),
        }
    }
}

/// Declared intervention type, as the registry spells it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InterventionType {
    Drug,
    Biological,
    Device,
    Radiation,
    Procedure,
    Behavioral,
    Genetic,
    DietarySupplement,
    CombinationProduct,
    DiagnosticTest,
    Other,
}

impl InterventionType {
    /// Parse a registry type label ("BIOLOGICAL", "Dietary Supplement", …).
    /// Unknown or missing labels map to `Other`.
    pub fn from_registry(raw: &str) -> Self {
        let norm = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match norm.as_str() {
            "drug"                => InterventionType::Drug,
            "biological"          => InterventionType::Biological,
            "device"              => InterventionType::Device,
            "radiation"           => InterventionType::Radiation,
            "procedure"           => InterventionType::Procedure,
            "behavioral"          => InterventionType::Behavioral,
            "genetic"             => InterventionType::Genetic,
            "dietary_supplement"  => InterventionType::DietarySupplement,
            "combination_product" => InterventionType::CombinationProduct,
            "diagnostic_test"     => InterventionType::DiagnosticTest,
            _                     => InterventionType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionType::Drug               => "drug",
            InterventionType::Biological         => "biological",
            InterventionType::Device             => "device",
            InterventionType::Radiation          => "radiation",
            InterventionType::Procedure          => "procedure",
            InterventionType::Behavioral         => "behavioral",
            InterventionType::Genetic            => "genetic",
            InterventionType::DietarySupplement  => "dietary_supplement",
            InterventionType::CombinationProduct => "combination_product",
            InterventionType::DiagnosticTest     => "diagnostic_test",
            InterventionType::Other              => "other",
        }
    }
}

/// Coarse antibody taxonomy derived from a free-text intervention name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum InterventionClass {
    Adc,
    Bispecific,
    Trispecific,
    Mab,
    Antibody,
    Other,
}

impl InterventionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionClass::Adc         => "adc",
            InterventionClass::Bispecific  => "bispecific",
            InterventionClass::Trispecific => "trispecific",
            InterventionClass::Mab         => "mab",
            InterventionClass::Antibody    => "antibody",
            InterventionClass::Other       => "other",
        }
    }
}

impl std::fmt::Display for InterventionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterventionDescriptor {
    pub name: String,
    pub declared_type: InterventionType,
    pub derived_class: InterventionClass,
    pub description: Option<String>,
}

/// Trial-level columns joined onto every long-form and per-arm row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrialMeta {
    pub nct_id: String,
    pub title: String,
    pub overall_status: Option<String>,
    pub study_type: Option<String>,
    pub phases: String,
    pub conditions: String,
    pub lead_sponsor: Option<String>,
    /// Sorted, "; "-joined intervention names.
    pub interventions: String,
    /// Candidate names for arm inference, in registry order.
    pub intervention_names: Vec<String>,
}

/// Canonical arm/group definition within one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct EventGroup {
    pub group_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Registry bucket an adverse event was reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AeKind {
    Serious,
    Other,
}

impl AeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AeKind::Serious => "serious",
            AeKind::Other   => "other",
        }
    }

    /// Key of the event list in the adverse-events module.
    pub fn module_key(&self) -> &'static str {
        match self {
            AeKind::Serious => "seriousEvents",
            AeKind::Other   => "otherEvents",
        }
    }
}

/// One (event, group) statistic in long form.
#[derive(Debug, Clone, PartialEq)]
pub struct AdverseEventRecord {
    pub meta: Arc<TrialMeta>,
    pub group_id: String,
    pub group_title: Option<String>,
    pub kind: AeKind,
    pub category: String,
    pub event_term: Option<String>,
    /// `None` when missing or unparseable.
    pub num_affected: Option<u64>,
    pub num_at_risk: Option<u64>,
    pub percentage: Option<f64>,
}

/// Per-arm fold of the long-form rows for one `(nct_id, group_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmSummary {
    pub meta: Arc<TrialMeta>,
    pub group_id: String,
    pub group_title: Option<String>,
    /// Maximum of all parseable `numAtRisk` values seen for this arm.
    pub num_at_risk: Option<u64>,
    pub total_serious_ae: u64,
    pub total_other_ae: u64,
}

impl ArmSummary {
    pub fn key(&self) -> (&str, &str) {
        (self.meta.nct_id.as_str(), self.group_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> InterventionDescriptor {
        InterventionDescriptor {
            name: name.to_string(),
            declared_type: InterventionType::Drug,
            derived_class: InterventionClass::Other,
            description: None,
        }
    }

    #[test]
    fn test_intervention_type_from_registry() {
        assert_eq!(InterventionType::from_registry("BIOLOGICAL"), InterventionType::Biological);
        assert_eq!(InterventionType::from_registry("Dietary Supplement"), InterventionType::DietarySupplement);
        assert_eq!(InterventionType::from_registry("DIAGNOSTIC_TEST"), InterventionType::DiagnosticTest);
        assert_eq!(InterventionType::from_registry(""), InterventionType::Other);
        assert_eq!(InterventionType::from_registry("Gadget"), InterventionType::Other);
    }

    #[test]
    fn test_intervention_names_keep_first_seen_order() {
        let trial = TrialRecord {
            nct_id: "NCT00000001".into(),
            title: String::new(),
            overall_status: None,
            study_type: None,
            phases: vec![],
            conditions: vec![],
            lead_sponsor: None,
            interventions: vec![
                descriptor("Rituximab"),
                descriptor("  "),
                descriptor("Cyclophosphamide"),
                descriptor("Rituximab"),
            ],
            has_results: false,
            results: None,
        };
        assert_eq!(trial.intervention_names(), vec!["Rituximab", "Cyclophosphamide"]);
        assert_eq!(trial.interventions_text(), "Cyclophosphamide; Rituximab");
    }
}
