//! Registry JSON fixtures shared by the abtox test suites.
//!
//! `StudyBuilder` produces study objects shaped like ClinicalTrials.gov v2
//! search results, so tests exercise the same parsing paths as live data.

use serde_json::{json, Value};

/// One adverse event with its per-group statistics.
#[derive(Debug, Clone)]
pub struct EventFixture {
    pub term: String,
    pub organ_system: Option<String>,
    /// (group id, numAffected, numAtRisk)
    pub stats: Vec<(String, Value, Value)>,
}

impl EventFixture {
    pub fn new(term: &str, organ_system: Option<&str>) -> Self {
        Self {
            term: term.to_string(),
            organ_system: organ_system.map(String::from),
            stats: Vec::new(),
        }
    }

    pub fn stat(mut self, group_id: &str, num_affected: u64, num_at_risk: u64) -> Self {
        self.stats.push((group_id.to_string(), json!(num_affected), json!(num_at_risk)));
        self
    }

    /// A statistic with arbitrary (possibly malformed) JSON values.
    pub fn raw_stat(mut self, group_id: &str, num_affected: Value, num_at_risk: Value) -> Self {
        self.stats.push((group_id.to_string(), num_affected, num_at_risk));
        self
    }

    fn to_json(&self) -> Value {
        let mut event = json!({
            "term": self.term,
            "stats": self.stats.iter().map(|(g, a, r)| json!({
                "groupId": g,
                "numAffected": a,
                "numAtRisk": r,
            })).collect::<Vec<_>>(),
        });
        if let Some(ref organ) = self.organ_system {
            event["organSystem"] = json!(organ);
        }
        event
    }
}

/// Builder for a single registry study object.
#[derive(Debug, Clone)]
pub struct StudyBuilder {
    nct_id: String,
    title: String,
    interventions: Vec<(String, String)>,
    groups: Vec<(String, String)>,
    serious: Vec<EventFixture>,
    other: Vec<EventFixture>,
    with_ae_module: bool,
}

impl StudyBuilder {
    pub fn new(nct_id: &str) -> Self {
        Self {
            nct_id: nct_id.to_string(),
            title: format!("Study {nct_id}"),
            interventions: Vec::new(),
            groups: Vec::new(),
            serious: Vec::new(),
            other: Vec::new(),
            with_ae_module: false,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Add an intervention with a registry type label such as "BIOLOGICAL".
    pub fn intervention(mut self, name: &str, kind: &str) -> Self {
        self.interventions.push((name.to_string(), kind.to_string()));
        self
    }

    /// Add an adverse-event group definition.
    pub fn group(mut self, id: &str, title: &str) -> Self {
        self.groups.push((id.to_string(), title.to_string()));
        self.with_ae_module = true;
        self
    }

    pub fn serious(mut self, event: EventFixture) -> Self {
        self.serious.push(event);
        self.with_ae_module = true;
        self
    }

    pub fn other(mut self, event: EventFixture) -> Self {
        self.other.push(event);
        self.with_ae_module = true;
        self
    }

    pub fn build(self) -> Value {
        let interventions: Vec<Value> = self
            .interventions
            .iter()
            .map(|(name, kind)| json!({ "name": name, "type": kind }))
            .collect();

        let mut study = json!({
            "protocolSection": {
                "identificationModule": { "nctId": self.nct_id, "briefTitle": self.title },
                "statusModule": { "overallStatus": "COMPLETED" },
                "designModule": { "studyType": "INTERVENTIONAL", "phases": ["PHASE2"] },
                "conditionsModule": { "conditions": ["Neoplasms"] },
                "sponsorCollaboratorsModule": { "leadSponsor": { "name": "Test Sponsor" } },
                "armsInterventionsModule": { "interventions": interventions }
            },
            "hasResults": self.with_ae_module
        });

        if self.with_ae_module {
            study["resultsSection"] = json!({
                "adverseEventsModule": {
                    "eventGroups": self.groups.iter()
                        .map(|(id, title)| json!({ "id": id, "title": title }))
                        .collect::<Vec<_>>(),
                    "seriousEvents": self.serious.iter().map(EventFixture::to_json).collect::<Vec<_>>(),
                    "otherEvents": self.other.iter().map(EventFixture::to_json).collect::<Vec<_>>(),
                }
            });
        }
        study
    }
}

/// Two-arm rituximab trial with serious and other events.
///
/// EG000 "Rituximab 375 mg/m2": 40 at risk, 4 serious, 12 other.
/// EG001 "Placebo": 38 at risk, 2 serious, 9 other.
pub fn rituximab_trial(nct_id: &str) -> Value {
    StudyBuilder::new(nct_id)
        .title("Rituximab in follicular lymphoma")
        .intervention("Rituximab", "BIOLOGICAL")
        .intervention("Placebo", "DRUG")
        .group("EG000", "Rituximab 375 mg/m2")
        .group("EG001", "Placebo")
        .serious(
            EventFixture::new("Febrile neutropenia", Some("Blood and lymphatic system disorders"))
                .stat("EG000", 3, 40)
                .stat("EG001", 1, 38),
        )
        .serious(
            EventFixture::new("Pneumonia", Some("Infections and infestations"))
                .stat("EG000", 1, 40)
                .stat("EG001", 1, 38),
        )
        .other(
            EventFixture::new("Infusion related reaction", Some("General disorders"))
                .stat("EG000", 12, 40)
                .stat("EG001", 9, 38),
        )
        .build()
}

/// Chemotherapy-only trial that never passes the antibody filter.
pub fn chemo_trial(nct_id: &str) -> Value {
    StudyBuilder::new(nct_id)
        .title("Carboplatin and paclitaxel")
        .intervention("Carboplatin", "DRUG")
        .intervention("Paclitaxel", "DRUG")
        .group("EG000", "Chemotherapy")
        .serious(EventFixture::new("Anaemia", Some("Blood and lymphatic system disorders")).stat("EG000", 5, 60))
        .build()
}

/// Antibody trial without posted results.
pub fn antibody_trial_without_results(nct_id: &str) -> Value {
    StudyBuilder::new(nct_id)
        .title("Pembrolizumab, recruiting")
        .intervention("Pembrolizumab", "BIOLOGICAL")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rituximab_fixture_shape() {
        let study = rituximab_trial("NCT10000001");
        let ae = &study["resultsSection"]["adverseEventsModule"];
        assert_eq!(ae["eventGroups"].as_array().map(Vec::len), Some(2));
        assert_eq!(ae["seriousEvents"][0]["stats"][0]["numAtRisk"], json!(40));
        assert_eq!(study["hasResults"], json!(true));
    }

    #[test]
    fn test_study_without_results_has_no_section() {
        let study = antibody_trial_without_results("NCT10000002");
        assert!(study.get("resultsSection").is_none());
    }
}
