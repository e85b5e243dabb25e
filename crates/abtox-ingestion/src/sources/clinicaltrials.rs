//! ClinicalTrials.gov v2 API client.
//!
//! API docs: https://clinicaltrials.gov/data-api/api
//! Endpoint: https://clinicaltrials.gov/api/v2/studies
//!
//! Studies are mapped to `TrialRecord` with:
//!   - nct_id        = identificationModule.nctId (upper-cased)
//!   - title         = identificationModule.briefTitle
//!   - interventions = armsInterventionsModule.interventions (name, type, description)
//!   - results       = resultsSection, kept raw for group mapping and AE extraction

use async_trait::async_trait;
use abtox_common::sandbox::SandboxClient as Client;
use abtox_common::{AbtoxError, RegistryConfig, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::classify::classify_intervention;
use crate::models::{InterventionDescriptor, InterventionType, TrialRecord};
use super::{PageRequest, StudiesPage, StudySource};

pub const CT_API_URL: &str = "https://clinicaltrials.gov/api/v2/studies";

pub struct ClinicalTrialsClient {
    client: Client,
    base_url: String,
}

impl ClinicalTrialsClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Client::new()?,
            base_url: CT_API_URL.to_string(),
        })
    }

    /// Build a client for the configured endpoint, timeout and User-Agent.
    /// A non-default endpoint host is added to the sandbox allowlist.
    pub fn from_config(cfg: &RegistryConfig) -> Result<Self> {
        let mut client = Client::with_settings(cfg.timeout(), &cfg.user_agent)?;
        let parsed = url::Url::parse(&cfg.base_url)
            .map_err(|e| AbtoxError::Config(format!("registry.base_url {}: {e}", cfg.base_url)))?;
        if let Some(host) = parsed.host_str() {
            client.allow_domain(host);
        }
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl StudySource for ClinicalTrialsClient {
    #[instrument(skip(self))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<StudiesPage> {
        let resp = self.client
            .get(&self.base_url)?
            .query(&request.query_pairs())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AbtoxError::Transport(format!(
                "studies search returned HTTP {} ({})",
                status, self.base_url
            )));
        }

        // Decoded in full before returning, so a dropped or failed read never
        // yields a truncated page.
        let page = resp.json::<StudiesPage>().await?;
        debug!(n = page.studies.len(), has_cursor = page.cursor().is_some(), "ClinicalTrials.gov page retrieved");
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn fetch_study(&self, nct_id: &str) -> Result<Option<Value>> {
        let url = format!("{}/{}", self.base_url, nct_id);
        let resp = self.client
            .get(&url)?
            .query(&[("format", "json")])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(AbtoxError::Transport(format!(
                "study detail {} returned HTTP {}",
                nct_id,
                resp.status()
            )));
        }
        Ok(Some(resp.json::<Value>().await?))
    }
}

// ── Record mapping ────────────────────────────────────────────────────────────

fn opt_string(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn string_list(v: &Value) -> Vec<String> {
    v.as_array()
        .map(|items| items.iter().filter_map(opt_string).collect())
        .unwrap_or_default()
}

/// Map one registry study onto a `TrialRecord`.
///
/// A study without a resolvable NCT id is a `MalformedRecord`; the caller
/// skips it and keeps going.
pub fn parse_study(study: &Value) -> Result<TrialRecord> {
    let proto = &study["protocolSection"];
    let id_mod = &proto["identificationModule"];
    let status_mod = &proto["statusModule"];
    let design_mod = &proto["designModule"];
    let cond_mod = &proto["conditionsModule"];
    let interv_mod = &proto["armsInterventionsModule"];
    let sponsor_mod = &proto["sponsorCollaboratorsModule"];

    let nct_id = opt_string(&id_mod["nctId"])
        .or_else(|| opt_string(&study["nctId"]))
        .or_else(|| opt_string(&study["NCTId"]))
        .map(|id| id.to_ascii_uppercase())
        .ok_or_else(|| {
            AbtoxError::MalformedRecord(format!(
                "study without nctId (briefTitle: {})",
                id_mod["briefTitle"].as_str().unwrap_or("<none>")
            ))
        })?;

    let title = opt_string(&id_mod["briefTitle"])
        .or_else(|| opt_string(&study["briefTitle"]))
        .unwrap_or_default();

    // v2 uses `phases`; older payloads nest them under phaseList.phase
    let mut phases = string_list(&design_mod["phases"]);
    if phases.is_empty() {
        phases = string_list(&design_mod["phaseList"]["phase"]);
    }

    let interventions = interv_mod["interventions"]
        .as_array()
        .map(|ivs| {
            ivs.iter()
                .filter_map(|iv| {
                    let name = opt_string(&iv["name"])?;
                    Some(InterventionDescriptor {
                        declared_type: InterventionType::from_registry(iv["type"].as_str().unwrap_or("")),
                        derived_class: classify_intervention(&name),
                        description: opt_string(&iv["description"]),
                        name,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let results = study
        .get("resultsSection")
        .filter(|r| r.is_object())
        .cloned();

    Ok(TrialRecord {
        nct_id,
        title,
        overall_status: opt_string(&status_mod["overallStatus"]),
        study_type: opt_string(&design_mod["studyType"]),
        phases,
        conditions: string_list(&cond_mod["conditions"]),
        lead_sponsor: opt_string(&sponsor_mod["leadSponsor"]["name"]),
        interventions,
        has_results: study["hasResults"].as_bool().unwrap_or(false) || results.is_some(),
        results,
    })
}
