//! End-to-end ingestion pipeline.
//!
//! Orchestrates the full flow for a single ingestion job:
//!   1. Page through the registry search for the configured term
//!   2. Deduplicate studies by NCT id
//!   3. Keep antibody trials under the configured filter policy
//!   4. Optionally hydrate kept trials with their full detail records
//!   5. Extract long-form adverse-event rows and per-arm summaries
//!   6. Emit progress events via broadcast channel
//!
//! A transport failure aborts the job. Per-study problems are counted and
//! logged, never fatal.

use std::sync::Arc;
use std::time::Duration;

use abtox_common::{Result, RunConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::adverse_events::{extract_adverse_events, TrialEvents};
use crate::classify::FilterPolicy;
use crate::models::{AdverseEventRecord, ArmSummary, TrialRecord};
use crate::sources::registry::RegistryClient;
use crate::sources::StudySource;

// ── Job config ────────────────────────────────────────────────────────────────

/// Parameters for a single ingestion run.
#[derive(Debug, Clone)]
pub struct IngestionJob {
    pub query_term: String,
    pub page_size: usize,
    pub max_pages: Option<usize>,
    pub page_delay: Duration,
    /// Fetch each trial's full record when the search payload lacks results.
    pub fetch_details: bool,
    pub detail_concurrency: usize,
    pub filter: FilterPolicy,
}

impl Default for IngestionJob {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

impl IngestionJob {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            query_term: cfg.registry.query_term.clone(),
            page_size: cfg.registry.page_size,
            max_pages: cfg.registry.max_pages,
            page_delay: cfg.page_delay(),
            fetch_details: cfg.registry.fetch_details,
            detail_concurrency: cfg.registry.detail_concurrency,
            filter: FilterPolicy::from_config(&cfg.filter),
        }
    }
}

// ── Progress events ───────────────────────────────────────────────────────────

/// Progress event emitted during a pipeline run (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct IngestionProgress {
    pub job_id: Uuid,
    pub stage: String,
    pub message: String,
    pub trials_found: usize,
    pub trials_included: usize,
}

// ── Per-trial outcome ─────────────────────────────────────────────────────────

/// What happened to one trial on its way through the pipeline.
#[derive(Debug, Clone)]
pub enum TrialOutcome {
    /// No intervention passed the antibody filter.
    NotAntibody,
    /// No adverse-events module: excluded, not zero events.
    NoAdverseEvents,
    /// Adverse-events module present but without any group statistic.
    NoEventStatistics,
    Extracted(TrialEvents),
}

pub fn process_trial(trial: &TrialRecord, policy: &FilterPolicy) -> TrialOutcome {
    if !policy.is_antibody_trial(trial) {
        return TrialOutcome::NotAntibody;
    }
    match extract_adverse_events(trial) {
        None => TrialOutcome::NoAdverseEvents,
        Some(events) if events.rows.is_empty() => TrialOutcome::NoEventStatistics,
        Some(events) => TrialOutcome::Extracted(events),
    }
}

/// Rows and counters from running a batch of trials through the filter and
/// the extractor.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionSummary {
    pub antibody_trials: usize,
    pub trials_included: usize,
    pub excluded_no_adverse_events: usize,
    pub excluded_no_statistics: usize,
    pub skipped_stats: usize,
    #[serde(skip)]
    pub events: Vec<AdverseEventRecord>,
    #[serde(skip)]
    pub arms: Vec<ArmSummary>,
}

pub fn extract_trials(trials: &[TrialRecord], policy: &FilterPolicy) -> ExtractionSummary {
    let mut summary = ExtractionSummary::default();
    for trial in trials {
        match process_trial(trial, policy) {
            TrialOutcome::NotAntibody => continue,
            TrialOutcome::NoAdverseEvents => {
                summary.antibody_trials += 1;
                summary.excluded_no_adverse_events += 1;
                debug!(nct_id = %trial.nct_id, "Antibody trial without adverse-events module");
            }
            TrialOutcome::NoEventStatistics => {
                summary.antibody_trials += 1;
                summary.excluded_no_statistics += 1;
                debug!(nct_id = %trial.nct_id, "Adverse-events module without group statistics");
            }
            TrialOutcome::Extracted(events) => {
                summary.antibody_trials += 1;
                summary.trials_included += 1;
                summary.skipped_stats += events.skipped_stats;
                summary.events.extend(events.rows);
                summary.arms.extend(events.arms);
            }
        }
    }
    summary
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct IngestionResult {
    pub job_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub query: String,
    pub pages: usize,
    pub studies_seen: usize,
    pub trials_found: usize,
    pub malformed: usize,
    pub duplicates: usize,
    #[serde(flatten)]
    pub extraction: ExtractionSummary,
    pub duration_ms: u64,
}

impl IngestionResult {
    pub fn events(&self) -> &[AdverseEventRecord] {
        &self.extraction.events
    }

    pub fn arms(&self) -> &[ArmSummary] {
        &self.extraction.arms
    }
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

/// Runs the end-to-end ingestion pipeline for one job.
///
/// Progress events are sent via `progress_tx` if provided.
#[instrument(skip(job, source, progress_tx), fields(query = %job.query_term))]
pub async fn run_ingestion(
    job: &IngestionJob,
    source: Arc<dyn StudySource>,
    progress_tx: Option<broadcast::Sender<IngestionProgress>>,
) -> Result<IngestionResult> {
    let job_id = Uuid::new_v4();
    let started_at = Utc::now();
    let t0 = std::time::Instant::now();
    info!(job_id = %job_id, query = %job.query_term, page_size = job.page_size, "Starting ingestion pipeline");

    let emit = |stage: &str, message: String, trials_found: usize, trials_included: usize| {
        if let Some(ref tx) = progress_tx {
            let _ = tx.send(IngestionProgress {
                job_id,
                stage: stage.to_string(),
                message,
                trials_found,
                trials_included,
            });
        }
    };

    emit("search", format!("Searching registry for '{}'", job.query_term), 0, 0);

    let registry = RegistryClient::new(source).with_page_delay(job.page_delay);
    let report = registry
        .fetch(&job.query_term, job.page_size, job.max_pages)
        .await?;
    let trials_found = report.trials.len();

    // Only kept trials are worth a detail request.
    let trials = if job.fetch_details {
        let kept: Vec<TrialRecord> = report
            .trials
            .into_iter()
            .filter(|t| job.filter.is_antibody_trial(t))
            .collect();
        emit("details", format!("Fetching details for {} antibody trials", kept.len()), trials_found, 0);
        registry.hydrate_details(kept, job.detail_concurrency).await?
    } else {
        report.trials
    };

    emit("extract", format!("{trials_found} trials found, extracting adverse events"), trials_found, 0);
    let extraction = extract_trials(&trials, &job.filter);

    let result = IngestionResult {
        job_id,
        started_at,
        query: job.query_term.clone(),
        pages: report.pages,
        studies_seen: report.studies_seen,
        trials_found,
        malformed: report.malformed,
        duplicates: report.duplicates,
        extraction,
        duration_ms: t0.elapsed().as_millis() as u64,
    };

    info!(
        job_id          = %job_id,
        pages           = result.pages,
        trials_found    = result.trials_found,
        antibody_trials = result.extraction.antibody_trials,
        included        = result.extraction.trials_included,
        no_ae_module    = result.extraction.excluded_no_adverse_events,
        events          = result.events().len(),
        arms            = result.arms().len(),
        malformed       = result.malformed,
        duration_ms     = result.duration_ms,
        "Ingestion pipeline complete"
    );

    emit(
        "complete",
        format!(
            "Done. {} antibody trials with adverse events, {} arms.",
            result.extraction.trials_included,
            result.arms().len()
        ),
        trials_found,
        result.extraction.trials_included,
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InterventionClass, InterventionDescriptor, InterventionType};
    use serde_json::json;

    fn trial(name: &str, kind: InterventionType, results: Option<serde_json::Value>) -> TrialRecord {
        TrialRecord {
            nct_id: "NCT00000077".into(),
            title: "t".into(),
            overall_status: None,
            study_type: None,
            phases: vec![],
            conditions: vec![],
            lead_sponsor: None,
            interventions: vec![InterventionDescriptor {
                name: name.into(),
                declared_type: kind,
                derived_class: InterventionClass::Other,
                description: None,
            }],
            has_results: results.is_some(),
            results,
        }
    }

    #[test]
    fn test_process_trial_outcomes() {
        let policy = FilterPolicy::default();

        let t = trial("Carboplatin", InterventionType::Drug, None);
        assert!(matches!(process_trial(&t, &policy), TrialOutcome::NotAntibody));

        let t = trial("Nivolumab", InterventionType::Biological, None);
        assert!(matches!(process_trial(&t, &policy), TrialOutcome::NoAdverseEvents));

        let t = trial(
            "Nivolumab",
            InterventionType::Biological,
            Some(json!({ "adverseEventsModule": { "seriousEvents": [] } })),
        );
        assert!(matches!(process_trial(&t, &policy), TrialOutcome::NoEventStatistics));

        let t = trial(
            "Nivolumab",
            InterventionType::Biological,
            Some(json!({ "adverseEventsModule": { "seriousEvents": [
                { "term": "Colitis", "stats": [ { "groupId": "EG000", "numAffected": 2, "numAtRisk": 20 } ] }
            ] } })),
        );
        match process_trial(&t, &policy) {
            TrialOutcome::Extracted(events) => assert_eq!(events.arms.len(), 1),
            other => panic!("expected Extracted, got {other:?}"),
        }
    }

    #[test]
    fn test_job_from_default_config() {
        let job = IngestionJob::default();
        assert_eq!(job.query_term, "antibody");
        assert_eq!(job.page_size, 100);
        assert_eq!(job.page_delay, Duration::from_millis(250));
        assert!(!job.fetch_details);
    }
}
