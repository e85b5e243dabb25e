//! Cursor-paginated trial retrieval over any `StudySource`.
//!
//! The first request carries the search term; every later request carries
//! only the cursor returned by the previous page. Retrieval stops when a
//! page comes back empty, when no cursor is returned, or when the page
//! limit is reached. A transport failure aborts the whole fetch; a study
//! that cannot be mapped is skipped and counted.

use std::sync::Arc;
use std::time::Duration;

use abtox_common::{AbtoxError, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use crate::dedup::{DedupResult, SeenTrials};
use crate::models::TrialRecord;
use super::clinicaltrials::parse_study;
use super::{PageRequest, StudySource};

pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(250);

/// Outcome of one paginated fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Unique trials in first-seen order.
    pub trials: Vec<TrialRecord>,
    pub pages: usize,
    pub studies_seen: usize,
    pub malformed: usize,
    pub duplicates: usize,
}

pub struct RegistryClient {
    source: Arc<dyn StudySource>,
    page_delay: Duration,
}

impl RegistryClient {
    pub fn new(source: Arc<dyn StudySource>) -> Self {
        Self {
            source,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    /// Pause between consecutive page requests.
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Retrieve every study matching `query_term`, page by page.
    #[instrument(skip(self))]
    pub async fn fetch(
        &self,
        query_term: &str,
        page_size: usize,
        max_pages: Option<usize>,
    ) -> Result<FetchReport> {
        if page_size == 0 {
            return Err(AbtoxError::Config("page size must be at least 1".into()));
        }

        let mut report = FetchReport::default();
        let mut seen = SeenTrials::default();
        let mut request = PageRequest::first(query_term, page_size);

        loop {
            if report.pages > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let page = self.source.fetch_page(&request).await?;
            report.pages += 1;

            if page.studies.is_empty() {
                debug!(page = report.pages, "Empty page, stopping");
                break;
            }

            for study in &page.studies {
                report.studies_seen += 1;
                let trial = match parse_study(study) {
                    Ok(t) => t,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(page = report.pages, error = %e, "Skipping malformed study");
                        report.malformed += 1;
                        continue;
                    }
                };
                match seen.check(&trial.nct_id) {
                    DedupResult::New => report.trials.push(trial),
                    DedupResult::DuplicateNctId(id) => {
                        debug!(nct_id = %id, "Duplicate study across pages");
                        report.duplicates += 1;
                    }
                }
            }

            if max_pages.is_some_and(|max| report.pages >= max) {
                debug!(pages = report.pages, "Page limit reached");
                break;
            }

            match page.cursor() {
                Some(token) => request = request.continuation(token.to_string()),
                None => break,
            }
        }

        info!(
            pages = report.pages,
            studies = report.studies_seen,
            trials = report.trials.len(),
            malformed = report.malformed,
            duplicates = report.duplicates,
            "Registry fetch complete"
        );
        Ok(report)
    }

    /// Replace each trial with its full record where the registry reports
    /// results but the search payload lacked them. Up to `concurrency` detail
    /// requests run at once; output order matches input order.
    #[instrument(skip(self, trials), fields(n = trials.len()))]
    pub async fn hydrate_details(
        &self,
        trials: Vec<TrialRecord>,
        concurrency: usize,
    ) -> Result<Vec<TrialRecord>> {
        stream::iter(trials)
            .map(|trial| hydrate_one(Arc::clone(&self.source), trial))
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }
}

/// Swap in the full record for a trial that reports results its search
/// payload did not carry.
async fn hydrate_one(source: Arc<dyn StudySource>, trial: TrialRecord) -> Result<TrialRecord> {
    if !trial.has_results || trial.results.is_some() {
        return Ok(trial);
    }
    let Some(full) = source.fetch_study(&trial.nct_id).await? else {
        return Ok(trial);
    };
    match parse_study(&full) {
        Ok(detailed) => Ok(detailed),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(nct_id = %trial.nct_id, error = %e, "Detail record unusable, keeping search record");
            Ok(trial)
        }
    }
}
