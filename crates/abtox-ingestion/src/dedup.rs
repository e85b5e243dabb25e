//! Deduplication of trials seen across result pages.
//!
//! The registry cursor is not guaranteed to be stable while records are
//! being updated, so the same study can appear on two pages. NCT ids are
//! compared case-insensitively; the first occurrence is kept.

use std::collections::HashSet;

/// Result of a deduplication check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupResult {
    /// Trial is new; keep it.
    New,
    /// Trial was already seen under this (normalised) NCT id.
    DuplicateNctId(String),
}

/// Running set of NCT ids seen during one fetch.
#[derive(Debug, Default)]
pub struct SeenTrials {
    ids: HashSet<String>,
}

impl SeenTrials {
    /// Record `nct_id` and report whether it was seen before.
    pub fn check(&mut self, nct_id: &str) -> DedupResult {
        let key = normalise_nct_id(nct_id);
        if self.ids.insert(key.clone()) {
            DedupResult::New
        } else {
            DedupResult::DuplicateNctId(key)
        }
    }
}

fn normalise_nct_id(nct_id: &str) -> String {
    nct_id.trim().to_ascii_uppercase()
}
