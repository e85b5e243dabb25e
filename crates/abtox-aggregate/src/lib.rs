//! abtox-aggregate — Per-arm enrichment and aggregate toxicity statistics.
//! Turns extracted adverse-event rows and arm summaries into the
//! intervention-level, class-level and top-category tables.

pub mod aggregate;
pub mod digest;
pub mod resolver;
pub mod stats;
pub mod tables;

use abtox_ingestion::models::{AdverseEventRecord, ArmSummary};

use crate::aggregate::{
    aggregate_by_class, aggregate_by_intervention, top_categories_by_intervention, CategoryCount,
    ClassAggregate, InterventionAggregate,
};
use crate::resolver::{enrich_arms, EnrichedArm};

/// Every output table of one run, computed in full from the extracted rows.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub events: Vec<AdverseEventRecord>,
    pub arms: Vec<ArmSummary>,
    pub enriched: Vec<EnrichedArm>,
    pub by_intervention: Vec<InterventionAggregate>,
    pub by_class: Vec<ClassAggregate>,
    pub top_categories: Vec<CategoryCount>,
}

impl Analysis {
    pub fn build(events: Vec<AdverseEventRecord>, arms: Vec<ArmSummary>, top_n: usize) -> Self {
        let enriched = enrich_arms(&arms);
        let by_intervention = aggregate_by_intervention(&enriched);
        let by_class = aggregate_by_class(&enriched);
        let top_categories = top_categories_by_intervention(&events, &enriched, top_n);
        Self {
            events,
            arms,
            enriched,
            by_intervention,
            by_class,
            top_categories,
        }
    }

    pub fn trial_count(&self) -> usize {
        let mut ids: Vec<&str> = self.arms.iter().map(|a| a.meta.nct_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}
