//! Intervention-level and class-level aggregation of enriched arms.
//!
//! Every aggregate is recomputed from scratch from the arm set. Buckets are
//! collected in `BTreeMap`s and rates are sorted before any statistic is
//! taken, so output never depends on arrival order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use abtox_ingestion::adverse_events::UNSPECIFIED_CATEGORY;
use abtox_ingestion::classify::classify_intervention;
use abtox_ingestion::models::{AdverseEventRecord, InterventionClass};
use serde::Serialize;

use crate::resolver::EnrichedArm;
use crate::stats::RateSummary;

pub const UNMAPPED_BUCKET: &str = "Unmapped";

/// Totals and rate statistics shared by both aggregate levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketTotals {
    pub arms: usize,
    pub total_num_at_risk: u64,
    pub total_serious_ae: u64,
    pub total_other_ae: u64,
    pub sae_rate: RateSummary,
    pub other_rate: RateSummary,
}

impl BucketTotals {
    fn from_arms(arms: &[&EnrichedArm]) -> Self {
        Self {
            arms: arms.len(),
            total_num_at_risk: arms.iter().map(|a| a.num_at_risk.unwrap_or(0)).sum(),
            total_serious_ae: arms.iter().map(|a| a.total_serious_ae).sum(),
            total_other_ae: arms.iter().map(|a| a.total_other_ae).sum(),
            sae_rate: RateSummary::from_rates(arms.iter().map(|a| a.sae_rate)),
            other_rate: RateSummary::from_rates(arms.iter().map(|a| a.other_ae_rate)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterventionAggregate {
    pub intervention: String,
    pub class: InterventionClass,
    #[serde(flatten)]
    pub totals: BucketTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAggregate {
    pub class: InterventionClass,
    #[serde(flatten)]
    pub totals: BucketTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub intervention: String,
    pub category: String,
    pub affected: u64,
}

pub fn intervention_bucket(arm: &EnrichedArm) -> &str {
    arm.inferred_intervention.as_deref().unwrap_or(UNMAPPED_BUCKET)
}

/// Descending median, undefined last.
fn cmp_median_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Group arms by inferred intervention ("Unmapped" when none).
///
/// Sorted by descending median SAE rate (undefined last), then descending
/// total serious AEs, then bucket name.
pub fn aggregate_by_intervention(arms: &[EnrichedArm]) -> Vec<InterventionAggregate> {
    let mut buckets: BTreeMap<&str, Vec<&EnrichedArm>> = BTreeMap::new();
    for arm in arms {
        buckets.entry(intervention_bucket(arm)).or_default().push(arm);
    }

    let mut rows: Vec<InterventionAggregate> = buckets
        .into_iter()
        .map(|(name, items)| InterventionAggregate {
            intervention: name.to_string(),
            class: if name == UNMAPPED_BUCKET {
                InterventionClass::Other
            } else {
                classify_intervention(name)
            },
            totals: BucketTotals::from_arms(&items),
        })
        .collect();

    rows.sort_by(|a, b| {
        cmp_median_desc(a.totals.sae_rate.median, b.totals.sae_rate.median)
            .then_with(|| b.totals.total_serious_ae.cmp(&a.totals.total_serious_ae))
            .then_with(|| a.intervention.cmp(&b.intervention))
    });
    rows
}

/// Group arms by intervention class, sorted alphabetically by class name.
pub fn aggregate_by_class(arms: &[EnrichedArm]) -> Vec<ClassAggregate> {
    let mut buckets: BTreeMap<&'static str, (InterventionClass, Vec<&EnrichedArm>)> = BTreeMap::new();
    for arm in arms {
        buckets
            .entry(arm.intervention_class.as_str())
            .or_insert_with(|| (arm.intervention_class, Vec::new()))
            .1
            .push(arm);
    }

    buckets
        .into_values()
        .map(|(class, items)| ClassAggregate {
            class,
            totals: BucketTotals::from_arms(&items),
        })
        .collect()
}

/// Top-`top_n` adverse-event categories per intervention bucket by summed
/// affected count. Rows join to arms on `(nct_id, group_id)`; a row whose
/// arm is unknown or unmapped counts toward "Unmapped".
pub fn top_categories_by_intervention(
    rows: &[AdverseEventRecord],
    arms: &[EnrichedArm],
    top_n: usize,
) -> Vec<CategoryCount> {
    let bucket_of: HashMap<(&str, &str), &str> = arms
        .iter()
        .map(|arm| (arm.key(), intervention_bucket(arm)))
        .collect();

    let mut counts: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();
    for row in rows {
        let bucket = bucket_of
            .get(&(row.meta.nct_id.as_str(), row.group_id.as_str()))
            .copied()
            .unwrap_or(UNMAPPED_BUCKET);
        let category = if row.category.is_empty() { UNSPECIFIED_CATEGORY } else { row.category.as_str() };
        *counts.entry(bucket).or_default().entry(category).or_insert(0) += row.num_affected.unwrap_or(0);
    }

    let mut out = Vec::new();
    for (bucket, cats) in counts {
        let mut ranked: Vec<(&str, u64)> = cats.into_iter().collect();
        // stable sort keeps the alphabetical order among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        out.extend(ranked.into_iter().take(top_n).map(|(category, affected)| CategoryCount {
            intervention: bucket.to_string(),
            category: category.to_string(),
            affected,
        }));
    }
    out
}

/// Category totals for one AE kind across all rows, highest first, ties by name.
pub fn category_totals<'a, I>(rows: I) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = &'a AdverseEventRecord>,
{
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for row in rows {
        *totals.entry(row.category.as_str()).or_insert(0) += row.num_affected.unwrap_or(0);
    }
    let mut ranked: Vec<(String, u64)> = totals.into_iter().map(|(c, n)| (c.to_string(), n)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}
