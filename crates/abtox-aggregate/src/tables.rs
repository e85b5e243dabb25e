//! Flat CSV output tables.
//!
//! Every table has an explicit header. Rates are written with six decimals;
//! undefined values are written as an empty field.

use std::path::{Path, PathBuf};

use abtox_common::Result;
use abtox_ingestion::models::{AdverseEventRecord, ArmSummary, TrialMeta};
use tracing::{debug, info};

use crate::aggregate::{BucketTotals, CategoryCount, ClassAggregate, InterventionAggregate};
use crate::resolver::EnrichedArm;
use crate::Analysis;

pub const LONG_FILE: &str = "antibody_trials_adverse_events_long.csv";
pub const SUMMARY_FILE: &str = "antibody_trials_adverse_events_summary.csv";
pub const ENHANCED_FILE: &str = "antibody_ae_per_arm_enhanced.csv";
pub const BY_INTERVENTION_FILE: &str = "antibody_ae_by_intervention.csv";
pub const BY_CLASS_FILE: &str = "antibody_ae_by_class.csv";
pub const TOP_CATEGORIES_FILE: &str = "antibody_ae_top_categories_by_intervention.csv";

/// A type that serialises to one row of a fixed-header table.
pub trait TableRow {
    const HEADER: &'static [&'static str];

    fn record(&self) -> Vec<String>;
}

pub fn fmt_rate(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

fn fmt_count(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn fmt_text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn meta_fields(meta: &TrialMeta) -> Vec<String> {
    vec![
        meta.nct_id.clone(),
        meta.title.clone(),
        fmt_text(meta.overall_status.as_deref()),
        fmt_text(meta.study_type.as_deref()),
        meta.phases.clone(),
        meta.conditions.clone(),
        fmt_text(meta.lead_sponsor.as_deref()),
        meta.interventions.clone(),
    ]
}

fn totals_fields(t: &BucketTotals) -> [String; 10] {
    [
        t.arms.to_string(),
        t.total_num_at_risk.to_string(),
        t.total_serious_ae.to_string(),
        t.total_other_ae.to_string(),
        fmt_rate(t.sae_rate.median),
        fmt_rate(t.sae_rate.q1),
        fmt_rate(t.sae_rate.q3),
        fmt_rate(t.other_rate.median),
        fmt_rate(t.other_rate.q1),
        fmt_rate(t.other_rate.q3),
    ]
}

impl TableRow for AdverseEventRecord {
    const HEADER: &'static [&'static str] = &[
        "nct_id", "title", "overall_status", "study_type", "phases", "conditions", "lead_sponsor",
        "interventions", "group_id", "group_title", "ae_kind", "category", "event",
        "num_affected", "num_at_risk", "percentage",
    ];

    fn record(&self) -> Vec<String> {
        let mut r = meta_fields(&self.meta);
        r.extend([
            self.group_id.clone(),
            fmt_text(self.group_title.as_deref()),
            self.kind.as_str().to_string(),
            self.category.clone(),
            fmt_text(self.event_term.as_deref()),
            fmt_count(self.num_affected),
            fmt_count(self.num_at_risk),
            self.percentage.map(|p| p.to_string()).unwrap_or_default(),
        ]);
        r
    }
}

impl TableRow for ArmSummary {
    const HEADER: &'static [&'static str] = &[
        "nct_id", "title", "overall_status", "study_type", "phases", "conditions", "lead_sponsor",
        "interventions", "group_id", "group_title", "num_at_risk", "total_serious_ae",
        "total_other_ae",
    ];

    fn record(&self) -> Vec<String> {
        let mut r = meta_fields(&self.meta);
        r.extend([
            self.group_id.clone(),
            fmt_text(self.group_title.as_deref()),
            fmt_count(self.num_at_risk),
            self.total_serious_ae.to_string(),
            self.total_other_ae.to_string(),
        ]);
        r
    }
}

impl TableRow for EnrichedArm {
    const HEADER: &'static [&'static str] = &[
        "nct_id", "title", "overall_status", "study_type", "phases", "conditions", "lead_sponsor",
        "interventions", "group_id", "group_title", "num_at_risk", "total_serious_ae",
        "total_other_ae", "arm_label", "arm_inferred_intervention", "intervention_class",
        "sae_rate", "other_ae_rate",
    ];

    fn record(&self) -> Vec<String> {
        let mut r = meta_fields(&self.meta);
        r.extend([
            self.group_id.clone(),
            fmt_text(self.group_title.as_deref()),
            fmt_count(self.num_at_risk),
            self.total_serious_ae.to_string(),
            self.total_other_ae.to_string(),
            self.arm_label.clone(),
            fmt_text(self.inferred_intervention.as_deref()),
            self.intervention_class.as_str().to_string(),
            fmt_rate(self.sae_rate),
            fmt_rate(self.other_ae_rate),
        ]);
        r
    }
}

impl TableRow for InterventionAggregate {
    const HEADER: &'static [&'static str] = &[
        "intervention", "class", "arms", "total_num_at_risk", "total_serious_ae", "total_other_ae",
        "sae_rate_median", "sae_rate_q1", "sae_rate_q3",
        "other_rate_median", "other_rate_q1", "other_rate_q3",
    ];

    fn record(&self) -> Vec<String> {
        let mut r = vec![self.intervention.clone(), self.class.as_str().to_string()];
        r.extend(totals_fields(&self.totals));
        r
    }
}

impl TableRow for ClassAggregate {
    const HEADER: &'static [&'static str] = &[
        "class", "arms", "total_num_at_risk", "total_serious_ae", "total_other_ae",
        "sae_rate_median", "sae_rate_q1", "sae_rate_q3",
        "other_rate_median", "other_rate_q1", "other_rate_q3",
    ];

    fn record(&self) -> Vec<String> {
        let mut r = vec![self.class.as_str().to_string()];
        r.extend(totals_fields(&self.totals));
        r
    }
}

impl TableRow for CategoryCount {
    const HEADER: &'static [&'static str] = &["intervention", "category", "affected"];

    fn record(&self) -> Vec<String> {
        vec![self.intervention.clone(), self.category.clone(), self.affected.to_string()]
    }
}

/// Write `rows` as CSV to `path`, header first. Returns the row count.
pub fn write_table<T: TableRow>(path: &Path, rows: &[T]) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(T::HEADER)?;
    for row in rows {
        writer.write_record(row.record())?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "Table written");
    Ok(rows.len())
}

/// Rows written to one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub file: &'static str,
    pub path: PathBuf,
    pub rows: usize,
}

/// Write all six tables into `dir`, creating it if needed.
pub fn write_all_tables(dir: &Path, analysis: &Analysis) -> Result<Vec<TableReport>> {
    std::fs::create_dir_all(dir)?;

    let mut reports = Vec::with_capacity(6);
    let mut emit = |file: &'static str, rows: usize| {
        reports.push(TableReport { file, path: dir.join(file), rows });
    };

    emit(LONG_FILE, write_table(&dir.join(LONG_FILE), &analysis.events)?);
    emit(SUMMARY_FILE, write_table(&dir.join(SUMMARY_FILE), &analysis.arms)?);
    emit(ENHANCED_FILE, write_table(&dir.join(ENHANCED_FILE), &analysis.enriched)?);
    emit(BY_INTERVENTION_FILE, write_table(&dir.join(BY_INTERVENTION_FILE), &analysis.by_intervention)?);
    emit(BY_CLASS_FILE, write_table(&dir.join(BY_CLASS_FILE), &analysis.by_class)?);
    emit(TOP_CATEGORIES_FILE, write_table(&dir.join(TOP_CATEGORIES_FILE), &analysis.top_categories)?);

    for r in &reports {
        info!(file = r.file, rows = r.rows, "Wrote table");
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    const META_HEADER: [&str; 8] = [
        "nct_id", "title", "overall_status", "study_type", "phases", "conditions",
        "lead_sponsor", "interventions",
    ];

    #[test]
    fn test_fmt_rate() {
        assert_eq!(fmt_rate(Some(0.1)), "0.100000");
        assert_eq!(fmt_rate(Some(1.0 / 3.0)), "0.333333");
        assert_eq!(fmt_rate(None), "");
    }

    #[test]
    fn test_headers_match_record_width() {
        let cat = CategoryCount { intervention: "X".into(), category: "Y".into(), affected: 1 };
        assert_eq!(cat.record().len(), CategoryCount::HEADER.len());
        assert_eq!(&AdverseEventRecord::HEADER[..8], &META_HEADER[..]);
        assert_eq!(&ArmSummary::HEADER[..8], &META_HEADER[..]);
        assert_eq!(&EnrichedArm::HEADER[..ArmSummary::HEADER.len()], ArmSummary::HEADER);
    }

    #[test]
    fn test_write_table_empty_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let rows: Vec<CategoryCount> = vec![];
        assert_eq!(write_table(&path, &rows).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "intervention,category,affected\n");
    }
}
