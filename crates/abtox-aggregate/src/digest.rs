//! Plain-text run digest.

use std::collections::BTreeSet;
use std::path::Path;

use abtox_common::Result;
use abtox_ingestion::models::AeKind;
use tracing::info;

use crate::aggregate::category_totals;
use crate::stats::RateSummary;
use crate::Analysis;

pub const DIGEST_FILE: &str = "antibody_trials_toxicity_summary.txt";

const TOP_CATEGORIES: usize = 10;

/// Render the digest: trial and arm counts, the SAE rate distribution over
/// all arms, and the most frequent serious and other categories.
pub fn render_digest(analysis: &Analysis) -> String {
    let trials: BTreeSet<&str> = analysis.events.iter().map(|r| r.meta.nct_id.as_str()).collect();

    let mut lines = vec![
        format!("Antibody therapeutic trials with posted results: {}", trials.len()),
        format!("Arms/groups with AE data: {}", analysis.arms.len()),
    ];

    let sae = RateSummary::from_rates(analysis.enriched.iter().map(|a| a.sae_rate));
    if let (Some(median), Some(q1), Some(q3)) = (sae.median, sae.q1, sae.q3) {
        lines.push(format!(
            "Serious adverse events (SAEs) per arm: median {median:.3}, IQR {q1:.3}-{q3:.3}"
        ));
    }

    for (kind, heading, label) in [
        (AeKind::Serious, "Top serious AE categories:", "Serious"),
        (AeKind::Other, "Top other AE categories:", "Other"),
    ] {
        lines.push(heading.to_string());
        let ranked = category_totals(analysis.events.iter().filter(|r| r.kind == kind));
        for (category, total) in ranked.into_iter().take(TOP_CATEGORIES) {
            lines.push(format!("- {label} {category}: {total} affected across studies"));
        }
    }

    lines.join("\n")
}

pub fn write_digest(dir: &Path, analysis: &Analysis) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(DIGEST_FILE);
    std::fs::write(&path, render_digest(analysis))?;
    info!(path = %path.display(), "Wrote run digest");
    Ok(())
}
