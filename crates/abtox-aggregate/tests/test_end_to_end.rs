//! From registry JSON to written tables, without the network.

use std::fs;
use std::path::Path;

use abtox_aggregate::digest::{write_digest, DIGEST_FILE};
use abtox_aggregate::tables::{self, write_all_tables};
use abtox_aggregate::Analysis;
use abtox_ingestion::classify::FilterPolicy;
use abtox_ingestion::pipeline::extract_trials;
use abtox_ingestion::sources::clinicaltrials::parse_study;
use abtox_test_utils::{chemo_trial, rituximab_trial, EventFixture, StudyBuilder};
use pretty_assertions::assert_eq;

fn nivolumab_single_arm(nct_id: &str) -> serde_json::Value {
    StudyBuilder::new(nct_id)
        .title("Nivolumab monotherapy")
        .intervention("Nivolumab", "BIOLOGICAL")
        .group("EG000", "Nivolumab 3 mg/kg")
        .serious(
            EventFixture::new("Pneumonitis", Some("Respiratory disorders"))
                .stat("EG000", 4, 80),
        )
        .serious(
            EventFixture::new("Colitis", Some("Gastrointestinal disorders"))
                .stat("EG000", 2, 80),
        )
        .other(
            EventFixture::new("Fatigue", Some("General disorders"))
                .stat("EG000", 30, 80),
        )
        .build()
}

fn analysis_for(studies: &[serde_json::Value]) -> Analysis {
    let trials: Vec<_> = studies.iter().map(|s| parse_study(s).unwrap()).collect();
    let summary = extract_trials(&trials, &FilterPolicy::default());
    Analysis::build(summary.events, summary.arms, 5)
}

fn read(dir: &Path, file: &str) -> String {
    fs::read_to_string(dir.join(file)).unwrap()
}

fn data_lines(content: &str) -> Vec<&str> {
    content.lines().skip(1).collect()
}

#[test]
fn test_one_antibody_trial_and_one_chemo_trial() {
    let analysis = analysis_for(&[nivolumab_single_arm("NCT20000001"), chemo_trial("NCT20000002")]);
    let dir = tempfile::tempdir().unwrap();
    let reports = write_all_tables(dir.path(), &analysis).unwrap();
    assert_eq!(reports.len(), 6);

    for file in [tables::LONG_FILE, tables::SUMMARY_FILE, tables::ENHANCED_FILE] {
        let content = read(dir.path(), file);
        let rows = data_lines(&content);
        assert!(!rows.is_empty(), "{file} has no rows");
        assert!(rows.iter().all(|l| l.starts_with("NCT20000001,")), "{file} leaks another trial");
    }

    let by_iv = read(dir.path(), tables::BY_INTERVENTION_FILE);
    assert_eq!(
        data_lines(&by_iv),
        vec!["Nivolumab,mab,1,80,6,30,0.075000,0.075000,0.075000,0.375000,0.375000,0.375000"]
    );

    let by_class = read(dir.path(), tables::BY_CLASS_FILE);
    assert_eq!(data_lines(&by_class).len(), 1);
    assert!(by_class.lines().nth(1).unwrap().starts_with("mab,1,80,6,30,"));

    let top = read(dir.path(), tables::TOP_CATEGORIES_FILE);
    assert_eq!(
        data_lines(&top),
        vec![
            "Nivolumab,General disorders,30",
            "Nivolumab,Respiratory disorders,4",
            "Nivolumab,Gastrointestinal disorders,2",
        ]
    );
}

#[test]
fn test_enhanced_arms_and_unmapped_placebo() {
    let analysis = analysis_for(&[rituximab_trial("NCT20000003")]);
    assert_eq!(analysis.trial_count(), 1);

    let enhanced: Vec<_> = analysis
        .enriched
        .iter()
        .map(|a| (a.group_id.as_str(), a.inferred_intervention.as_deref(), a.sae_rate))
        .collect();
    assert_eq!(
        enhanced,
        vec![
            ("EG000", Some("Rituximab"), Some(0.1)),
            ("EG001", Some("Placebo"), Some(2.0 / 38.0)),
        ]
    );

    let names: Vec<_> = analysis.by_intervention.iter().map(|r| r.intervention.as_str()).collect();
    assert_eq!(names, vec!["Rituximab", "Placebo"]);
}

#[test]
fn test_rerun_is_byte_identical() {
    let studies = [rituximab_trial("NCT20000004"), nivolumab_single_arm("NCT20000005")];
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let a = analysis_for(&studies);
    write_all_tables(first.path(), &a).unwrap();
    write_digest(first.path(), &a).unwrap();

    let b = analysis_for(&studies);
    write_all_tables(second.path(), &b).unwrap();
    write_digest(second.path(), &b).unwrap();

    for file in [
        tables::LONG_FILE,
        tables::SUMMARY_FILE,
        tables::ENHANCED_FILE,
        tables::BY_INTERVENTION_FILE,
        tables::BY_CLASS_FILE,
        tables::TOP_CATEGORIES_FILE,
        DIGEST_FILE,
    ] {
        assert_eq!(
            fs::read(first.path().join(file)).unwrap(),
            fs::read(second.path().join(file)).unwrap(),
            "{file} differs between runs"
        );
    }
}

#[test]
fn test_digest_contents() {
    let analysis = analysis_for(&[nivolumab_single_arm("NCT20000006")]);
    let dir = tempfile::tempdir().unwrap();
    write_digest(dir.path(), &analysis).unwrap();
    let digest = read(dir.path(), DIGEST_FILE);
    assert_eq!(
        digest,
        "Antibody therapeutic trials with posted results: 1\n\
         Arms/groups with AE data: 1\n\
         Serious adverse events (SAEs) per arm: median 0.075, IQR 0.075-0.075\n\
         Top serious AE categories:\n\
         - Serious Respiratory disorders: 4 affected across studies\n\
         - Serious Gastrointestinal disorders: 2 affected across studies\n\
         Top other AE categories:\n\
         - Other General disorders: 30 affected across studies"
    );
}
