//! abtox-ingestion — Registry retrieval and adverse-event extraction.
//! - Cursor-paginated study search (ClinicalTrials.gov v2)
//! - Antibody intervention detection and taxonomy
//! - Canonical arm/group mapping
//! - Long-form adverse-event rows and per-arm summaries
//! - Deduplication

pub mod adverse_events;
pub mod classify;
pub mod dedup;
pub mod groups;
pub mod models;
pub mod pipeline;
pub mod reduce;
pub mod sources;

pub use pipeline::{run_ingestion, IngestionJob, IngestionResult};
pub use sources::StudySource;
