//! # fieldsync-ingest
//!
//! Turns raw mobile-forms submissions into durable, deduplicated equipment
//! records and download-queue entries:
//!
//! - [`extract`]: tolerant extraction from drifted nested JSON
//! - [`dedup`]: the two disjoint identity schemes
//! - [`numbering`]: type-prefixed off-contract number generation
//! - [`persist`]: equipment writes and placeholder number resolution
//! - [`jobs`]: report/photo job creation
//! - [`pipeline`]: the per-agency fetch → persist → mark-read loop

pub mod dedup;
pub mod extract;
pub mod jobs;
pub mod numbering;
pub mod persist;
pub mod pipeline;

pub use dedup::Deduplicator;
pub use extract::extract;
pub use jobs::{JobCreator, JobOutcome};
pub use numbering::{next_number, normalize_label, prefix_for_type, NumberGenerator};
pub use persist::{PersistOutcome, Persister};
pub use pipeline::{IngestPipeline, PipelineConfig};
