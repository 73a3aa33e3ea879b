//! vypis-export: incremental sliced-table writer keyed by record `pk`.

pub mod dedup;
pub mod manifest;
pub mod writer;

pub use dedup::DedupIndex;
pub use manifest::{TableManifest, TableSpec};
pub use writer::{DuplicatePolicy, IncrementalWriter, WriteSummary};
