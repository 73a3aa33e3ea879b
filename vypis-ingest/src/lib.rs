//! vypis-ingest: statement segmentation and parsing for extracted table rows.
//!
//! raw rows → [`classifier`] → [`segmenter`] → {[`metadata`], [`transactions`]}
//! → keyed records, driven per document by [`document::DocumentParser`].

pub mod classifier;
pub mod continuation;
pub mod document;
pub mod layout;
pub mod metadata;
pub mod segmenter;
pub mod source;
pub mod transactions;

pub use classifier::{classify, classify_all};
pub use continuation::{policy_by_name, ContinuationPolicy, DescriptionPolicy, KbContinuationPolicy};
pub use document::{DocumentOutcome, DocumentParser, DocumentStats, ParsedStatement};
pub use layout::Layout;
pub use segmenter::{SegmentEvent, Segmenter, SegmenterState, StatementSegment};
