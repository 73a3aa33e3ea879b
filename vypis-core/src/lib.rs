//! vypis-core: record types, Czech locale value parsing and stable identity keys
//! shared by the statement ingestion and export crates.

pub mod error;
pub mod identity;
pub mod locale;
pub mod records;
pub mod row;

pub use error::{DocumentError, IncompleteReason, LocaleParseError, ParseWarning, TokenKind};
pub use records::{
    PendingMetadata, PendingTransaction, StatementMetadata, TransactionRow, TransactionType,
};
pub use row::{ClassifiedRow, FieldKey, HeaderField, RawRow, Role};
