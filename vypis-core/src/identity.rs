//! Deterministic content-derived primary keys.
//!
//! Keys are SHA-256 over a canonical, separator-joined rendering of the key
//! fields, so they are identical across runs, processes and machines.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::records::{PendingMetadata, PendingTransaction};

/// ASCII unit separator. Row normalization replaces control characters, so
/// it never occurs inside a field.
const FIELD_SEPARATOR: &str = "\u{1f}";

/// Hash an ordered list of canonical field renderings.
pub fn stable_hash<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            hasher.update(FIELD_SEPARATOR.as_bytes());
        }
        hasher.update(field.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// ISO rendering used in keys and output.
pub fn canonical_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Two-decimal rendering used in keys and output.
pub fn canonical_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

pub fn metadata_pk(meta: &PendingMetadata) -> String {
    stable_hash([
        meta.account_number.as_str(),
        canonical_date(meta.statement_date).as_str(),
        meta.statement_number.as_str(),
        meta.account_entity.as_str(),
    ])
}

pub fn transaction_pk(statement_metadata_pk: &str, row_nr: u32, txn: &PendingTransaction) -> String {
    stable_hash([
        statement_metadata_pk,
        row_nr.to_string().as_str(),
        canonical_date(txn.accounting_date).as_str(),
        txn.transaction_description.as_str(),
        canonical_amount(txn.amount).as_str(),
    ])
}
