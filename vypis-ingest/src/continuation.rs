//! Attribution of wrapped transaction lines.
//!
//! Whether a continuation line extends the description or the identification
//! blob depends on the statement layout, so it is a pluggable policy.

use regex::Regex;
use std::sync::OnceLock;
use vypis_core::locale::split_leading_date;
use vypis_core::{ClassifiedRow, PendingTransaction};

use crate::layout::Layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationTarget {
    Description,
    Identification,
}

pub trait ContinuationPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decide where the text of `row` goes for the transaction being built.
    fn target(&self, pending: &PendingTransaction, row: &ClassifiedRow, layout: &Layout)
        -> ContinuationTarget;
}

fn symbol_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:VS|KS|SS)\s*[:.]").expect("symbol marker regex"))
}

/// Komerční banka rule.
///
/// The identification blob starts on the line carrying the transaction date
/// (or a `VS:`/`KS:`/`SS:` marker) and every later line stays in it. Lines
/// before that are wrapped description text.
#[derive(Debug, Clone, Copy, Default)]
pub struct KbContinuationPolicy;

impl ContinuationPolicy for KbContinuationPolicy {
    fn name(&self) -> &'static str {
        "kb"
    }

    fn target(
        &self,
        pending: &PendingTransaction,
        row: &ClassifiedRow,
        layout: &Layout,
    ) -> ContinuationTarget {
        let text = row.cell(layout.columns.date_description);

        if !pending.transaction_identification.is_empty()
            || pending.transaction_date.is_some()
            || split_leading_date(text).is_some()
            || symbol_marker_re().is_match(&row.row.joined_text())
        {
            ContinuationTarget::Identification
        } else {
            ContinuationTarget::Description
        }
    }
}

/// Every wrapped line extends the description.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptionPolicy;

impl ContinuationPolicy for DescriptionPolicy {
    fn name(&self) -> &'static str {
        "description"
    }

    fn target(&self, _: &PendingTransaction, _: &ClassifiedRow, _: &Layout) -> ContinuationTarget {
        ContinuationTarget::Description
    }
}

/// Look up a built-in policy by its config name.
pub fn policy_by_name(name: &str) -> Option<Box<dyn ContinuationPolicy>> {
    match name.trim().to_lowercase().as_str() {
        "kb" => Some(Box::new(KbContinuationPolicy)),
        "description" => Some(Box::new(DescriptionPolicy)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use vypis_core::{RawRow, Role, TransactionType};

    fn pending() -> PendingTransaction {
        PendingTransaction {
            accounting_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            transaction_date: None,
            transaction_description: "Platba".into(),
            transaction_identification: String::new(),
            account_name_card_type: String::new(),
            account_number_merchant: String::new(),
            vs: String::new(),
            ks: String::new(),
            ss: String::new(),
            transaction_type: TransactionType::Debit,
            amount: Decimal::ONE,
        }
    }

    fn continuation(values: &[&str]) -> ClassifiedRow {
        ClassifiedRow::new(
            RawRow::new(1, 0, values.iter().map(|v| v.to_string()).collect()),
            Role::Continuation,
        )
    }

    #[test]
    fn test_kb_plain_text_extends_description() {
        let layout = Layout::komercni_banka();
        let target = KbContinuationPolicy.target(&pending(), &continuation(&["kartou ALBERT"]), &layout);
        assert_eq!(target, ContinuationTarget::Description);
    }

    #[test]
    fn test_kb_dated_line_opens_identification() {
        let layout = Layout::komercni_banka();
        let row = continuation(&["04.01.2024 ALBERT 1234", "123-456/0100", "0308"]);
        assert_eq!(
            KbContinuationPolicy.target(&pending(), &row, &layout),
            ContinuationTarget::Identification
        );
    }

    #[test]
    fn test_kb_symbol_marker_opens_identification() {
        let layout = Layout::komercni_banka();
        let row = continuation(&["VS: 2024001 KS: 0308"]);
        assert_eq!(
            KbContinuationPolicy.target(&pending(), &row, &layout),
            ContinuationTarget::Identification
        );
    }

    #[test]
    fn test_kb_identification_is_sticky() {
        let layout = Layout::komercni_banka();
        let mut txn = pending();
        txn.transaction_identification = "ref 1".into();
        assert_eq!(
            KbContinuationPolicy.target(&txn, &continuation(&["volný text"]), &layout),
            ContinuationTarget::Identification
        );
    }

    #[test]
    fn test_description_policy_and_lookup() {
        let layout = Layout::komercni_banka();
        let row = continuation(&["04.01.2024 ALBERT"]);
        assert_eq!(
            DescriptionPolicy.target(&pending(), &row, &layout),
            ContinuationTarget::Description
        );
        assert_eq!(policy_by_name("KB").unwrap().name(), "kb");
        assert!(policy_by_name("other").is_none());
    }
}
