//! Transaction reconstruction from a segment's body rows.
//!
//! Each transaction line starts a pending record; the continuation lines that
//! follow are folded into it until the next transaction line or the end of
//! the body.

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;
use vypis_core::locale::{parse_amount, parse_date, split_leading_date};
use vypis_core::{ClassifiedRow, LocaleParseError, ParseWarning, PendingTransaction, Role};

use crate::continuation::{ContinuationPolicy, ContinuationTarget};
use crate::layout::Layout;

/// Longest accepted VS/KS/SS value.
const MAX_SYMBOL_DIGITS: usize = 10;

#[derive(Debug, Default)]
pub struct TransactionBatch {
    /// In document order.
    pub transactions: Vec<PendingTransaction>,
    pub warnings: Vec<ParseWarning>,
}

fn symbol_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?P<kind>VS|KS|SS)\s*[:.]?\s*(?P<value>\d{1,10})\b").expect("symbol regex")
    })
}

/// Parse a segment body into pending transactions.
///
/// Lines whose date or amount do not parse are skipped together with their
/// continuation lines and reported as warnings.
pub fn parse(body: &[ClassifiedRow], layout: &Layout, policy: &dyn ContinuationPolicy) -> TransactionBatch {
    let mut batch = TransactionBatch::default();
    let mut pending: Option<PendingTransaction> = None;

    for row in body {
        match row.role {
            Role::Transaction => {
                if let Some(done) = pending.take() {
                    batch.transactions.push(finish(done));
                }
                match parse_transaction_line(row, layout) {
                    Ok(txn) => pending = Some(txn),
                    Err(source) => {
                        warn!(
                            "Skipping transaction at page {}, row {}: {}",
                            row.row.page, row.row.index, source
                        );
                        batch.warnings.push(ParseWarning::LocaleParse {
                            page: row.row.page,
                            index: row.row.index,
                            source,
                        });
                    }
                }
            }
            Role::Continuation => {
                // Continuations of a skipped line are dropped with it.
                if let Some(txn) = pending.as_mut() {
                    fold_continuation(txn, row, layout, policy);
                }
            }
            _ => {}
        }
    }

    if let Some(done) = pending.take() {
        batch.transactions.push(finish(done));
    }
    batch
}

fn parse_transaction_line(
    row: &ClassifiedRow,
    layout: &Layout,
) -> Result<PendingTransaction, LocaleParseError> {
    let cols = &layout.columns;
    let first = row.cell(cols.date_description);

    let (date_token, description) =
        split_leading_date(first).ok_or_else(|| LocaleParseError::date(first))?;
    let accounting_date = parse_date(date_token)?;

    let amount_cell = layout
        .locate_amount(&row.row.cells)
        .ok_or_else(|| LocaleParseError::amount(&row.row.joined_text()))?;
    let amount = parse_amount(row.cell(amount_cell.index))?;

    Ok(PendingTransaction {
        accounting_date,
        transaction_date: None,
        transaction_description: description.to_string(),
        transaction_identification: String::new(),
        account_name_card_type: row.cell(cols.counterparty).to_string(),
        account_number_merchant: String::new(),
        vs: symbol(row.cell(cols.symbol)),
        ks: String::new(),
        ss: String::new(),
        transaction_type: amount_cell.transaction_type,
        amount,
    })
}

fn fold_continuation(
    txn: &mut PendingTransaction,
    row: &ClassifiedRow,
    layout: &Layout,
    policy: &dyn ContinuationPolicy,
) {
    let cols = &layout.columns;
    let text = row.cell(cols.date_description);

    match policy.target(txn, row, layout) {
        ContinuationTarget::Description => append(&mut txn.transaction_description, text, " "),
        ContinuationTarget::Identification => {
            let mut rest = text;
            if txn.transaction_date.is_none() {
                if let Some((token, tail)) = split_leading_date(text) {
                    if let Ok(date) = parse_date(token) {
                        txn.transaction_date = Some(date);
                        rest = tail;
                    }
                }
            }
            append(&mut txn.transaction_identification, rest, "\n");
        }
    }

    let counterparty = row.cell(cols.counterparty);
    if !counterparty.is_empty() {
        if txn.account_number_merchant.is_empty() {
            txn.account_number_merchant = counterparty.to_string();
        } else {
            append(&mut txn.transaction_identification, counterparty, "\n");
        }
    }

    let code = symbol(row.cell(cols.symbol));
    if !code.is_empty() {
        if txn.ks.is_empty() {
            txn.ks = code;
        } else if txn.ss.is_empty() {
            txn.ss = code;
        }
    }
}

/// Fill still-empty symbols from `VS: 123`-style markers in the identification blob.
fn finish(mut txn: PendingTransaction) -> PendingTransaction {
    for caps in symbol_re().captures_iter(&txn.transaction_identification) {
        let value = caps["value"].to_string();
        let slot = match caps["kind"].to_ascii_uppercase().as_str() {
            "VS" => &mut txn.vs,
            "KS" => &mut txn.ks,
            _ => &mut txn.ss,
        };
        if slot.is_empty() {
            *slot = value;
        }
    }
    txn
}

/// Digits-only symbol of at most ten digits, otherwise empty.
fn symbol(cell: &str) -> String {
    let value: String = cell.chars().filter(|c| !c.is_whitespace()).collect();
    if !value.is_empty() && value.len() <= MAX_SYMBOL_DIGITS && value.chars().all(|c| c.is_ascii_digit()) {
        value
    } else {
        String::new()
    }
}

fn append(target: &mut String, text: &str, separator: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push_str(separator);
    }
    target.push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continuation::{DescriptionPolicy, KbContinuationPolicy};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use vypis_core::{RawRow, TransactionType};

    fn line(index: u32, role: Role, values: &[&str]) -> ClassifiedRow {
        ClassifiedRow::new(
            RawRow::new(2, index, values.iter().map(|v| v.to_string()).collect()),
            role,
        )
    }

    fn kb() -> Layout {
        Layout::komercni_banka()
    }

    #[test]
    fn test_three_line_card_payment() {
        let body = vec![
            line(0, Role::Transaction, &["05.01.2024 Platba kartou", "VISA CLASSIC", "", "", "1.250,00"]),
            line(1, Role::Continuation, &["04.01.2024 ALBERT 1234", "ALBERT PRAHA", "0308"]),
            line(2, Role::Continuation, &["CZ PRAHA", "", "77"]),
        ];
        let batch = parse(&body, &kb(), &KbContinuationPolicy);
        assert!(batch.warnings.is_empty());
        assert_eq!(batch.transactions.len(), 1);

        let txn = &batch.transactions[0];
        assert_eq!(txn.accounting_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(txn.transaction_date, NaiveDate::from_ymd_opt(2024, 1, 4));
        assert_eq!(txn.transaction_description, "Platba kartou");
        assert_eq!(txn.transaction_identification, "ALBERT 1234\nCZ PRAHA");
        assert_eq!(txn.account_name_card_type, "VISA CLASSIC");
        assert_eq!(txn.account_number_merchant, "ALBERT PRAHA");
        assert_eq!(txn.ks, "0308");
        assert_eq!(txn.ss, "77");
        assert_eq!(txn.transaction_type, TransactionType::Debit);
        assert_eq!(txn.amount, Decimal::from_str("1250.00").unwrap());
    }

    #[test]
    fn test_wrapped_description_then_next_transaction() {
        let body = vec![
            line(0, Role::Transaction, &["05.01.2024 Příchozí", "ACME s.r.o.", "2024001", "30.000,00", ""]),
            line(1, Role::Continuation, &["úhrada faktury"]),
            line(2, Role::Transaction, &["06.01.2024 Poplatek", "", "", "", "50,00"]),
        ];
        let batch = parse(&body, &kb(), &KbContinuationPolicy);
        assert_eq!(batch.transactions.len(), 2);
        assert_eq!(batch.transactions[0].transaction_description, "Příchozí úhrada faktury");
        assert_eq!(batch.transactions[0].vs, "2024001");
        assert_eq!(batch.transactions[0].transaction_type, TransactionType::Credit);
        assert_eq!(batch.transactions[1].transaction_description, "Poplatek");
        assert_eq!(batch.transactions[1].transaction_type, TransactionType::Debit);
    }

    #[test]
    fn test_signed_amount_resolves_type_independently_of_magnitude() {
        let body = vec![line(0, Role::Transaction, &["05.01.2024 Poplatek", "", "", "-50,00"])];
        let batch = parse(&body, &kb(), &KbContinuationPolicy);
        let txn = &batch.transactions[0];
        assert_eq!(txn.amount, Decimal::from_str("50.00").unwrap());
        assert_eq!(txn.transaction_type, TransactionType::Debit);
    }

    #[test]
    fn test_invalid_date_skips_line_and_its_continuations() {
        let body = vec![
            line(0, Role::Transaction, &["31.02.2024 Chybný", "", "", "", "10,00"]),
            line(1, Role::Continuation, &["patří ke chybnému"]),
            line(2, Role::Transaction, &["01.03.2024 Správný", "", "", "", "20,00"]),
        ];
        let batch = parse(&body, &kb(), &KbContinuationPolicy);
        assert_eq!(batch.transactions.len(), 1);
        assert_eq!(batch.transactions[0].transaction_description, "Správný");
        assert_eq!(batch.warnings.len(), 1);
        assert!(matches!(
            &batch.warnings[0],
            ParseWarning::LocaleParse { page: 2, index: 0, source } if source.token == "31.02.2024"
        ));
    }

    #[test]
    fn test_symbols_from_identification_blob() {
        let body = vec![
            line(0, Role::Transaction, &["05.01.2024 Trvalý příkaz", "Nájem", "", "", "12.000,00"]),
            line(1, Role::Continuation, &["VS: 1001 KS: 0558 SS: 42"]),
        ];
        let txn = &parse(&body, &kb(), &KbContinuationPolicy).transactions[0];
        assert_eq!(txn.vs, "1001");
        assert_eq!(txn.ks, "0558");
        assert_eq!(txn.ss, "42");
        assert_eq!(txn.transaction_description, "Trvalý příkaz");
    }

    #[test]
    fn test_symbol_column_rejects_non_digits() {
        assert_eq!(symbol("0308"), "0308");
        assert_eq!(symbol("12 34"), "1234");
        assert_eq!(symbol("ABC"), "");
        assert_eq!(symbol("12345678901"), "");
        assert_eq!(symbol(""), "");
    }

    #[test]
    fn test_description_policy_keeps_everything_in_description() {
        let body = vec![
            line(0, Role::Transaction, &["05.01.2024 Platba", "", "", "", "10,00"]),
            line(1, Role::Continuation, &["04.01.2024 ALBERT"]),
        ];
        let txn = &parse(&body, &kb(), &DescriptionPolicy).transactions[0];
        assert_eq!(txn.transaction_description, "Platba 04.01.2024 ALBERT");
        assert!(txn.transaction_date.is_none());
        assert!(txn.transaction_identification.is_empty());
    }
}
