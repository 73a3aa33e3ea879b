//! Statement metadata extraction from a segment's header and footer rows.

use rust_decimal::Decimal;
use tracing::debug;
use vypis_core::locale::{amount_sign, parse_amount, parse_date, Sign};
use vypis_core::{ClassifiedRow, FieldKey, IncompleteReason, PendingMetadata, Role};

use crate::layout::{normalize_label, Layout};

#[derive(Debug, Default)]
struct MetadataDraft {
    account_number: Option<String>,
    statement_type: Option<String>,
    iban: Option<String>,
    account_type: Option<String>,
    currency: Option<String>,
    statement_date: Option<String>,
    statement_number: Option<String>,
    account_entity: Vec<String>,
    start_balance: Option<String>,
    end_balance: Option<String>,
}

fn keep_first(slot: &mut Option<String>, value: &str) {
    if slot.is_none() {
        *slot = Some(value.to_string());
    }
}

/// Build statement metadata from header ∪ footer rows.
///
/// Header balance lines fill balances the footer has not set.
///
/// Unknown labels are ignored. A missing or invalid account number, statement
/// date, statement number or balance makes the segment unusable, because the
/// key and balances cannot be derived without them.
pub fn extract<'a, I>(rows: I, layout: &Layout) -> Result<PendingMetadata, IncompleteReason>
where
    I: IntoIterator<Item = &'a ClassifiedRow>,
{
    let mut draft = MetadataDraft::default();

    for row in rows {
        match (row.role, &row.field) {
            (Role::HeaderField, Some(field)) => {
                let value = field.value.as_str();
                match &field.key {
                    FieldKey::AccountNumber => keep_first(&mut draft.account_number, value),
                    FieldKey::StatementType => keep_first(&mut draft.statement_type, value),
                    FieldKey::Iban => keep_first(&mut draft.iban, value),
                    FieldKey::AccountType => keep_first(&mut draft.account_type, value),
                    FieldKey::Currency => keep_first(&mut draft.currency, value),
                    FieldKey::StatementDate => keep_first(&mut draft.statement_date, value),
                    FieldKey::StatementNumber => keep_first(&mut draft.statement_number, value),
                    FieldKey::AccountEntity => draft.account_entity.push(value.to_string()),
                    FieldKey::StartBalance => {
                        read_balances(&row.row.cells, layout, &mut draft, keep_first);
                        keep_first(&mut draft.start_balance, value);
                    }
                    FieldKey::EndBalance => {
                        read_balances(&row.row.cells, layout, &mut draft, keep_first);
                        keep_first(&mut draft.end_balance, value);
                    }
                    FieldKey::Unknown(label) => {
                        debug!("Ignoring unknown header label '{}'", label);
                    }
                }
            }
            (Role::Footer, _) => read_balances(&row.row.cells, layout, &mut draft, overwrite),
            _ => {}
        }
    }

    build(draft)
}

fn overwrite(slot: &mut Option<String>, value: &str) {
    *slot = Some(value.to_string());
}

/// Scan a balance row; one row may carry both balances. Footer balances
/// override header values.
fn read_balances(
    cells: &[String],
    layout: &Layout,
    draft: &mut MetadataDraft,
    store: fn(&mut Option<String>, &str),
) {
    for i in 0..cells.len() {
        if let Some(value) = labelled_value(cells, i, &layout.opening_balance_label) {
            store(&mut draft.start_balance, &value);
        }
        if let Some(value) = labelled_value(cells, i, &layout.closing_balance_label) {
            store(&mut draft.end_balance, &value);
        }
    }
}

/// Value for `label` at cell `i`: inline after the label, or the next non-empty cell.
fn labelled_value(cells: &[String], i: usize, label: &str) -> Option<String> {
    let normalized = normalize_label(&cells[i]);
    let inline = normalized.strip_prefix(label)?.trim_start_matches(':').trim();
    if !inline.is_empty() {
        return Some(inline.to_string());
    }
    cells[i + 1..]
        .iter()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

fn required(value: Option<String>, field: &'static str) -> Result<String, IncompleteReason> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(IncompleteReason::MissingField(field))
}

/// Balances keep their sign; an overdrawn account prints a leading `-`.
fn parse_balance(value: Option<String>, field: &'static str) -> Result<Decimal, IncompleteReason> {
    let text = required(value, field)?;
    let magnitude =
        parse_amount(&text).map_err(|error| IncompleteReason::InvalidField { field, error })?;
    Ok(match amount_sign(&text) {
        Sign::Negative => -magnitude,
        Sign::Positive | Sign::Unsigned => magnitude,
    })
}

fn build(draft: MetadataDraft) -> Result<PendingMetadata, IncompleteReason> {
    let account_number = required(draft.account_number, "account_number")?;
    let date_text = required(draft.statement_date, "statement_date")?;
    let statement_date = parse_date(&date_text).map_err(|error| IncompleteReason::InvalidField {
        field: "statement_date",
        error,
    })?;
    let statement_number = required(draft.statement_number, "statement_number")?;
    let start_balance = parse_balance(draft.start_balance, "start_balance")?;
    let end_balance = parse_balance(draft.end_balance, "end_balance")?;

    Ok(PendingMetadata {
        account_number,
        statement_type: draft.statement_type.unwrap_or_default(),
        iban: draft.iban.unwrap_or_default(),
        account_type: draft.account_type.unwrap_or_default(),
        currency: draft.currency.unwrap_or_default(),
        statement_date,
        statement_number,
        account_entity: draft.account_entity.join("\n"),
        start_balance,
        end_balance,
    })
}
