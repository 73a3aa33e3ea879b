//! Output entities: statement metadata and statement line items.
//!
//! Column order of both records is part of the published data contract.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::{canonical_amount, canonical_date, metadata_pk, transaction_pk};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statement header values before the key is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMetadata {
    pub account_number: String,
    pub statement_type: String,
    pub iban: String,
    pub account_type: String,
    pub currency: String,
    pub statement_date: NaiveDate,
    pub statement_number: String,
    pub account_entity: String,
    pub start_balance: Decimal,
    pub end_balance: Decimal,
}

/// Transaction values before the key, statement link and ordinal are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub accounting_date: NaiveDate,
    pub transaction_date: Option<NaiveDate>,
    pub transaction_description: String,
    pub transaction_identification: String,
    pub account_name_card_type: String,
    pub account_number_merchant: String,
    pub vs: String,
    pub ks: String,
    pub ss: String,
    pub transaction_type: TransactionType,
    /// Always a positive magnitude; direction lives in `transaction_type`.
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementMetadata {
    pub pk: String,
    pub account_number: String,
    pub statement_type: String,
    pub iban: String,
    pub account_type: String,
    pub currency: String,
    pub statement_date: NaiveDate,
    pub statement_number: String,
    pub account_entity: String,
    pub start_balance: Decimal,
    pub end_balance: Decimal,
}

impl StatementMetadata {
    pub const COLUMNS: [&'static str; 11] = [
        "pk",
        "account_number",
        "statement_type",
        "iban",
        "account_type",
        "currency",
        "statement_date",
        "statement_number",
        "account_entity",
        "start_balance",
        "end_balance",
    ];

    pub fn from_pending(meta: PendingMetadata) -> Self {
        let pk = metadata_pk(&meta);
        Self {
            pk,
            account_number: meta.account_number,
            statement_type: meta.statement_type,
            iban: meta.iban,
            account_type: meta.account_type,
            currency: meta.currency,
            statement_date: meta.statement_date,
            statement_number: meta.statement_number,
            account_entity: meta.account_entity,
            start_balance: meta.start_balance,
            end_balance: meta.end_balance,
        }
    }

    /// Cells in [`Self::COLUMNS`] order.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.pk.clone(),
            self.account_number.clone(),
            self.statement_type.clone(),
            self.iban.clone(),
            self.account_type.clone(),
            self.currency.clone(),
            canonical_date(self.statement_date),
            self.statement_number.clone(),
            self.account_entity.clone(),
            canonical_amount(self.start_balance),
            canonical_amount(self.end_balance),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub pk: String,
    pub statement_metadata_pk: String,
    pub row_nr: u32,
    pub accounting_date: NaiveDate,
    pub transaction_date: Option<NaiveDate>,
    pub transaction_description: String,
    pub transaction_identification: String,
    #[serde(rename = "account_name__card_type")]
    pub account_name_card_type: String,
    #[serde(rename = "account_number__merchant")]
    pub account_number_merchant: String,
    pub vs: String,
    pub ks: String,
    pub ss: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
}

impl TransactionRow {
    pub const COLUMNS: [&'static str; 14] = [
        "pk",
        "statement_metadata_pk",
        "row_nr",
        "accounting_date",
        "transaction_date",
        "transaction_description",
        "transaction_identification",
        "account_name__card_type",
        "account_number__merchant",
        "vs",
        "ks",
        "ss",
        "transaction_type",
        "amount",
    ];

    pub fn from_pending(txn: PendingTransaction, statement_metadata_pk: &str, row_nr: u32) -> Self {
        let pk = transaction_pk(statement_metadata_pk, row_nr, &txn);
        Self {
            pk,
            statement_metadata_pk: statement_metadata_pk.to_string(),
            row_nr,
            accounting_date: txn.accounting_date,
            transaction_date: txn.transaction_date,
            transaction_description: txn.transaction_description,
            transaction_identification: txn.transaction_identification,
            account_name_card_type: txn.account_name_card_type,
            account_number_merchant: txn.account_number_merchant,
            vs: txn.vs,
            ks: txn.ks,
            ss: txn.ss,
            transaction_type: txn.transaction_type,
            amount: txn.amount,
        }
    }

    /// Cells in [`Self::COLUMNS`] order.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.pk.clone(),
            self.statement_metadata_pk.clone(),
            self.row_nr.to_string(),
            canonical_date(self.accounting_date),
            self.transaction_date.map(canonical_date).unwrap_or_default(),
            self.transaction_description.clone(),
            self.transaction_identification.clone(),
            self.account_name_card_type.clone(),
            self.account_number_merchant.clone(),
            self.vs.clone(),
            self.ks.clone(),
            self.ss.clone(),
            self.transaction_type.to_string(),
            canonical_amount(self.amount),
        ]
    }

    /// Signed value: credits positive, debits negative.
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Credit => self.amount,
            TransactionType::Debit => -self.amount,
        }
    }
}
