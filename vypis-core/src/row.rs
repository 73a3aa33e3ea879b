//! Row-level types flowing from the table extractor into the segmenter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of extracted table cells with page/position provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub page: u32,
    /// Row index on the page
    pub index: u32,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(page: u32, index: u32, cells: Vec<String>) -> Self {
        Self { page, index, cells }
    }

    /// Cell at `idx`, or "" when the row is shorter.
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }

    /// Non-empty cells joined with a single space.
    pub fn joined_text(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Role assigned to a row by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    HeaderField,
    Transaction,
    Continuation,
    Footer,
    Noise,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::HeaderField => "HEADER_FIELD",
            Role::Transaction => "TRANSACTION",
            Role::Continuation => "CONTINUATION",
            Role::Footer => "FOOTER",
            Role::Noise => "NOISE",
        }
    }

    /// Roles a continuation line may directly follow.
    pub fn opens_continuation(&self) -> bool {
        matches!(self, Role::Transaction | Role::Continuation)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statement header field a label maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKey {
    AccountNumber,
    StatementType,
    Iban,
    AccountType,
    Currency,
    StatementDate,
    StatementNumber,
    AccountEntity,
    StartBalance,
    EndBalance,
    /// Label-shaped cell not in the layout's table; kept for diagnostics only.
    Unknown(String),
}

impl FieldKey {
    pub fn name(&self) -> &str {
        match self {
            FieldKey::AccountNumber => "account_number",
            FieldKey::StatementType => "statement_type",
            FieldKey::Iban => "iban",
            FieldKey::AccountType => "account_type",
            FieldKey::Currency => "currency",
            FieldKey::StatementDate => "statement_date",
            FieldKey::StatementNumber => "statement_number",
            FieldKey::AccountEntity => "account_entity",
            FieldKey::StartBalance => "start_balance",
            FieldKey::EndBalance => "end_balance",
            FieldKey::Unknown(label) => label,
        }
    }
}

/// Partially parsed `label: value` pair of a header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderField {
    pub key: FieldKey,
    pub value: String,
}

/// A raw row tagged with its role. Lives only for one document pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRow {
    pub row: RawRow,
    pub role: Role,
    pub field: Option<HeaderField>,
}

impl ClassifiedRow {
    pub fn new(row: RawRow, role: Role) -> Self {
        Self {
            row,
            role,
            field: None,
        }
    }

    pub fn header(row: RawRow, field: HeaderField) -> Self {
        Self {
            row,
            role: Role::HeaderField,
            field: Some(field),
        }
    }

    pub fn cell(&self, idx: usize) -> &str {
        self.row.cell(idx)
    }
}
