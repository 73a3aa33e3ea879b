//! Error and warning types for statement parsing.
//!
//! Row and segment problems are recoverable and surface as [`ParseWarning`]s
//! collected per document. Only [`DocumentError`] fails a whole document.

use std::fmt;
use thiserror::Error;

/// Which kind of localized token failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Date,
    Amount,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Date => f.write_str("date"),
            TokenKind::Amount => f.write_str("amount"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} token '{token}'")]
pub struct LocaleParseError {
    pub kind: TokenKind,
    pub token: String,
}

impl LocaleParseError {
    pub fn date(token: &str) -> Self {
        Self {
            kind: TokenKind::Date,
            token: token.to_string(),
        }
    }

    pub fn amount(token: &str) -> Self {
        Self {
            kind: TokenKind::Amount,
            token: token.to_string(),
        }
    }
}

/// Why a segment could not be turned into a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncompleteReason {
    /// Input ended (or a new header started) before the closing balance row.
    MissingFooter,
    /// A field needed for key derivation or balances was absent.
    MissingField(&'static str),
    /// A required field was present but not a valid localized value.
    InvalidField {
        field: &'static str,
        error: LocaleParseError,
    },
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncompleteReason::MissingFooter => f.write_str("no closing balance row"),
            IncompleteReason::MissingField(field) => write!(f, "missing required field {field}"),
            IncompleteReason::InvalidField { field, error } => {
                write!(f, "required field {field} is invalid: {error}")
            }
        }
    }
}

/// Recoverable problem found while parsing one document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    #[error("transaction at page {page}, row {index} skipped: {source}")]
    LocaleParse {
        page: u32,
        index: u32,
        #[source]
        source: LocaleParseError,
    },

    #[error("statement opened at page {page}, row {index} dropped: {reason}")]
    IncompleteSegment {
        page: u32,
        index: u32,
        reason: IncompleteReason,
    },
}

/// Per-document failure. Sibling documents are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("no statement recovered from {document} ({warnings} warnings)")]
    Unclassifiable { document: String, warnings: usize },
}

pub type Result<T> = std::result::Result<T, LocaleParseError>;
