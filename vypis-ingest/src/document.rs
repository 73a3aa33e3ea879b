//! One end-to-end pass over a document's raw rows.
//!
//! Rows are classified one by one, grouped by the segmenter, and every closed
//! segment is turned into a statement with keyed transactions. Row and segment
//! problems become warnings; a document without any statement is an error.

use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use vypis_core::{
    ClassifiedRow, DocumentError, IncompleteReason, ParseWarning, PendingTransaction, RawRow,
    Role, StatementMetadata, TransactionRow, TransactionType,
};

use crate::classifier::{classify, classify_all};
use crate::continuation::{ContinuationPolicy, KbContinuationPolicy};
use crate::layout::Layout;
use crate::metadata;
use crate::segmenter::{SegmentEvent, Segmenter, StatementSegment};
use crate::transactions;

/// A statement and its line items, linked by `statement_metadata_pk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    pub metadata: StatementMetadata,
    pub transactions: Vec<TransactionRow>,
}

impl ParsedStatement {
    fn new(metadata: StatementMetadata, pending: Vec<PendingTransaction>) -> Self {
        let transactions = pending
            .into_iter()
            .enumerate()
            .map(|(row_nr, txn)| TransactionRow::from_pending(txn, &metadata.pk, row_nr as u32))
            .collect();
        let statement = Self {
            metadata,
            transactions,
        };
        statement.assert_integrity();
        statement
    }

    /// Every row points at this statement and ordinals are 0..N.
    fn assert_integrity(&self) {
        for (i, txn) in self.transactions.iter().enumerate() {
            assert_eq!(txn.statement_metadata_pk, self.metadata.pk, "foreign key mismatch");
            assert_eq!(txn.row_nr as usize, i, "row_nr not contiguous");
        }
    }
}

/// Counters for one document pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStats {
    pub pages: usize,
    pub rows: usize,
    pub header_rows: usize,
    pub transaction_rows: usize,
    pub continuation_rows: usize,
    pub footer_rows: usize,
    pub noise_rows: usize,
    pub segments_emitted: usize,
    pub segments_dropped: usize,
    pub rows_skipped: usize,
    /// Transaction lines found outside any statement.
    pub stray_rows: usize,
    pub credit_total: Decimal,
    pub debit_total: Decimal,
}

impl DocumentStats {
    fn record_role(&mut self, role: Role) {
        self.rows += 1;
        match role {
            Role::HeaderField => self.header_rows += 1,
            Role::Transaction => self.transaction_rows += 1,
            Role::Continuation => self.continuation_rows += 1,
            Role::Footer => self.footer_rows += 1,
            Role::Noise => self.noise_rows += 1,
        }
    }

    fn record_statement(&mut self, statement: &ParsedStatement) {
        self.segments_emitted += 1;
        for txn in &statement.transactions {
            match txn.transaction_type {
                TransactionType::Credit => self.credit_total += txn.amount,
                TransactionType::Debit => self.debit_total += txn.amount,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub document: String,
    pub statements: Vec<ParsedStatement>,
    pub warnings: Vec<ParseWarning>,
    pub stats: DocumentStats,
}

impl DocumentOutcome {
    pub fn transaction_count(&self) -> usize {
        self.statements.iter().map(|s| s.transactions.len()).sum()
    }
}

pub struct DocumentParser {
    layout: Layout,
    policy: Box<dyn ContinuationPolicy>,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new(Layout::komercni_banka(), Box::new(KbContinuationPolicy))
    }
}

impl DocumentParser {
    pub fn new(layout: Layout, policy: Box<dyn ContinuationPolicy>) -> Self {
        Self { layout, policy }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Classification only, for layout debugging.
    pub fn classify_rows(&self, rows: &[RawRow]) -> Vec<ClassifiedRow> {
        classify_all(rows, &self.layout)
    }

    /// Parse all rows of one document.
    pub fn parse<I>(&self, document: &str, rows: I) -> Result<DocumentOutcome, DocumentError>
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut outcome = DocumentOutcome {
            document: document.to_string(),
            statements: Vec::new(),
            warnings: Vec::new(),
            stats: DocumentStats::default(),
        };
        let mut pages = BTreeSet::new();
        let mut segmenter = Segmenter::new();
        let mut prior = Role::Noise;

        for raw in rows {
            pages.insert(raw.page);
            let row = classify(&raw, prior, &self.layout);
            prior = row.role;
            outcome.stats.record_role(row.role);

            if let Some(event) = segmenter.push(row) {
                self.handle_event(event, &mut outcome);
            }
        }
        if let Some(event) = segmenter.finish() {
            self.handle_event(event, &mut outcome);
        }
        outcome.stats.pages = pages.len();

        for warning in &outcome.warnings {
            warn!("{}: {}", document, warning);
        }

        if outcome.statements.is_empty() {
            return Err(DocumentError::Unclassifiable {
                document: document.to_string(),
                warnings: outcome.warnings.len(),
            });
        }

        info!(
            "{}: {} statements, {} transactions from {} pages ({} warnings)",
            document,
            outcome.statements.len(),
            outcome.transaction_count(),
            outcome.stats.pages,
            outcome.warnings.len()
        );
        Ok(outcome)
    }

    fn handle_event(&self, event: SegmentEvent, outcome: &mut DocumentOutcome) {
        match event {
            SegmentEvent::Closed(segment) => {
                let (page, index) = segment.opened_at();
                match self.build_statement(&segment, outcome) {
                    Ok(statement) => {
                        debug!(
                            "Statement {} ({} transactions) closed at page {}, row {}",
                            statement.metadata.statement_number,
                            statement.transactions.len(),
                            segment.footer.row.page,
                            segment.footer.row.index
                        );
                        outcome.stats.record_statement(&statement);
                        outcome.statements.push(statement);
                    }
                    Err(reason) => {
                        outcome.stats.segments_dropped += 1;
                        outcome
                            .warnings
                            .push(ParseWarning::IncompleteSegment { page, index, reason });
                    }
                }
            }
            SegmentEvent::Incomplete {
                page,
                index,
                reason,
            } => {
                outcome.stats.segments_dropped += 1;
                outcome
                    .warnings
                    .push(ParseWarning::IncompleteSegment { page, index, reason });
            }
            SegmentEvent::Stray { page, index } => {
                outcome.stats.stray_rows += 1;
                warn!(
                    "{}: transaction line outside a statement (page {}, row {})",
                    outcome.document, page, index
                );
            }
        }
    }

    fn build_statement(
        &self,
        segment: &StatementSegment,
        outcome: &mut DocumentOutcome,
    ) -> Result<ParsedStatement, IncompleteReason> {
        let pending = metadata::extract(segment.metadata_rows(), &self.layout)?;
        let batch = transactions::parse(&segment.body, &self.layout, self.policy.as_ref());

        outcome.stats.rows_skipped += batch.warnings.len();
        outcome.warnings.extend(batch.warnings);

        Ok(ParsedStatement::new(
            StatementMetadata::from_pending(pending),
            batch.transactions,
        ))
    }
}
