//! Incremental writer for the `statements` and `statements_metadata` tables.
//!
//! Each document gets one slice per table, named after the document. Slices
//! are header-less; the column order lives in the table manifest.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vypis_ingest::ParsedStatement;

use crate::dedup::DedupIndex;
use crate::manifest::{TableSpec, write_manifest};

/// What to do with a record whose `pk` is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the stored record and drop the new one. Slices are appended to.
    #[default]
    Skip,
    /// Rewrite the document's slices with every record of the new parse.
    Overwrite,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub metadata_written: usize,
    pub metadata_skipped: usize,
    pub transactions_written: usize,
    pub transactions_skipped: usize,
}

impl WriteSummary {
    fn merge(&mut self, other: WriteSummary) {
        self.metadata_written += other.metadata_written;
        self.metadata_skipped += other.metadata_skipped;
        self.transactions_written += other.transactions_written;
        self.transactions_skipped += other.transactions_skipped;
    }
}

/// Writes parsed statements into sliced tables under one output directory.
///
/// Shared by reference between concurrent document workers. Distinct
/// documents write distinct slice files; the `pk` indexes are the only
/// shared state.
#[derive(Debug)]
pub struct IncrementalWriter {
    out_dir: PathBuf,
    policy: DuplicatePolicy,
    metadata_index: DedupIndex,
    transaction_index: DedupIndex,
}

impl IncrementalWriter {
    /// Creates the table directories and loads the `pk`s of existing slices.
    pub fn open(out_dir: impl Into<PathBuf>, policy: DuplicatePolicy) -> Result<Self> {
        let out_dir = out_dir.into();
        let writer = Self {
            out_dir,
            policy,
            metadata_index: DedupIndex::new(),
            transaction_index: DedupIndex::new(),
        };

        for (table, index) in writer.tables() {
            let dir = table.dir(&writer.out_dir);
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
            index.seed(existing_keys(&dir)?);
            debug!(table = table.name, known = index.len(), "seeded pk index");
        }

        Ok(writer)
    }

    fn tables(&self) -> [(&'static TableSpec, &DedupIndex); 2] {
        [
            (&TableSpec::STATEMENTS_METADATA, &self.metadata_index),
            (&TableSpec::STATEMENTS, &self.transaction_index),
        ]
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Known `pk`s per table: (metadata, transactions).
    pub fn known_keys(&self) -> (usize, usize) {
        (self.metadata_index.len(), self.transaction_index.len())
    }

    /// Writes every statement of one document. Safe to call concurrently for
    /// different document names.
    pub fn write_document(&self, document: &str, statements: &[ParsedStatement]) -> Result<WriteSummary> {
        let mut summary = WriteSummary::default();

        let metadata: Vec<(String, Vec<String>)> = statements
            .iter()
            .map(|s| (s.metadata.pk.clone(), s.metadata.to_record()))
            .collect();
        let (written, skipped) =
            self.write_slice(&TableSpec::STATEMENTS_METADATA, &self.metadata_index, document, metadata)?;
        summary.merge(WriteSummary {
            metadata_written: written,
            metadata_skipped: skipped,
            ..Default::default()
        });

        let transactions: Vec<(String, Vec<String>)> = statements
            .iter()
            .flat_map(|s| s.transactions.iter())
            .map(|t| (t.pk.clone(), t.to_record()))
            .collect();
        let (written, skipped) =
            self.write_slice(&TableSpec::STATEMENTS, &self.transaction_index, document, transactions)?;
        summary.merge(WriteSummary {
            transactions_written: written,
            transactions_skipped: skipped,
            ..Default::default()
        });

        info!(
            document,
            metadata = summary.metadata_written,
            transactions = summary.transactions_written,
            skipped = summary.metadata_skipped + summary.transactions_skipped,
            "wrote slices"
        );
        Ok(summary)
    }

    fn write_slice(
        &self,
        table: &TableSpec,
        index: &DedupIndex,
        document: &str,
        records: Vec<(String, Vec<String>)>,
    ) -> Result<(usize, usize)> {
        let path = table.slice_path(&self.out_dir, document);

        let (fresh, skipped) = match self.policy {
            DuplicatePolicy::Skip => {
                let total = records.len();
                let fresh: Vec<Vec<String>> = records
                    .into_iter()
                    .filter(|(pk, _)| index.insert_if_absent(pk))
                    .map(|(_, record)| record)
                    .collect();
                let skipped = total - fresh.len();
                (fresh, skipped)
            }
            DuplicatePolicy::Overwrite => {
                for (pk, _) in &records {
                    index.insert_if_absent(pk);
                }
                (records.into_iter().map(|(_, record)| record).collect(), 0)
            }
        };

        if fresh.is_empty() && self.policy == DuplicatePolicy::Skip {
            return Ok((0, skipped));
        }

        let file = match self.policy {
            DuplicatePolicy::Skip => OpenOptions::new().create(true).append(true).open(&path),
            DuplicatePolicy::Overwrite => File::create(&path),
        }
        .with_context(|| format!("open {}", path.display()))?;

        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        for record in &fresh {
            wtr.write_record(record)
                .with_context(|| format!("write {}", path.display()))?;
        }
        wtr.flush().with_context(|| format!("flush {}", path.display()))?;

        Ok((fresh.len(), skipped))
    }

    /// Writes both table manifests. Call once, after at least one document
    /// was written.
    pub fn write_manifests(&self) -> Result<Vec<PathBuf>> {
        self.tables()
            .into_iter()
            .map(|(table, _)| write_manifest(table, &self.out_dir))
            .collect()
    }
}

/// First column of every `.csv` slice in `dir`.
fn existing_keys(dir: &Path) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("open {}", path.display()))?;
        for result in rdr.records() {
            let record = result.with_context(|| format!("read {}", path.display()))?;
            if let Some(pk) = record.get(0).filter(|pk| !pk.is_empty()) {
                keys.push(pk.to_string());
            }
        }
    }
    Ok(keys)
}
