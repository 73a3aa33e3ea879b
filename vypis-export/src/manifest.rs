//! Sliced table declarations and their manifest files.
//!
//! A sliced table is a directory of header-less CSV slices plus a
//! `<table>.manifest` JSON file naming the columns.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vypis_core::{StatementMetadata, TransactionRow};

/// Output table: directory name, column order and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub primary_key: &'static [&'static str],
}

impl TableSpec {
    pub const STATEMENTS: TableSpec = TableSpec {
        name: "statements.csv",
        columns: &TransactionRow::COLUMNS,
        primary_key: &["pk"],
    };

    pub const STATEMENTS_METADATA: TableSpec = TableSpec {
        name: "statements_metadata.csv",
        columns: &StatementMetadata::COLUMNS,
        primary_key: &["pk"],
    };

    /// Directory holding the slices.
    pub fn dir(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(self.name)
    }

    pub fn slice_path(&self, out_dir: &Path, document: &str) -> PathBuf {
        self.dir(out_dir).join(format!("{document}.csv"))
    }

    pub fn manifest_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}.manifest", self.name))
    }

    pub fn manifest(&self) -> TableManifest {
        TableManifest {
            columns: self.columns.iter().map(|c| c.to_string()).collect(),
            incremental: true,
            primary_key: self.primary_key.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableManifest {
    pub columns: Vec<String>,
    pub incremental: bool,
    pub primary_key: Vec<String>,
}

pub fn write_manifest(table: &TableSpec, out_dir: &Path) -> Result<PathBuf> {
    let path = table.manifest_path(out_dir);
    let json = serde_json::to_string_pretty(&table.manifest()).context("serialize manifest")?;
    fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
