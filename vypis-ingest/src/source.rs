//! Loading raw row dumps produced by the table extraction step.
//!
//! Two formats are accepted:
//! - JSON: `[{"page": 1, "index": 0, "cells": ["...", "..."]}, ...]`
//! - CSV without header: `page,index,cell0,cell1,...` (rows may differ in width)

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use vypis_core::RawRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    Json,
    Csv,
}

impl DumpFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

pub fn read_json_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    serde_json::from_reader(reader).context("parsing JSON row dump")
}

pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let page: u32 = record
            .get(0)
            .unwrap_or("")
            .trim()
            .parse()
            .with_context(|| format!("line {}: invalid page number", line + 1))?;
        let index: u32 = record
            .get(1)
            .unwrap_or("")
            .trim()
            .parse()
            .with_context(|| format!("line {}: invalid row index", line + 1))?;
        let cells = record.iter().skip(2).map(str::to_string).collect();
        rows.push(RawRow::new(page, index, cells));
    }
    Ok(rows)
}

/// Load one dump file, picking the format from its extension.
pub fn load_rows(path: impl AsRef<Path>) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    let format = match DumpFormat::from_path(path) {
        Some(format) => format,
        None => bail!("unsupported row dump {} (expected .json or .csv)", path.display()),
    };
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let rows = match format {
        DumpFormat::Json => read_json_rows(file),
        DumpFormat::Csv => read_csv_rows(file),
    };
    rows.with_context(|| format!("reading {}", path.display()))
}

/// Expand inputs into dump files; directories are scanned one level deep.
/// The result is sorted so runs are reproducible.
pub fn discover(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in fs::read_dir(input).with_context(|| format!("listing {}", input.display()))? {
                let path = entry?.path();
                if path.is_file() && DumpFormat::from_path(&path).is_some() {
                    files.push(path);
                }
            }
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            bail!("input not found: {}", input.display());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Document name used for output slices: the file stem.
pub fn document_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
