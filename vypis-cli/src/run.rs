//! `vypis parse`: documents in parallel, one blocking task per document.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};
use vypis_export::{DuplicatePolicy, IncrementalWriter, WriteSummary};
use vypis_ingest::source::{discover, document_name, load_rows};
use vypis_ingest::{DocumentParser, DocumentStats, Layout, policy_by_name};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub inputs: Vec<PathBuf>,
    pub out_dir: PathBuf,
    pub workers: usize,
    pub duplicate_policy: DuplicatePolicy,
    pub layout: String,
    pub continuation: String,
}

#[derive(Debug)]
pub struct DocumentReport {
    pub document: String,
    pub statements: usize,
    pub transactions: usize,
    pub warnings: usize,
    pub stats: DocumentStats,
    pub written: WriteSummary,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub documents: Vec<DocumentReport>,
    pub failures: Vec<(String, String)>,
    pub manifests: Vec<PathBuf>,
}

pub fn build_parser(layout: &str, continuation: &str) -> Result<DocumentParser> {
    let Some(layout) = Layout::by_name(layout) else {
        bail!("unknown layout '{}' (known: kb)", layout);
    };
    let Some(policy) = policy_by_name(continuation) else {
        bail!(
            "unknown continuation policy '{}' (known: kb, description)",
            continuation
        );
    };
    Ok(DocumentParser::new(layout, policy))
}

/// Load, parse and write one document. Runs on a blocking thread.
fn process_document(
    path: &Path,
    parser: &DocumentParser,
    writer: &IncrementalWriter,
) -> Result<DocumentReport> {
    let document = document_name(path);
    let rows = load_rows(path)?;
    let outcome = parser.parse(&document, rows)?;
    let written = writer
        .write_document(&outcome.document, &outcome.statements)
        .with_context(|| format!("writing {}", document))?;

    Ok(DocumentReport {
        statements: outcome.statements.len(),
        transactions: outcome.transaction_count(),
        warnings: outcome.warnings.len(),
        stats: outcome.stats,
        document,
        written,
    })
}

/// Slices are named after the document, so two inputs may not share a stem.
fn check_unique_names(files: &[PathBuf]) -> Result<()> {
    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    for path in files {
        if let Some(first) = seen.insert(document_name(path), path) {
            bail!(
                "{} and {} map to the same document name",
                first.display(),
                path.display()
            );
        }
    }
    Ok(())
}

pub async fn run_parse(opts: RunOptions) -> Result<RunReport> {
    let files = discover(&opts.inputs)?;
    if files.is_empty() {
        bail!("no .json or .csv row dumps found in the given inputs");
    }
    check_unique_names(&files)?;

    let parser = Arc::new(build_parser(&opts.layout, &opts.continuation)?);
    let writer = Arc::new(IncrementalWriter::open(&opts.out_dir, opts.duplicate_policy)?);
    let workers = opts.workers.max(1);
    let semaphore = Arc::new(Semaphore::new(workers));

    info!(
        "Parsing {} documents with {} workers (layout {}, continuation {}, duplicates {})",
        files.len(),
        workers,
        parser.layout().name,
        parser.policy_name(),
        opts.duplicate_policy.as_str()
    );

    let mut tasks = JoinSet::new();
    for path in files {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .context("worker pool closed")?;
        let parser = Arc::clone(&parser);
        let writer = Arc::clone(&writer);
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let result = process_document(&path, &parser, &writer);
            (document_name(&path), result)
        });
    }

    let mut report = RunReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(doc))) => report.documents.push(doc),
            Ok((document, Err(e))) => {
                error!("{}: {:#}", document, e);
                report.failures.push((document, format!("{:#}", e)));
            }
            Err(e) => {
                error!("worker task failed: {}", e);
                report.failures.push(("<task>".to_string(), e.to_string()));
            }
        }
    }
    report.documents.sort_by(|a, b| a.document.cmp(&b.document));
    report.failures.sort();

    if !report.documents.is_empty() {
        report.manifests = writer.write_manifests()?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("vypis-ingest")
            .join("tests")
            .join("fixtures")
    }

    fn options(inputs: Vec<PathBuf>, out_dir: &Path) -> RunOptions {
        RunOptions {
            inputs,
            out_dir: out_dir.to_path_buf(),
            workers: 2,
            duplicate_policy: DuplicatePolicy::Skip,
            layout: "kb".to_string(),
            continuation: "kb".to_string(),
        }
    }

    #[test]
    fn test_build_parser_rejects_unknown_names() {
        assert!(build_parser("kb", "description").is_ok());
        assert!(build_parser("csob", "kb").is_err());
        assert!(build_parser("kb", "guess").is_err());
    }

    #[test]
    fn test_duplicate_document_names_rejected() {
        let files = vec![PathBuf::from("a/jan.json"), PathBuf::from("b/jan.csv")];
        assert!(check_unique_names(&files).is_err());
        assert!(check_unique_names(&files[..1]).is_ok());
    }

    #[tokio::test]
    async fn test_run_parse_writes_tables_and_manifests() {
        let out = tempfile::tempdir().unwrap();
        let report = run_parse(options(vec![fixture_dir()], out.path()))
            .await
            .unwrap();

        assert!(report.failures.is_empty());
        assert_eq!(report.documents.len(), 1);
        let doc = &report.documents[0];
        assert_eq!(doc.statements, 2);
        assert_eq!(doc.transactions, 6);
        assert_eq!(doc.written.transactions_written, 6);
        assert_eq!(report.manifests.len(), 2);
        assert!(out.path().join("statements.csv.manifest").is_file());
        assert!(out.path().join("statements_metadata.csv.manifest").is_file());
    }

    #[tokio::test]
    async fn test_failed_document_does_not_abort_siblings() {
        let inputs = tempfile::tempdir().unwrap();
        let good = fixture_dir().join("kb_two_statements.json");
        std::fs::copy(&good, inputs.path().join("good.json")).unwrap();
        std::fs::write(inputs.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(
            inputs.path().join("foreign.json"),
            r#"[{"page":1,"index":0,"cells":["Account statement","ACME Bank"]}]"#,
        )
        .unwrap();

        let out = tempfile::tempdir().unwrap();
        let report = run_parse(options(vec![inputs.path().to_path_buf()], out.path()))
            .await
            .unwrap();

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].document, "good");
        let failed: Vec<&str> = report.failures.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(failed, vec!["broken", "foreign"]);
    }

    #[tokio::test]
    async fn test_no_manifests_when_nothing_parsed() {
        let inputs = tempfile::tempdir().unwrap();
        std::fs::write(inputs.path().join("broken.json"), "[]").unwrap();

        let out = tempfile::tempdir().unwrap();
        let report = run_parse(options(vec![inputs.path().to_path_buf()], out.path()))
            .await
            .unwrap();

        assert!(report.documents.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(report.manifests.is_empty());
        assert!(!out.path().join("statements.csv.manifest").exists());
    }
}
