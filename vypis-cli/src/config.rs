use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vypis_export::DuplicatePolicy;

pub const DEFAULT_CONFIG_FILE: &str = "vypis.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputSection,
    pub parse: ParseSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Root of the sliced tables and manifests.
    pub dir: PathBuf,
    /// `skip` keeps already stored records, `overwrite` rewrites the document's slices.
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseSection {
    /// Documents parsed at once.
    pub workers: usize,
    /// Bank layout name (`kb`).
    pub layout: String,
    /// Continuation policy name (`kb` or `description`).
    pub continuation: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("out"),
            duplicate_policy: DuplicatePolicy::Skip,
        }
    }
}

impl Default for ParseSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            layout: "kb".to_string(),
            continuation: "kb".to_string(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save_config(cfg: &Config, path: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    save_config(&Config::default(), path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.parse.layout, "kb");
        assert!(cfg.parse.workers >= 1);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vypis.toml");
        fs::write(&path, "[output]\nduplicate_policy = \"overwrite\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.output.duplicate_policy, DuplicatePolicy::Overwrite);
        assert_eq!(cfg.output.dir, PathBuf::from("out"));
        assert_eq!(cfg.parse.continuation, "kb");
    }

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vypis.toml");
        init_config(&path).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg, Config::default());

        // Second init leaves the file alone.
        fs::write(&path, "[parse]\nworkers = 2\n").unwrap();
        init_config(&path).unwrap();
        assert_eq!(load_config(&path).unwrap().parse.workers, 2);
    }

    #[test]
    fn test_bad_policy_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vypis.toml");
        fs::write(&path, "[output]\nduplicate_policy = \"merge\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
