use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::report::ReportConfig;
use crate::results::{AnalysisResults, NamedSeries};

pub fn export_to_json<T: serde::Serialize>(data: &T, path: &Path) -> Result<()> {
    let file = File::create(path).context("Failed to create output JSON file")?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, data).context("Failed to serialize data to JSON")
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn import_from_json(path: &Path) -> Result<AnalysisResults> {
    read_json(path).context("Failed to deserialize analysis results from JSON")
}

pub fn load_report_config(path: &Path) -> Result<ReportConfig> {
    read_json(path).context("Failed to load report configuration")
}

/// Loads one weight table per results file, named after the file stem.
pub fn load_series(paths: &[impl AsRef<Path>], key: &str) -> Result<Vec<NamedSeries>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let results = import_from_json(path)?;
            let values = results
                .table(key)
                .cloned()
                .with_context(|| format!("{} has no '{}' section", path.display(), key))?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(NamedSeries::new(name, values))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_results_json_roundtrip_keeps_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        fs::write(&path, r#"{"keywords": {"乙": 0.2, "甲": 0.9}}"#).unwrap();

        let results = import_from_json(&path).unwrap();
        let out = dir.path().join("copy.json");
        export_to_json(&results, &out).unwrap();

        let again = import_from_json(&out).unwrap();
        let keys: Vec<_> = again.keywords.as_ref().unwrap().keys().collect();
        assert_eq!(keys, vec!["乙", "甲"]);
    }

    #[test]
    fn test_load_series_names_by_stem_and_requires_key() {
        let dir = TempDir::new().unwrap();
        let jan = dir.path().join("2024-01.json");
        let feb = dir.path().join("2024-02.json");
        fs::write(&jan, r#"{"word_frequency": {"經濟": 3}}"#).unwrap();
        fs::write(&feb, r#"{"keywords": {"經濟": 0.5}}"#).unwrap();

        let series = load_series(&[&jan], "word_frequency").unwrap();
        assert_eq!(series[0].name, "2024-01");
        assert_eq!(series[0].values.get("經濟"), Some(&3.0));

        assert!(load_series(&[&jan, &feb], "word_frequency").is_err());
    }

    #[test]
    fn test_missing_results_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(import_from_json(&dir.path().join("absent.json")).is_err());
    }
}
