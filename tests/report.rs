//! Report assembly tests.
//!
//! A recording painter stands in for plotters so these tests exercise chart
//! selection, naming and failure isolation without needing system fonts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use zh_insights::charts::{Chart, ChartKind};
use zh_insights::error::RenderFailure;
use zh_insights::labels::{LabelStore, LabelTables};
use zh_insights::report::{ChartStatus, ReportAssembler, ReportConfig};
use zh_insights::results::{AnalysisResults, NamedSeries, WeightTable};
use zh_insights::visualizer::{ChartPainter, PaintOutcome};

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingPainter {
    painted: Mutex<Vec<(PathBuf, Chart)>>,
    fail_titles: Vec<String>,
    degrade_titles: Vec<String>,
}

impl RecordingPainter {
    fn failing_on(title: &str) -> Self {
        Self {
            fail_titles: vec![title.to_string()],
            ..Self::default()
        }
    }

    fn degrading_on(title: &str) -> Self {
        Self {
            degrade_titles: vec![title.to_string()],
            ..Self::default()
        }
    }
}

impl ChartPainter for RecordingPainter {
    fn paint(&self, chart: &Chart, output_path: &Path) -> Result<PaintOutcome, RenderFailure> {
        if self.fail_titles.iter().any(|t| t == chart.title()) {
            return Err(RenderFailure::Write {
                path: output_path.to_path_buf(),
                reason: "simulated backend failure".to_string(),
            });
        }
        fs::write(output_path, chart.title()).map_err(|e| RenderFailure::Write {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.painted
            .lock()
            .unwrap()
            .push((output_path.to_path_buf(), chart.clone()));

        if self.degrade_titles.iter().any(|t| t == chart.title()) {
            Ok(PaintOutcome::Degraded {
                reason: "no such family".to_string(),
            })
        } else {
            Ok(PaintOutcome::Rendered)
        }
    }
}

fn full_results() -> AnalysisResults {
    serde_json::from_str(
        r#"{
            "word_frequency": {"經濟": 12, "發展": 9, "中國": 9},
            "pos_frequency": {"n": 40, "v": 22, "unknown": 1},
            "sentiment": {"positive_count": 5, "negative_count": 2, "sentiment_label": "neutral"},
            "ngrams": {"經濟 發展": 4, "發展 中國": 2},
            "entities": {"person": [], "location": ["北京", "上海"]},
            "keywords": {"經濟": 0.8123, "發展": 0.5}
        }"#,
    )
    .unwrap()
}

fn png_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".png"))
        .collect();
    names.sort();
    names
}

fn order(summary: &zh_insights::ReportSummary) -> Vec<ChartKind> {
    summary.entries.iter().map(|e| e.kind).collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn test_word_frequency_only_produces_two_files() {
    let dir = TempDir::new().unwrap();
    let results: AnalysisResults =
        serde_json::from_str(r#"{"word_frequency": {"你好": 3, "世界": 1}}"#).unwrap();

    let assembler = ReportAssembler::new(
        ReportConfig::default(),
        LabelTables::builtin(),
        RecordingPainter::default(),
    );
    let summary = assembler.assemble(&results, dir.path(), "");

    assert_eq!(png_files(dir.path()), vec!["word_frequency.png", "wordcloud.png"]);
    assert_eq!(order(&summary), vec![ChartKind::WordFrequency, ChartKind::WordCloud]);
    assert!(summary.is_complete());
}

#[test]
fn test_full_bundle_follows_fixed_order() {
    let dir = TempDir::new().unwrap();
    let assembler = ReportAssembler::new(
        ReportConfig::default(),
        LabelTables::builtin(),
        RecordingPainter::default(),
    );
    let summary = assembler.assemble(&full_results(), dir.path(), "doc");

    assert_eq!(order(&summary), ChartKind::REPORT_ORDER.to_vec());
    assert_eq!(summary.succeeded().count(), 7);
    assert_eq!(
        png_files(dir.path()),
        vec![
            "doc_entities.png",
            "doc_keywords.png",
            "doc_ngrams.png",
            "doc_pos_distribution.png",
            "doc_sentiment.png",
            "doc_word_frequency.png",
            "doc_wordcloud.png",
        ]
    );
}

#[test]
fn test_parallel_mode_keeps_order() {
    let dir = TempDir::new().unwrap();
    let config = ReportConfig {
        parallel: true,
        ..ReportConfig::default()
    };
    let assembler = ReportAssembler::new(config, LabelTables::builtin(), RecordingPainter::default());
    let summary = assembler.assemble(&full_results(), dir.path(), "");

    assert_eq!(order(&summary), ChartKind::REPORT_ORDER.to_vec());
    assert_eq!(png_files(dir.path()).len(), 7);
}

#[test]
fn test_one_failure_does_not_stop_the_rest() {
    let dir = TempDir::new().unwrap();
    let assembler = ReportAssembler::new(
        ReportConfig::default(),
        LabelTables::builtin(),
        RecordingPainter::failing_on("詞性分布"),
    );
    let summary = assembler.assemble(&full_results(), dir.path(), "");

    let failed: Vec<_> = summary.failed().map(|(kind, _)| kind).collect();
    assert_eq!(failed, vec![ChartKind::PosDistribution]);
    assert!(!summary.is_complete());
    assert_eq!(summary.succeeded().count(), 6);
    assert!(dir.path().join("keywords.png").exists());
    assert!(!dir.path().join("pos_distribution.png").exists());
}

#[test]
fn test_font_degradation_is_not_a_failure() {
    let dir = TempDir::new().unwrap();
    let assembler = ReportAssembler::new(
        ReportConfig::default(),
        LabelTables::builtin(),
        RecordingPainter::degrading_on("詞雲圖"),
    );
    let summary = assembler.assemble(&full_results(), dir.path(), "");

    assert!(summary.is_complete());
    assert!(matches!(
        summary.status_of(ChartKind::WordCloud),
        Some(ChartStatus::Degraded { .. })
    ));
    assert!(dir.path().join("wordcloud.png").exists());
}

#[test]
fn test_empty_entities_are_skipped_without_a_file() {
    let dir = TempDir::new().unwrap();
    let results: AnalysisResults =
        serde_json::from_str(r#"{"entities": {"person": [], "organization": []}}"#).unwrap();
    let assembler = ReportAssembler::new(
        ReportConfig::default(),
        LabelTables::builtin(),
        RecordingPainter::default(),
    );
    let summary = assembler.assemble(&results, dir.path(), "");

    assert!(matches!(
        summary.status_of(ChartKind::Entities),
        Some(ChartStatus::Skipped { .. })
    ));
    assert!(png_files(dir.path()).is_empty());
    assert!(summary.is_complete());
}

#[test]
fn test_unwritable_output_dir_fails_every_chart() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("taken");
    fs::write(&blocker, b"file, not dir").unwrap();

    let results: AnalysisResults =
        serde_json::from_str(r#"{"keywords": {"a": 0.5}, "ngrams": {"a b": 2}}"#).unwrap();
    let assembler = ReportAssembler::new(
        ReportConfig::default(),
        LabelTables::builtin(),
        RecordingPainter::default(),
    );
    let summary = assembler.assemble(&results, &blocker.join("charts"), "");

    assert_eq!(summary.failed().count(), 2);
    assert_eq!(summary.succeeded().count(), 0);
}

#[test]
fn test_charts_use_injected_labels() {
    let dir = TempDir::new().unwrap();
    let labels_dir = TempDir::new().unwrap();
    fs::write(labels_dir.path().join("pos.json"), r#"{"n": "NOUN"}"#).unwrap();
    fs::write(labels_dir.path().join("entity.json"), r#"{"location": "PLACE"}"#).unwrap();

    let store = LabelStore::from_dir(labels_dir.path());
    let painter = RecordingPainter::default();
    let assembler = ReportAssembler::new(ReportConfig::default(), store.current(), painter);
    assembler.assemble(&full_results(), dir.path(), "");

    let pos = assembler.project(&full_results(), ChartKind::PosDistribution).unwrap();
    match pos.chart() {
        Some(Chart::Bar(bars)) => assert_eq!(bars.labels(), vec!["NOUN", "v", "unknown"]),
        other => panic!("unexpected projection {:?}", other),
    }

    let entities = assembler.project(&full_results(), ChartKind::Entities).unwrap();
    match entities.chart() {
        Some(Chart::Pie(pie)) => assert_eq!(pie.slices, vec![("PLACE".to_string(), 2.0)]),
        other => panic!("unexpected projection {:?}", other),
    }
}

#[test]
fn test_reloaded_labels_reach_the_assembler() {
    let labels_dir = TempDir::new().unwrap();
    fs::write(labels_dir.path().join("pos.json"), r#"{"n": "old"}"#).unwrap();
    let store = LabelStore::from_dir(labels_dir.path());

    let mut assembler =
        ReportAssembler::new(ReportConfig::default(), store.current(), RecordingPainter::default());

    fs::write(labels_dir.path().join("pos.json"), r#"{"n": "new"}"#).unwrap();
    store.reload();
    assembler.set_labels(store.current());

    let projection = assembler.project(&full_results(), ChartKind::PosDistribution).unwrap();
    match projection.chart() {
        Some(Chart::Bar(bars)) => assert_eq!(bars.bars[0].label, "new"),
        other => panic!("unexpected projection {:?}", other),
    }
}

#[test]
fn test_assembly_does_not_mutate_results() {
    let dir = TempDir::new().unwrap();
    let results = full_results();
    let before = serde_json::to_string(&results).unwrap();

    let assembler = ReportAssembler::new(
        ReportConfig::default(),
        Arc::new(LabelTables::builtin()),
        RecordingPainter::default(),
    );
    assembler.assemble(&results, dir.path(), "");

    assert_eq!(serde_json::to_string(&results).unwrap(), before);
}

#[test]
fn test_compare_and_trend_write_single_files() {
    let dir = TempDir::new().unwrap();
    let jan: WeightTable = [("經濟", 3.0), ("發展", 1.0)].into_iter().collect();
    let feb: WeightTable = [("發展", 4.0), ("改革", 2.0)].into_iter().collect();
    let series = vec![NamedSeries::new("一月", jan), NamedSeries::new("二月", feb)];

    let assembler = ReportAssembler::new(
        ReportConfig::default(),
        LabelTables::builtin(),
        RecordingPainter::default(),
    );

    let heatmap = assembler.compare(&series, &dir.path().join("heatmap.png"));
    match &heatmap.status {
        ChartStatus::Rendered { path } => assert!(path.exists()),
        other => panic!("unexpected status {:?}", other),
    }

    let trend = assembler.trend(&series, &dir.path().join("trend.png"));
    assert!(trend.path().is_some());

    let empty = assembler.trend(&[], &dir.path().join("empty.png"));
    assert!(matches!(empty.status, ChartStatus::Skipped { .. }));
    assert!(!dir.path().join("empty.png").exists());
}
