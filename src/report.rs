//! Report assembly: decide which charts a results bundle supports, render
//! each one independently and collect a per-chart status.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::charts::{self, ChartKind, ChartSpec, Projection, ValueFormat};
use crate::error::RenderFailure;
use crate::labels::LabelTables;
use crate::results::{AnalysisResults, NamedSeries};
use crate::visualizer::{ChartPainter, PaintOutcome};

/// Partial override of a chart kind's default [`ChartSpec`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOverride {
    pub title: Option<String>,
    pub top_n: Option<usize>,
    pub size: Option<(u32, u32)>,
    pub value_format: Option<ValueFormat>,
    pub max_words: Option<usize>,
}

/// Report configuration, usually read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Preferred font family; unusable fonts degrade to the default family.
    pub font_family: Option<String>,
    /// Render charts on the rayon pool instead of one after another.
    pub parallel: bool,
    pub charts: HashMap<ChartKind, ChartOverride>,
}

impl ReportConfig {
    pub fn spec_for(&self, kind: ChartKind) -> ChartSpec {
        let mut spec = ChartSpec::for_kind(kind);
        if let Some(o) = self.charts.get(&kind) {
            if let Some(title) = &o.title {
                spec.title = title.clone();
            }
            if o.top_n.is_some() {
                spec.top_n = o.top_n;
            }
            if let Some(size) = o.size {
                spec.size = size;
            }
            if let Some(format) = o.value_format {
                spec.value_format = format;
            }
            if let Some(max_words) = o.max_words {
                spec.max_words = max_words;
            }
        }
        spec
    }
}

/// Final state of one chart in a report.
#[derive(Debug)]
pub enum ChartStatus {
    Rendered { path: PathBuf },
    /// Written, but without the preferred font.
    Degraded { path: PathBuf, reason: String },
    /// Nothing drawable in the input; no file was written.
    Skipped { reason: String },
    Failed { error: RenderFailure },
}

#[derive(Debug)]
pub struct ChartEntry {
    pub kind: ChartKind,
    pub status: ChartStatus,
}

impl ChartEntry {
    pub fn path(&self) -> Option<&Path> {
        match &self.status {
            ChartStatus::Rendered { path } | ChartStatus::Degraded { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }
}

/// Outcome of a whole report; partial success is normal.
#[derive(Debug)]
pub struct ReportSummary {
    pub out_dir: PathBuf,
    pub entries: Vec<ChartEntry>,
}

impl ReportSummary {
    /// Charts that produced a file, degraded or not.
    pub fn succeeded(&self) -> impl Iterator<Item = &ChartEntry> {
        self.entries.iter().filter(|e| e.path().is_some())
    }

    pub fn failed(&self) -> impl Iterator<Item = (ChartKind, &RenderFailure)> {
        self.entries.iter().filter_map(|e| match &e.status {
            ChartStatus::Failed { error } => Some((e.kind, error)),
            _ => None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn status_of(&self, kind: ChartKind) -> Option<&ChartStatus> {
        self.entries.iter().find(|e| e.kind == kind).map(|e| &e.status)
    }
}

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[/\\:*?"<>|]"#).expect("static pattern is valid")
});

/// Makes a prefix filename-safe and joins it to chart names with `_`.
pub fn normalize_prefix(prefix: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(prefix.trim(), "_");
    if cleaned.is_empty() || cleaned.ends_with('_') {
        cleaned.into_owned()
    } else {
        format!("{}_", cleaned)
    }
}

pub fn chart_file_name(prefix: &str, kind: ChartKind) -> String {
    format!("{}{}.png", prefix, kind.chart_name())
}

pub struct ReportAssembler<P: ChartPainter> {
    config: ReportConfig,
    labels: Arc<LabelTables>,
    painter: P,
}

impl<P: ChartPainter> ReportAssembler<P> {
    pub fn new(config: ReportConfig, labels: impl Into<Arc<LabelTables>>, painter: P) -> Self {
        Self {
            config,
            labels: labels.into(),
            painter,
        }
    }

    /// Swaps in a fresh label snapshot, e.g. after [`crate::LabelStore::reload`].
    pub fn set_labels(&mut self, labels: Arc<LabelTables>) {
        self.labels = labels;
    }

    /// Projects data for `kind`, or `None` when its input key is absent.
    pub fn project(&self, results: &AnalysisResults, kind: ChartKind) -> Option<Projection> {
        let spec = self.config.spec_for(kind);
        let projection = match kind {
            ChartKind::WordFrequency | ChartKind::Ngrams | ChartKind::Keywords => {
                let key = match kind {
                    ChartKind::WordFrequency => "word_frequency",
                    ChartKind::Ngrams => "ngrams",
                    _ => "keywords",
                };
                charts::ranked_bars(results.table(key)?, &spec)
            }
            ChartKind::WordCloud => charts::word_cloud(results.word_frequency.as_ref()?, &spec),
            ChartKind::PosDistribution => {
                charts::pos_distribution(results.pos_frequency.as_ref()?, &spec, &self.labels)
            }
            ChartKind::Sentiment => {
                charts::sentiment_summary(results.sentiment.as_ref()?, &spec, &self.labels)
            }
            ChartKind::Entities => {
                charts::entity_distribution(results.entities.as_ref()?, &spec, &self.labels)
            }
            ChartKind::ComparisonHeatmap | ChartKind::TrendLine => return None,
        };
        Some(projection)
    }

    fn render(&self, projection: Projection, path: PathBuf) -> ChartStatus {
        let chart = match projection {
            Projection::Chart(chart) => chart,
            Projection::NothingToRender(reason) => return ChartStatus::Skipped { reason },
        };
        match self.painter.paint(&chart, &path) {
            Ok(PaintOutcome::Rendered) => ChartStatus::Rendered { path },
            Ok(PaintOutcome::Degraded { reason }) => ChartStatus::Degraded { path, reason },
            Err(error) => ChartStatus::Failed { error },
        }
    }

    fn render_kind(&self, results: &AnalysisResults, kind: ChartKind, out_dir: &Path, prefix: &str) -> Option<ChartEntry> {
        let projection = self.project(results, kind)?;
        let path = out_dir.join(chart_file_name(prefix, kind));
        let status = self.render(projection, path);
        match &status {
            ChartStatus::Failed { error } => warn!("{} chart failed: {}", kind.chart_name(), error),
            ChartStatus::Skipped { reason } => info!("{} chart skipped: {}", kind.chart_name(), reason),
            _ => {}
        }
        Some(ChartEntry { kind, status })
    }

    /// Renders every chart the bundle has data for into `out_dir`.
    ///
    /// Charts are independent: one failing never stops the rest. The
    /// returned entries follow [`ChartKind::REPORT_ORDER`].
    pub fn assemble(&self, results: &AnalysisResults, out_dir: &Path, prefix: &str) -> ReportSummary {
        if let Err(e) = fs::create_dir_all(out_dir) {
            // Each chart retries and reports the failure against itself.
            warn!("Cannot create {}: {}", out_dir.display(), e);
        }
        let prefix = normalize_prefix(prefix);

        let entries: Vec<ChartEntry> = if self.config.parallel {
            ChartKind::REPORT_ORDER
                .par_iter()
                .filter_map(|kind| self.render_kind(results, *kind, out_dir, &prefix))
                .collect()
        } else {
            ChartKind::REPORT_ORDER
                .iter()
                .filter_map(|kind| self.render_kind(results, *kind, out_dir, &prefix))
                .collect()
        };

        info!(
            "Report in {}: {} of {} charts written",
            out_dir.display(),
            entries.iter().filter(|e| e.path().is_some()).count(),
            entries.len()
        );

        ReportSummary {
            out_dir: out_dir.to_path_buf(),
            entries,
        }
    }

    /// Cross-series heatmap of the top labels.
    pub fn compare(&self, series: &[NamedSeries], output_path: &Path) -> ChartEntry {
        let spec = self.config.spec_for(ChartKind::ComparisonHeatmap);
        ChartEntry {
            kind: ChartKind::ComparisonHeatmap,
            status: self.render(charts::comparison_heatmap(series, &spec), output_path.to_path_buf()),
        }
    }

    /// Per-label trend across the series, in the order given.
    pub fn trend(&self, series: &[NamedSeries], output_path: &Path) -> ChartEntry {
        let spec = self.config.spec_for(ChartKind::TrendLine);
        ChartEntry {
            kind: ChartKind::TrendLine,
            status: self.render(charts::trend_lines(series, &spec), output_path.to_path_buf()),
        }
    }
}
