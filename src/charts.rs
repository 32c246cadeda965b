//! Pure projections from analysis results to drawable chart descriptions.
//!
//! Nothing in here draws or touches the filesystem. Each function borrows
//! its input and returns a [`Projection`]; the painter turns the resulting
//! [`Chart`] into pixels.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::labels::{LabelMapping, LabelTables};
use crate::results::{NamedSeries, OrderedMap, SentimentSummary, WeightTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    WordFrequency,
    WordCloud,
    PosDistribution,
    Sentiment,
    Ngrams,
    Entities,
    Keywords,
    ComparisonHeatmap,
    TrendLine,
}

impl ChartKind {
    /// Charts produced by a report, in invocation order.
    pub const REPORT_ORDER: [ChartKind; 7] = [
        ChartKind::WordFrequency,
        ChartKind::WordCloud,
        ChartKind::PosDistribution,
        ChartKind::Sentiment,
        ChartKind::Ngrams,
        ChartKind::Entities,
        ChartKind::Keywords,
    ];

    /// File name (without prefix or extension) the chart is written under.
    pub fn chart_name(self) -> &'static str {
        match self {
            ChartKind::WordFrequency => "word_frequency",
            ChartKind::WordCloud => "wordcloud",
            ChartKind::PosDistribution => "pos_distribution",
            ChartKind::Sentiment => "sentiment",
            ChartKind::Ngrams => "ngrams",
            ChartKind::Entities => "entities",
            ChartKind::Keywords => "keywords",
            ChartKind::ComparisonHeatmap => "comparison_heatmap",
            ChartKind::TrendLine => "trend",
        }
    }
}

/// How magnitude labels next to bars are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    Count,
    Fixed3,
}

impl ValueFormat {
    pub fn format(self, value: f64) -> String {
        match self {
            ValueFormat::Fixed3 => format!("{:.3}", value),
            ValueFormat::Count if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", value as i64)
            }
            ValueFormat::Count => format!("{}", value),
        }
    }
}

/// Fixed rendering parameters for one chart kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub top_n: Option<usize>,
    pub size: (u32, u32),
    pub value_format: ValueFormat,
    pub x_desc: String,
    pub y_desc: String,
    /// Only used by the word cloud.
    pub max_words: usize,
}

impl ChartSpec {
    pub fn for_kind(kind: ChartKind) -> Self {
        let base = ChartSpec {
            title: String::new(),
            top_n: None,
            size: (1200, 600),
            value_format: ValueFormat::Count,
            x_desc: "頻率".to_string(),
            y_desc: String::new(),
            max_words: 200,
        };
        match kind {
            ChartKind::WordFrequency => ChartSpec {
                title: "詞頻統計".into(),
                top_n: Some(20),
                y_desc: "詞語".into(),
                ..base
            },
            ChartKind::WordCloud => ChartSpec {
                title: "詞雲圖".into(),
                size: (1000, 800),
                ..base
            },
            ChartKind::PosDistribution => ChartSpec {
                title: "詞性分布".into(),
                size: (1000, 600),
                y_desc: "詞性".into(),
                ..base
            },
            ChartKind::Sentiment => ChartSpec {
                title: "情感分析結果".into(),
                size: (800, 500),
                x_desc: String::new(),
                ..base
            },
            ChartKind::Ngrams => ChartSpec {
                title: "常見詞組".into(),
                top_n: Some(15),
                y_desc: "詞組".into(),
                ..base
            },
            ChartKind::Entities => ChartSpec {
                title: "命名實體統計".into(),
                size: (1200, 800),
                x_desc: String::new(),
                ..base
            },
            ChartKind::Keywords => ChartSpec {
                title: "關鍵詞權重".into(),
                top_n: Some(15),
                value_format: ValueFormat::Fixed3,
                x_desc: "權重".into(),
                y_desc: "關鍵詞".into(),
                ..base
            },
            ChartKind::ComparisonHeatmap => ChartSpec {
                title: "詞頻比較".into(),
                top_n: Some(20),
                size: (1200, 900),
                x_desc: "資料集".into(),
                y_desc: "詞語".into(),
                ..base
            },
            ChartKind::TrendLine => ChartSpec {
                title: "詞頻趨勢".into(),
                top_n: Some(8),
                size: (1200, 700),
                x_desc: "資料集".into(),
                y_desc: "頻率".into(),
                ..base
            },
        }
    }
}

/// RGB triple; kept free of any drawing crate.
pub type Rgb = [u8; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Labels on the vertical axis, largest entry on top.
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub display: String,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub orientation: Orientation,
    pub bars: Vec<Bar>,
    pub size: (u32, u32),
}

impl BarChart {
    pub fn values(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.value).collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.bars.iter().map(|b| b.label.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudChart {
    pub title: String,
    /// Title used when the preferred font cannot be used.
    pub fallback_title: String,
    pub words: Vec<(String, f64)>,
    pub size: (u32, u32),
}

impl CloudChart {
    pub fn title_for(&self, degraded: bool) -> &str {
        if degraded {
            &self.fallback_title
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieChart {
    pub title: String,
    pub slices: Vec<(String, f64)>,
    pub size: (u32, u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub columns: Vec<String>,
    pub rows: Vec<String>,
    /// `cells[row][column]`
    pub cells: Vec<Vec<f64>>,
    pub size: (u32, u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub points: Vec<String>,
    pub lines: Vec<(String, Vec<f64>)>,
    pub size: (u32, u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Bar(BarChart),
    Cloud(CloudChart),
    Pie(PieChart),
    Heatmap(HeatmapChart),
    Trend(TrendChart),
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::Bar(c) => &c.title,
            Chart::Cloud(c) => &c.title,
            Chart::Pie(c) => &c.title,
            Chart::Heatmap(c) => &c.title,
            Chart::Trend(c) => &c.title,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            Chart::Bar(c) => c.size,
            Chart::Cloud(c) => c.size,
            Chart::Pie(c) => c.size,
            Chart::Heatmap(c) => c.size,
            Chart::Trend(c) => c.size,
        }
    }
}

/// Result of projecting data for one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Chart(Chart),
    /// The input held nothing drawable; no file should be written.
    NothingToRender(String),
}

impl Projection {
    pub fn chart(&self) -> Option<&Chart> {
        match self {
            Projection::Chart(chart) => Some(chart),
            Projection::NothingToRender(_) => None,
        }
    }
}

/// Highest-valued entries first. Ties keep input order; `None` keeps all.
pub fn rank_top_n(table: &WeightTable, top_n: Option<usize>) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = table.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    if let Some(n) = top_n {
        ranked.truncate(n);
    }
    ranked
}

fn bars_from(entries: Vec<(String, f64)>, format: ValueFormat) -> Vec<Bar> {
    entries
        .into_iter()
        .map(|(label, value)| Bar {
            display: format.format(value),
            label,
            value,
            color: None,
        })
        .collect()
}

/// Frequency, n-gram and keyword bars share this projection.
pub fn ranked_bars(table: &WeightTable, spec: &ChartSpec) -> Projection {
    let ranked = rank_top_n(table, spec.top_n);
    if ranked.is_empty() {
        return Projection::NothingToRender(format!("{}: table is empty", spec.title));
    }
    Projection::Chart(Chart::Bar(BarChart {
        title: spec.title.clone(),
        x_desc: spec.x_desc.clone(),
        y_desc: spec.y_desc.clone(),
        orientation: Orientation::Horizontal,
        bars: bars_from(ranked, spec.value_format),
        size: spec.size,
    }))
}

pub fn word_cloud(table: &WeightTable, spec: &ChartSpec) -> Projection {
    let words: Vec<_> = rank_top_n(table, Some(spec.max_words))
        .into_iter()
        .filter(|(_, weight)| *weight > 0.0)
        .collect();
    if words.is_empty() {
        return Projection::NothingToRender(format!("{}: no positive weights", spec.title));
    }
    Projection::Chart(Chart::Cloud(CloudChart {
        title: spec.title.clone(),
        fallback_title: format!("{} (簡化版)", spec.title),
        words,
        size: spec.size,
    }))
}

/// Translates each tag for display. When two tags share a display label the
/// later value wins, at the position of the first.
pub fn translate_tags(table: &WeightTable, mapping: &LabelMapping) -> WeightTable {
    let mut translated = WeightTable::new();
    for (tag, value) in table.iter() {
        translated.insert(mapping.resolve(tag), *value);
    }
    translated
}

/// Bars follow the order the tags appear in; `top_n` only cuts the tail.
pub fn pos_distribution(table: &WeightTable, spec: &ChartSpec, labels: &LabelTables) -> Projection {
    let translated = translate_tags(table, &labels.pos);
    if translated.is_empty() {
        return Projection::NothingToRender(format!("{}: table is empty", spec.title));
    }
    let limit = spec.top_n.unwrap_or(usize::MAX);
    let entries: Vec<(String, f64)> = translated
        .iter()
        .take(limit)
        .map(|(label, value)| (label.to_string(), *value))
        .collect();
    Projection::Chart(Chart::Bar(BarChart {
        title: spec.title.clone(),
        x_desc: spec.x_desc.clone(),
        y_desc: spec.y_desc.clone(),
        orientation: Orientation::Horizontal,
        bars: bars_from(entries, spec.value_format),
        size: spec.size,
    }))
}

/// `[positive, negative, neutral]`. Neutral is an indicator, not a count:
/// it is 1 only when the label is exactly `"neutral"`.
pub fn sentiment_buckets(summary: &SentimentSummary) -> [f64; 3] {
    let neutral = match summary.sentiment_label.as_deref() {
        Some("neutral") => 1.0,
        _ => 0.0,
    };
    [summary.positive_count, summary.negative_count, neutral]
}

const SENTIMENT_COLORS: [(&str, Rgb); 3] = [
    ("positive", [0, 128, 0]),
    ("negative", [255, 0, 0]),
    ("neutral", [0, 0, 255]),
];

pub fn sentiment_summary(
    summary: &SentimentSummary,
    spec: &ChartSpec,
    labels: &LabelTables,
) -> Projection {
    let bars = SENTIMENT_COLORS
        .iter()
        .zip(sentiment_buckets(summary))
        .map(|((tag, color), value)| Bar {
            label: labels.sentiment.resolve(tag).to_string(),
            value,
            display: spec.value_format.format(value),
            color: Some(*color),
        })
        .collect();

    Projection::Chart(Chart::Bar(BarChart {
        title: spec.title.clone(),
        x_desc: spec.x_desc.clone(),
        y_desc: spec.y_desc.clone(),
        orientation: Orientation::Vertical,
        bars,
        size: spec.size,
    }))
}

/// Occurrence count per translated entity type, skipping empty lists.
pub fn entity_counts(
    entities: &OrderedMap<Vec<serde_json::Value>>,
    mapping: &LabelMapping,
) -> WeightTable {
    let mut counts = WeightTable::new();
    for (entity_type, occurrences) in entities.iter() {
        if !occurrences.is_empty() {
            counts.insert(mapping.resolve(entity_type), occurrences.len() as f64);
        }
    }
    counts
}

pub fn entity_distribution(
    entities: &OrderedMap<Vec<serde_json::Value>>,
    spec: &ChartSpec,
    labels: &LabelTables,
) -> Projection {
    let counts = entity_counts(entities, &labels.entity);
    if counts.is_empty() {
        return Projection::NothingToRender("no entities found".to_string());
    }
    Projection::Chart(Chart::Pie(PieChart {
        title: spec.title.clone(),
        slices: counts.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        size: spec.size,
    }))
}

/// Several series laid out on one shared label set.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub names: Vec<String>,
    pub labels: Vec<String>,
    /// `values[label][series]`
    pub values: Vec<Vec<f64>>,
}

impl AlignedSeries {
    /// Keeps the `n` labels with the largest total across all series.
    pub fn top_by_total(&self, top_n: Option<usize>) -> AlignedSeries {
        let totals: Vec<f64> = self.values.iter().map(|row| row.iter().sum()).collect();
        let mut order: Vec<usize> = (0..self.labels.len()).collect();
        order.sort_by(|&a, &b| totals[b].total_cmp(&totals[a]));
        if let Some(n) = top_n {
            order.truncate(n);
        }

        let labels = order.iter().map(|&i| self.labels[i].clone()).collect();
        let values = order.iter().map(|&i| self.values[i].clone()).collect();
        AlignedSeries {
            names: self.names.clone(),
            labels,
            values,
        }
    }
}

/// Union of every series' labels in first-encounter order; missing = 0.
pub fn align_series(series: &[NamedSeries]) -> AlignedSeries {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut labels: Vec<String> = Vec::new();
    for s in series {
        for key in s.values.keys() {
            if seen.insert(key) {
                labels.push(key.to_string());
            }
        }
    }

    let values = labels
        .iter()
        .map(|label| {
            series
                .iter()
                .map(|s| s.values.get(label).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    AlignedSeries {
        names: series.iter().map(|s| s.name.clone()).collect(),
        labels,
        values,
    }
}

pub fn comparison_heatmap(series: &[NamedSeries], spec: &ChartSpec) -> Projection {
    let aligned = align_series(series).top_by_total(spec.top_n);
    if aligned.names.is_empty() || aligned.labels.is_empty() {
        return Projection::NothingToRender("no series data to compare".to_string());
    }
    Projection::Chart(Chart::Heatmap(HeatmapChart {
        title: spec.title.clone(),
        x_desc: spec.x_desc.clone(),
        y_desc: spec.y_desc.clone(),
        columns: aligned.names,
        rows: aligned.labels,
        cells: aligned.values,
        size: spec.size,
    }))
}

pub fn trend_lines(series: &[NamedSeries], spec: &ChartSpec) -> Projection {
    let aligned = align_series(series).top_by_total(spec.top_n);
    if aligned.names.is_empty() || aligned.labels.is_empty() {
        return Projection::NothingToRender("no series data for a trend".to_string());
    }
    Projection::Chart(Chart::Trend(TrendChart {
        title: spec.title.clone(),
        x_desc: spec.x_desc.clone(),
        y_desc: spec.y_desc.clone(),
        points: aligned.names,
        lines: aligned.labels.into_iter().zip(aligned.values).collect(),
        size: spec.size,
    }))
}
