//! # zh_insights
//!
//! Two small utilities for Chinese text work:
//!
//! * [`converter`] rewrites files from Simplified to Traditional script,
//!   keeping an optional `.bak` copy of each original.
//! * [`report`] renders PNG charts from precomputed linguistic analysis
//!   (word frequencies, part of speech, sentiment, n-grams, entities,
//!   keywords), plus cross-series heatmaps and trend lines.
//!
//! ```text
//! results.json ─► AnalysisResults ─► charts::* (pure projection)
//!                                        │
//!                  LabelTables ──────────┤
//!                                        ▼
//!                               ChartPainter (plotters) ─► {prefix}{chart}.png
//! ```

pub mod charts;
pub mod converter;
pub mod error;
pub mod labels;
pub mod report;
pub mod results;
pub mod utils;
pub mod visualizer;

pub use charts::{Chart, ChartKind, ChartSpec, Projection};
pub use converter::{ScriptConverter, SimplifiedToTraditional};
pub use error::{ConvertError, DrawError, LabelError, RenderFailure};
pub use labels::{LabelMapping, LabelStore, LabelTables};
pub use report::{ChartStatus, ReportAssembler, ReportConfig, ReportSummary};
pub use results::{AnalysisResults, NamedSeries, SentimentSummary, WeightTable};
pub use visualizer::{ChartPainter, FontPlan, PaintOutcome, PlottersPainter};
