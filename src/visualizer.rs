use font_kit::source::SystemSource;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters_backend::DrawingErrorKind;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::charts::{
    Bar, BarChart, Chart, CloudChart, HeatmapChart, Orientation, PieChart, TrendChart,
};
use crate::error::{DrawError, RenderFailure};

/// Family plotters resolves on every platform; used for degraded rendering.
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Generic names plotters maps onto the system's own choice.
const GENERIC_FAMILIES: &[&str] = &["serif", "sans-serif", "monospace"];

/// What happened when a chart was painted successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaintOutcome {
    Rendered,
    /// Painted without the preferred font.
    Degraded { reason: String },
}

/// Turns a projected [`Chart`] into an image file.
pub trait ChartPainter: Send + Sync {
    fn paint(&self, chart: &Chart, output_path: &Path) -> Result<PaintOutcome, RenderFailure>;
}

/// Font configuration chosen before any chart is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontPlan {
    pub family: String,
    /// Set when the preferred family was unusable and the default replaced it.
    pub degraded: Option<String>,
}

impl FontPlan {
    /// Checks the preferred family against the system fonts. plotters falls
    /// back to sans-serif silently, so an unknown family has to be caught here.
    pub fn resolve(preferred: Option<&str>) -> Self {
        let Some(family) = preferred else {
            return Self {
                family: DEFAULT_FONT_FAMILY.to_string(),
                degraded: None,
            };
        };
        match check_family(family) {
            Ok(()) => Self {
                family: family.to_string(),
                degraded: None,
            },
            Err(reason) => {
                warn!("{}; charts will use {}", reason, DEFAULT_FONT_FAMILY);
                Self {
                    family: DEFAULT_FONT_FAMILY.to_string(),
                    degraded: Some(reason),
                }
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    fn outcome(&self) -> PaintOutcome {
        match &self.degraded {
            Some(reason) => PaintOutcome::Degraded {
                reason: reason.clone(),
            },
            None => PaintOutcome::Rendered,
        }
    }
}

fn check_family(family: &str) -> Result<(), String> {
    if GENERIC_FAMILIES.contains(&family.to_ascii_lowercase().as_str()) {
        return Ok(());
    }
    let handle = SystemSource::new()
        .select_family_by_name(family)
        .map_err(|e| format!("font family '{}' not found ({:?})", family, e))?;
    let face = handle
        .fonts()
        .first()
        .ok_or_else(|| format!("font family '{}' has no faces", family))?;
    face.load()
        .map(|_| ())
        .map_err(|e| format!("font family '{}' cannot be loaded ({:?})", family, e))
}

/// PNG painter backed by plotters' bitmap backend.
#[derive(Debug, Clone)]
pub struct PlottersPainter {
    plan: FontPlan,
}

impl PlottersPainter {
    pub fn new(font_family: Option<String>) -> Self {
        Self {
            plan: FontPlan::resolve(font_family.as_deref()),
        }
    }

    pub fn font_plan(&self) -> &FontPlan {
        &self.plan
    }
}

impl Default for PlottersPainter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ChartPainter for PlottersPainter {
    fn paint(&self, chart: &Chart, output_path: &Path) -> Result<PaintOutcome, RenderFailure> {
        ensure_parent_dir(output_path)?;

        let write_failure = |e: DrawError| RenderFailure::Write {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        };

        let family = self.plan.family.as_str();
        match draw_chart(chart, output_path, family, self.plan.is_degraded()) {
            Ok(()) => {
                debug!("Painted '{}' to {}", chart.title(), output_path.display());
                Ok(self.plan.outcome())
            }
            // A family that resolved but cannot rasterise this text.
            Err(DrawError::Font(reason)) if family != DEFAULT_FONT_FAMILY => {
                warn!(
                    "Font '{}' failed on '{}' ({}); using {}",
                    family,
                    chart.title(),
                    reason,
                    DEFAULT_FONT_FAMILY
                );
                draw_chart(chart, output_path, DEFAULT_FONT_FAMILY, true).map_err(write_failure)?;
                Ok(PaintOutcome::Degraded { reason })
            }
            Err(e) => Err(write_failure(e)),
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), RenderFailure> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| RenderFailure::OutputDir {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

pub(crate) fn classify<E: std::error::Error + Send + Sync + 'static>(err: DrawingAreaErrorKind<E>) -> DrawError {
    match err {
        DrawingAreaErrorKind::BackendError(DrawingErrorKind::FontError(e)) => {
            DrawError::Font(e.to_string())
        }
        other => DrawError::Backend(other.to_string()),
    }
}

type PaintResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

fn draw_chart(chart: &Chart, output_path: &Path, family: &str, degraded: bool) -> Result<(), DrawError> {
    let root = BitMapBackend::new(output_path, chart.size()).into_drawing_area();

    let drawn = match chart {
        Chart::Bar(bars) => draw_bars(&root, bars, family),
        Chart::Cloud(cloud) => draw_cloud(&root, cloud, family, degraded),
        Chart::Pie(pie) => draw_pie(&root, pie, family),
        Chart::Heatmap(heatmap) => draw_heatmap(&root, heatmap, family),
        Chart::Trend(trend) => draw_trend(&root, trend, family),
    };

    drawn.and_then(|_| root.present()).map_err(classify)
}

fn label_area_for<'a>(labels: impl Iterator<Item = &'a str>) -> u32 {
    let longest = labels.map(|l| l.graphemes(true).count()).max().unwrap_or(1) as u32;
    (longest * 18 + 20).clamp(60, 400)
}

fn bar_color(bar: &Bar, index: usize) -> RGBAColor {
    match bar.color {
        Some([r, g, b]) => RGBColor(r, g, b).to_rgba(),
        None => Palette99::pick(index).mix(0.9),
    }
}

fn draw_footer<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, family: &str) -> PaintResult<DB> {
    let (width, height) = root.dim_in_pixel();
    let current_date = chrono::Local::now().format("%Y-%m-%d").to_string();
    root.draw(&Text::new(
        format!("Generated: {}", current_date),
        (width as i32 - 180, height as i32 - 22),
        (family, 14).into_font().color(&RGBColor(150, 150, 170)),
    ))
}

fn draw_bars<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, chart: &BarChart, family: &str) -> PaintResult<DB> {
    root.fill(&WHITE)?;
    match chart.orientation {
        Orientation::Horizontal => draw_horizontal_bars(root, chart, family)?,
        Orientation::Vertical => draw_vertical_bars(root, chart, family)?,
    }
    draw_footer(root, family)
}

fn draw_horizontal_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &BarChart,
    family: &str,
) -> PaintResult<DB> {
    let rows = chart.bars.len() as i32;
    let max_value = chart.bars.iter().map(|b| b.value).fold(0.0, f64::max);
    let x_max = if max_value > 0.0 { max_value * 1.15 } else { 1.0 };
    let label_area = label_area_for(chart.bars.iter().map(|b| b.label.as_str()));

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, (family, 32).into_font().color(&RGBColor(30, 30, 85)))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, label_area)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(0f64..x_max, (0..rows).into_segmented())?;

    // Row 0 is at the bottom, so the top-ranked bar lives in the last row.
    let label_for_row = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(row) if (0..rows).contains(row) => {
            chart.bars[(rows - 1 - row) as usize].label.clone()
        }
        _ => String::new(),
    };

    ctx.configure_mesh()
        .disable_y_mesh()
        .light_line_style(RGBColor(240, 240, 245))
        .bold_line_style(RGBColor(220, 220, 230))
        .x_desc(chart.x_desc.as_str())
        .y_desc(chart.y_desc.as_str())
        .y_labels(chart.bars.len())
        .y_label_formatter(&label_for_row)
        .label_style((family, 18).into_font().color(&RGBColor(60, 60, 80)))
        .axis_desc_style((family, 20))
        .draw()?;

    ctx.draw_series(chart.bars.iter().enumerate().map(|(rank, bar)| {
        let row = rows - 1 - rank as i32;
        let mut rect = Rectangle::new(
            [(0.0, SegmentValue::Exact(row)), (bar.value, SegmentValue::Exact(row + 1))],
            bar_color(bar, rank).filled(),
        );
        rect.set_margin(4, 4, 0, 0);
        rect
    }))?;

    let offset = x_max * 0.01;
    let value_style = (family, 16)
        .into_font()
        .color(&RGBColor(50, 50, 100))
        .pos(Pos::new(HPos::Left, VPos::Center));
    ctx.draw_series(chart.bars.iter().enumerate().map(|(rank, bar)| {
        let row = rows - 1 - rank as i32;
        Text::new(
            bar.display.clone(),
            (bar.value + offset, SegmentValue::CenterOf(row)),
            value_style.clone(),
        )
    }))?;

    Ok(())
}

fn draw_vertical_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &BarChart,
    family: &str,
) -> PaintResult<DB> {
    let columns = chart.bars.len() as i32;
    let max_value = chart.bars.iter().map(|b| b.value).fold(0.0, f64::max);
    let y_max = if max_value > 0.0 { max_value * 1.2 } else { 1.0 };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, (family, 32).into_font().color(&RGBColor(30, 30, 85)))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d((0..columns).into_segmented(), 0f64..y_max)?;

    let label_for_column = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(col) if (0..columns).contains(col) => {
            chart.bars[*col as usize].label.clone()
        }
        _ => String::new(),
    };

    ctx.configure_mesh()
        .disable_x_mesh()
        .light_line_style(RGBColor(240, 240, 245))
        .x_labels(chart.bars.len())
        .x_label_formatter(&label_for_column)
        .label_style((family, 18).into_font().color(&RGBColor(60, 60, 80)))
        .draw()?;

    ctx.draw_series(chart.bars.iter().enumerate().map(|(col, bar)| {
        let col = col as i32;
        let mut rect = Rectangle::new(
            [(SegmentValue::Exact(col), 0.0), (SegmentValue::Exact(col + 1), bar.value)],
            bar_color(bar, col as usize).filled(),
        );
        rect.set_margin(0, 0, 25, 25);
        rect
    }))?;

    let value_style = (family, 18)
        .into_font()
        .color(&RGBColor(50, 50, 100))
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    ctx.draw_series(chart.bars.iter().enumerate().map(|(col, bar)| {
        Text::new(
            bar.display.clone(),
            (SegmentValue::CenterOf(col as i32), bar.value + y_max * 0.01),
            value_style.clone(),
        )
    }))?;

    Ok(())
}

fn draw_cloud<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &CloudChart,
    family: &str,
    degraded: bool,
) -> PaintResult<DB> {
    root.fill(&WHITE)?;
    let area = root.titled(chart.title_for(degraded), (family, 40))?.margin(10, 10, 10, 10);

    let words = &chart.words;
    if words.is_empty() {
        return Ok(());
    }

    // Weighted grid layout: heavier words come first and get larger type.
    let cols = ((words.len() as f64).sqrt().ceil() as usize).max(1);
    let rows = (words.len() + cols - 1) / cols;
    let (width, height) = area.dim_in_pixel();
    let cell_width = (width as usize / cols).max(1) as f64;
    let cell_height = (height as usize / rows).max(1) as f64;

    let max_weight = words.first().map(|(_, w)| *w).unwrap_or(1.0);
    let min_weight = words.last().map(|(_, w)| *w).unwrap_or(0.0);

    for (i, (word, weight)) in words.iter().enumerate() {
        let row = i / cols;
        let col = i % cols;
        let x = (col as f64 * cell_width + cell_width / 2.0) as i32;
        let y = (row as f64 * cell_height + cell_height / 2.0) as i32;

        let ratio = if max_weight > min_weight {
            (weight - min_weight) / (max_weight - min_weight)
        } else {
            1.0
        };
        let graphemes = word.graphemes(true).count().max(1) as f64;
        let font_size = (14.0 + 56.0 * ratio)
            .min(cell_width * 0.9 / graphemes)
            .min(cell_height * 0.8)
            .max(8.0);

        let hue = (word.chars().fold(0u32, |acc, c| acc.wrapping_add(c as u32)) % 360) as f64 / 360.0;
        let color = HSLColor(hue, 0.7, 0.45);

        area.draw(&Text::new(
            word.clone(),
            (x, y),
            (family, font_size)
                .into_font()
                .color(&color)
                .pos(Pos::new(HPos::Center, VPos::Center)),
        ))?;
    }

    Ok(())
}

fn draw_pie<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, chart: &PieChart, family: &str) -> PaintResult<DB> {
    root.fill(&WHITE)?;
    let area = root.titled(&chart.title, (family, 36))?;
    let (width, height) = area.dim_in_pixel();

    let center = (width as i32 / 2, height as i32 / 2);
    let radius = width.min(height) as f64 * 0.35;
    let sizes: Vec<f64> = chart.slices.iter().map(|(_, v)| *v).collect();
    let labels: Vec<String> = chart.slices.iter().map(|(l, _)| l.clone()).collect();
    let colors: Vec<RGBColor> = (0..chart.slices.len())
        .map(|i| {
            let c = Palette99::pick(i).to_rgba();
            RGBColor(c.0, c.1, c.2)
        })
        .collect();

    let mut pie = Pie::new(&center, &radius, &sizes[..], &colors[..], &labels[..]);
    pie.label_style((family, 22).into_font().color(&RGBColor(40, 40, 60)));
    pie.percentages((family, 18).into_font().color(&WHITE));
    area.draw(&pie)?;

    draw_footer(root, family)
}

fn heat_color(intensity: f64) -> HSLColor {
    HSLColor(0.6, 0.8, 0.9 - intensity.clamp(0.0, 1.0) * 0.7)
}

fn draw_heatmap<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &HeatmapChart,
    family: &str,
) -> PaintResult<DB> {
    root.fill(&WHITE)?;
    let rows = chart.rows.len() as i32;
    let cols = chart.columns.len() as i32;
    let max_value = chart
        .cells
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(0.0, f64::max);
    let label_area = label_area_for(chart.rows.iter().map(String::as_str));

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, (family, 32).into_font().color(&RGBColor(30, 30, 85)))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, label_area)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .build_cartesian_2d((0..cols).into_segmented(), (0..rows).into_segmented())?;

    let column_label = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(c) if (0..cols).contains(c) => chart.columns[*c as usize].clone(),
        _ => String::new(),
    };
    let row_label = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(r) if (0..rows).contains(r) => {
            chart.rows[(rows - 1 - r) as usize].clone()
        }
        _ => String::new(),
    };

    ctx.configure_mesh()
        .disable_mesh()
        .x_labels(chart.columns.len())
        .y_labels(chart.rows.len())
        .x_label_formatter(&column_label)
        .y_label_formatter(&row_label)
        .x_desc(chart.x_desc.as_str())
        .y_desc(chart.y_desc.as_str())
        .label_style((family, 16))
        .axis_desc_style((family, 18))
        .draw()?;

    let intensity = |v: f64| if max_value > 0.0 { (v / max_value).sqrt() } else { 0.0 };

    let cells: Vec<(i32, i32, f64)> = chart
        .cells
        .iter()
        .enumerate()
        .flat_map(|(r, row)| {
            let y = rows - 1 - r as i32;
            row.iter().enumerate().map(move |(c, v)| (c as i32, y, *v))
        })
        .collect();

    ctx.draw_series(cells.iter().map(|&(x, y, v)| {
        Rectangle::new(
            [(SegmentValue::Exact(x), SegmentValue::Exact(y)), (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1))],
            heat_color(intensity(v)).filled(),
        )
    }))?;

    ctx.draw_series(cells.iter().map(|&(x, y, v)| {
        let ink = if intensity(v) > 0.6 { WHITE } else { RGBColor(40, 40, 60) };
        Text::new(
            crate::charts::ValueFormat::Count.format(v),
            (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
            (family, 14)
                .into_font()
                .color(&ink)
                .pos(Pos::new(HPos::Center, VPos::Center)),
        )
    }))?;

    Ok(())
}

fn draw_trend<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, chart: &TrendChart, family: &str) -> PaintResult<DB> {
    root.fill(&WHITE)?;
    let last_point = (chart.points.len() as i32 - 1).max(1);
    let max_value = chart
        .lines
        .iter()
        .flat_map(|(_, values)| values.iter().copied())
        .fold(0.0, f64::max);
    let y_max = if max_value > 0.0 { max_value * 1.15 } else { 1.0 };

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, (family, 32).into_font().color(&RGBColor(30, 30, 85)))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .build_cartesian_2d(0..last_point, 0f64..y_max)?;

    let point_label = |x: &i32| {
        usize::try_from(*x)
            .ok()
            .and_then(|i| chart.points.get(i))
            .cloned()
            .unwrap_or_default()
    };

    ctx.configure_mesh()
        .light_line_style(RGBColor(240, 240, 245))
        .x_labels(chart.points.len())
        .x_label_formatter(&point_label)
        .x_desc(chart.x_desc.as_str())
        .y_desc(chart.y_desc.as_str())
        .label_style((family, 16))
        .axis_desc_style((family, 18))
        .draw()?;

    for (idx, (label, values)) in chart.lines.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        ctx.draw_series(LineSeries::new(
            values.iter().enumerate().map(|(i, v)| (i as i32, *v)),
            color.stroke_width(2),
        ))?
        .label(label.clone())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        ctx.draw_series(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Circle::new((i as i32, *v), 4, color.filled())),
        )?;
    }

    ctx.configure_series_labels()
        .background_style(WHITE.filled())
        .border_style(BLACK)
        .label_font((family, 16))
        .draw()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{ranked_bars, word_cloud, ChartKind, ChartSpec, Projection};
    use crate::results::WeightTable;
    use tempfile::TempDir;

    #[test]
    fn test_font_errors_are_recoverable() {
        let err: DrawingAreaErrorKind<std::io::Error> = DrawingAreaErrorKind::BackendError(
            DrawingErrorKind::FontError(Box::new(std::io::Error::other("no such family"))),
        );
        assert!(matches!(classify(err), DrawError::Font(_)));
    }

    #[test]
    fn test_backend_errors_are_not_font_errors() {
        let err: DrawingAreaErrorKind<std::io::Error> = DrawingAreaErrorKind::BackendError(
            DrawingErrorKind::DrawingError(std::io::Error::other("disk full")),
        );
        assert!(matches!(classify(err), DrawError::Backend(_)));
    }

    #[test]
    fn test_unwritable_destination_is_render_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"occupied").unwrap();

        let table: WeightTable = [("字", 3.0)].into_iter().collect();
        let spec = ChartSpec::for_kind(ChartKind::WordFrequency);
        let Projection::Chart(chart) = ranked_bars(&table, &spec) else {
            panic!("expected a chart");
        };

        let painter = PlottersPainter::default();
        let result = painter.paint(&chart, &blocker.join("word_frequency.png"));
        assert!(matches!(result, Err(RenderFailure::OutputDir { .. })));
    }

    fn project(kind: ChartKind, table: &WeightTable) -> Chart {
        let spec = ChartSpec::for_kind(kind);
        let projection = match kind {
            ChartKind::WordCloud => word_cloud(table, &spec),
            _ => ranked_bars(table, &spec),
        };
        match projection {
            Projection::Chart(chart) => chart,
            other => panic!("expected a chart, got {:?}", other),
        }
    }

    #[test]
    fn test_default_font_paints_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("word_frequency.png");
        let table: WeightTable = [("經濟", 12.0), ("發展", 9.0)].into_iter().collect();

        let painter = PlottersPainter::default();
        assert!(!painter.font_plan().is_degraded());

        let outcome = painter.paint(&project(ChartKind::WordFrequency, &table), &path).unwrap();
        assert_eq!(outcome, PaintOutcome::Rendered);
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_missing_font_degrades_to_default_family() {
        let dir = TempDir::new().unwrap();
        let table: WeightTable = [("經濟", 12.0), ("發展", 9.0)].into_iter().collect();

        let painter = PlottersPainter::new(Some("NoSuchFamilyZhInsights".to_string()));
        let plan = painter.font_plan();
        assert_eq!(plan.family, DEFAULT_FONT_FAMILY);
        assert!(plan.is_degraded());

        for kind in [ChartKind::WordFrequency, ChartKind::WordCloud] {
            let path = dir.path().join(format!("{}.png", kind.chart_name()));
            let outcome = painter.paint(&project(kind, &table), &path).unwrap();
            assert!(matches!(outcome, PaintOutcome::Degraded { .. }), "{:?}", kind);
            assert!(path.exists());
        }
    }

    #[test]
    fn test_generic_families_are_not_degraded() {
        assert!(!FontPlan::resolve(Some("sans-serif")).is_degraded());
        assert!(!FontPlan::resolve(Some("Monospace")).is_degraded());
        assert_eq!(FontPlan::resolve(None).family, DEFAULT_FONT_FAMILY);
    }

    #[test]
    fn test_label_area_grows_with_longest_label() {
        let short = label_area_for(["ab"].into_iter());
        let long = label_area_for(["中華人民共和國國務院"].into_iter());
        assert!(long > short);
        assert_eq!(label_area_for(std::iter::empty()), 60);
    }
}
