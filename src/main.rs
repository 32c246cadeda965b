use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use zh_insights::converter::{self, FileReport, SimplifiedToTraditional, DEFAULT_EXTENSIONS};
use zh_insights::labels::{LabelStore, LabelTables, ENTITY_FILE, POS_FILE, SENTIMENT_FILE};
use zh_insights::report::{ChartEntry, ChartStatus, ReportAssembler, ReportConfig};
use zh_insights::visualizer::PlottersPainter;
use zh_insights::{utils, ConvertError};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Simplified Chinese files to Traditional Chinese in place
    Convert {
        /// Single file to convert
        #[arg(short, long, conflicts_with = "dir")]
        file: Option<PathBuf>,

        /// Directory whose files should be converted
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Comma-separated extensions to convert (e.g. .py,.txt)
        #[arg(short, long)]
        ext: Option<String>,

        /// Recurse into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Do not write .bak copies
        #[arg(long)]
        no_backup: bool,
    },
    /// Render every chart an analysis results file supports
    Report {
        /// Input JSON file with analysis results
        #[arg(short, long)]
        input: PathBuf,

        /// Directory the PNG files are written to
        #[arg(short, long, default_value = "visualization")]
        output_dir: PathBuf,

        /// Prefix for every chart file name
        #[arg(short, long, default_value = "")]
        prefix: String,

        /// Directory holding pos.json, entity.json and sentiment.json
        #[arg(short, long)]
        labels: Option<PathBuf>,

        /// Preferred font family for chart text
        #[arg(long)]
        font: Option<String>,

        /// JSON report configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Render charts in parallel
        #[arg(long)]
        parallel: bool,
    },
    /// Compare one section across several results files as a heatmap
    Compare {
        /// Results files, one series each (named after the file)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Section to compare
        #[arg(short, long, default_value = "word_frequency")]
        key: String,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Limit to the top N labels by total
        #[arg(short, long)]
        limit: Option<usize>,

        /// Preferred font family for chart text
        #[arg(long)]
        font: Option<String>,
    },
    /// Plot how the top labels of one section move across results files
    Trend {
        /// Results files in time order
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Section to follow
        #[arg(short, long, default_value = "word_frequency")]
        key: String,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Limit to the top N labels by total
        #[arg(short, long)]
        limit: Option<usize>,

        /// Preferred font family for chart text
        #[arg(long)]
        font: Option<String>,
    },
    /// Write the built-in label tables as editable JSON files
    Labels {
        /// Destination directory
        #[arg(short, long)]
        output_dir: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Convert {
            file,
            dir,
            ext,
            recursive,
            no_backup,
        } => run_convert(file.as_deref(), dir.as_deref(), ext.as_deref(), *recursive, !*no_backup),
        Commands::Report {
            input,
            output_dir,
            prefix,
            labels,
            font,
            config,
            parallel,
        } => {
            let results = utils::import_from_json(input).context("Failed to import analysis results")?;

            let mut report_config = match config {
                Some(path) => utils::load_report_config(path)?,
                None => ReportConfig::default(),
            };
            if font.is_some() {
                report_config.font_family = font.clone();
            }
            report_config.parallel |= *parallel;

            let tables = match labels {
                Some(dir) => LabelStore::from_dir(dir).current(),
                None => Arc::new(LabelTables::builtin()),
            };
            let painter = PlottersPainter::new(report_config.font_family.clone());
            if let Some(reason) = &painter.font_plan().degraded {
                println!("{} {}", "Font fallback:".yellow(), reason);
            }
            let assembler = ReportAssembler::new(report_config, tables, painter);

            let summary = assembler.assemble(&results, output_dir, prefix);

            println!("\n{}", "=== Visualization Report ===".bold().green());
            if summary.entries.is_empty() {
                println!("No chartable sections found in {}", input.display());
            }
            for entry in &summary.entries {
                print_chart_entry(entry);
            }

            let failed = summary.failed().count();
            println!(
                "\n{} of {} charts written to {}",
                summary.succeeded().count(),
                summary.entries.len(),
                summary.out_dir.display()
            );
            if failed > 0 {
                anyhow::bail!("{} chart(s) failed", failed);
            }
            Ok(())
        }
        Commands::Compare {
            input,
            key,
            output,
            limit,
            font,
        } => {
            let series = utils::load_series(input, key)?;
            let assembler = series_assembler(key, *limit, font, false);
            let entry = assembler.compare(&series, output);
            print_chart_entry(&entry);
            finish_single(&entry)
        }
        Commands::Trend {
            input,
            key,
            output,
            limit,
            font,
        } => {
            let series = utils::load_series(input, key)?;
            let assembler = series_assembler(key, *limit, font, true);
            let entry = assembler.trend(&series, output);
            print_chart_entry(&entry);
            finish_single(&entry)
        }
        Commands::Labels { output_dir } => {
            std::fs::create_dir_all(output_dir)
                .with_context(|| format!("Failed to create {}", output_dir.display()))?;
            let tables = LabelTables::builtin();
            for (file, mapping) in [
                (POS_FILE, &tables.pos),
                (ENTITY_FILE, &tables.entity),
                (SENTIMENT_FILE, &tables.sentiment),
            ] {
                let path = output_dir.join(file);
                utils::export_to_json(mapping.as_map(), &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Wrote {} labels to {}", mapping.len(), path.display());
            }
            Ok(())
        }
    }
}

fn series_assembler(
    key: &str,
    limit: Option<usize>,
    font: &Option<String>,
    trend: bool,
) -> ReportAssembler<PlottersPainter> {
    use zh_insights::charts::ChartKind;
    use zh_insights::report::ChartOverride;

    let kind = if trend { ChartKind::TrendLine } else { ChartKind::ComparisonHeatmap };
    let mut config = ReportConfig {
        font_family: font.clone(),
        ..ReportConfig::default()
    };
    let base_title = zh_insights::ChartSpec::for_kind(kind).title;
    config.charts.insert(
        kind,
        ChartOverride {
            title: Some(format!("{} ({})", base_title, key)),
            top_n: limit,
            ..ChartOverride::default()
        },
    );
    let painter = PlottersPainter::new(font.clone());
    ReportAssembler::new(config, LabelTables::builtin(), painter)
}

fn print_chart_entry(entry: &ChartEntry) {
    let name = entry.kind.chart_name();
    match &entry.status {
        ChartStatus::Rendered { path } => {
            println!("  {} {:<18} {}", "✓".green(), name, path.display());
        }
        ChartStatus::Degraded { path, reason } => {
            println!(
                "  {} {:<18} {} {}",
                "✓".yellow(),
                name,
                path.display(),
                format!("(default font: {})", reason).yellow()
            );
        }
        ChartStatus::Skipped { reason } => {
            println!("  {} {:<18} {}", "-".dimmed(), name, reason.dimmed());
        }
        ChartStatus::Failed { error } => {
            println!("  {} {:<18} {}", "✗".red(), name, error.to_string().red());
        }
    }
}

fn finish_single(entry: &ChartEntry) -> Result<()> {
    match &entry.status {
        ChartStatus::Failed { error } => Err(anyhow::anyhow!("{}", error)),
        _ => Ok(()),
    }
}

fn print_convert_usage() -> Result<()> {
    let mut cmd = Cli::command();
    if let Some(convert) = cmd.find_subcommand_mut("convert") {
        convert.print_help()?;
    }
    println!("\n{}", "Examples:".bold());
    println!("  Convert one file:        zh-insights convert --file notes.md");
    println!("  Convert a directory:     zh-insights convert --dir . --ext .py");
    println!("  Convert a whole project: zh-insights convert --dir . --recursive");
    Ok(())
}

fn describe_file_result(path: &Path, result: &Result<FileReport, ConvertError>) -> String {
    match result {
        Ok(report) => match &report.backup {
            Some(backup) => format!(
                "{} {} (backup: {})",
                "converted".green(),
                path.display(),
                backup.display()
            ),
            None => format!("{} {}", "converted".green(), path.display()),
        },
        Err(e) => format!("{} {}", "failed".red(), e),
    }
}

fn run_convert(
    file: Option<&Path>,
    dir: Option<&Path>,
    ext: Option<&str>,
    recursive: bool,
    backup: bool,
) -> Result<()> {
    let converter = SimplifiedToTraditional;

    let summary = match (file, dir) {
        (Some(file), _) => {
            let result = converter::convert_file(file, &converter, backup);
            println!("{}", describe_file_result(file, &result));
            let mut summary = converter::ConversionSummary::default();
            summary.record(file, result);
            summary
        }
        (None, Some(dir)) => {
            let extensions: Vec<String> = match ext {
                Some(raw) => converter::parse_extensions(raw),
                None => DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            };
            let files = converter::collect_files(dir, &extensions, recursive)
                .with_context(|| format!("Failed to scan {}", dir.display()))?;

            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")?
                    .progress_chars("#>-"),
            );
            let summary = converter::convert_files(&files, backup, &converter, |path, result| {
                pb.println(describe_file_result(path, result));
                pb.inc(1);
            });
            pb.finish_and_clear();
            summary
        }
        (None, None) => return print_convert_usage(),
    };

    println!(
        "\nConversion finished: {} converted, {} failed",
        summary.converted.len().to_string().green(),
        summary.failed.len().to_string().red()
    );
    if !summary.failed.is_empty() {
        anyhow::bail!("{} file(s) could not be converted", summary.failed.len());
    }
    Ok(())
}
