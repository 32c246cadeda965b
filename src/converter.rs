use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ConvertError;

/// Extensions converted when no filter is given.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".py", ".txt", ".md", ".json"];

/// Rewrites text from one Chinese script to another.
pub trait ScriptConverter: Sync {
    fn convert(&self, text: &str) -> String;
}

/// Simplified → Traditional Chinese via `zhconv`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplifiedToTraditional;

impl ScriptConverter for SimplifiedToTraditional {
    fn convert(&self, text: &str) -> String {
        zhconv::zhconv(text, zhconv::Variant::ZhHant)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub backup: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConversionSummary {
    pub converted: Vec<FileReport>,
    pub failed: Vec<(PathBuf, ConvertError)>,
}

impl ConversionSummary {
    pub fn record(&mut self, path: &Path, result: Result<FileReport, ConvertError>) {
        match result {
            Ok(report) => self.converted.push(report),
            Err(e) => self.failed.push((path.to_path_buf(), e)),
        }
    }
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Converts one file in place, optionally leaving a byte-identical `.bak`.
///
/// The file is read and written whole, so a failure never leaves it half
/// converted. The backup is only taken once the content has been read.
pub fn convert_file(
    path: &Path,
    converter: &dyn ScriptConverter,
    backup: bool,
) -> Result<FileReport, ConvertError> {
    let content = fs::read_to_string(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let backup = if backup {
        let target = backup_path(path);
        fs::copy(path, &target).map_err(|source| ConvertError::Backup {
            path: target.clone(),
            source,
        })?;
        debug!("Backed up {} to {}", path.display(), target.display());
        Some(target)
    } else {
        None
    };

    let converted = converter.convert(&content);
    fs::write(path, converted).map_err(|source| ConvertError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Converted {}", path.display());
    Ok(FileReport {
        path: path.to_path_buf(),
        backup,
    })
}

/// Parses `"py, .txt"` into `[".py", ".txt"]`.
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty() && *ext != ".")
        .map(|ext| {
            let ext = ext.to_lowercase();
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        })
        .collect()
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension() {
        Some(ext) => {
            let dotted = format!(".{}", ext.to_string_lossy().to_lowercase());
            extensions.iter().any(|e| *e == dotted)
        }
        None => false,
    }
}

/// Files under `dir` whose extension is in `extensions`, sorted by path.
pub fn collect_files(dir: &Path, extensions: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let walker = if recursive {
        WalkDir::new(dir)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    let mut files = Vec::new();
    for entry in walker.sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() && matches_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    debug!("Found {} matching files under {}", files.len(), dir.display());
    Ok(files)
}

/// Converts each file in turn, recording failures instead of stopping.
///
/// `on_file` is called after each file so callers can report progress.
pub fn convert_files<F>(
    files: &[PathBuf],
    backup: bool,
    converter: &dyn ScriptConverter,
    mut on_file: F,
) -> ConversionSummary
where
    F: FnMut(&Path, &Result<FileReport, ConvertError>),
{
    let mut summary = ConversionSummary::default();
    for file in files {
        let result = convert_file(file, converter, backup);
        if let Err(e) = &result {
            warn!("{}", e);
        }
        on_file(file, &result);
        summary.record(file, result);
    }

    info!(
        "Converted {} files, {} failed",
        summary.converted.len(),
        summary.failed.len()
    );
    summary
}

/// Scans `dir` and converts every matching file.
pub fn convert_directory<F>(
    dir: &Path,
    extensions: &[String],
    recursive: bool,
    backup: bool,
    converter: &dyn ScriptConverter,
    on_file: F,
) -> Result<ConversionSummary>
where
    F: FnMut(&Path, &Result<FileReport, ConvertError>),
{
    let files = collect_files(dir, extensions, recursive)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;
    Ok(convert_files(&files, backup, converter, on_file))
}
