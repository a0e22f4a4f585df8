use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use exif_redact::config::Preferences;
use exif_redact::fields::{Category, Field, FieldKey, Preset, SelectionMap};
use exif_redact::pipeline::{self, OutputFormat, OutputOptions, Redaction};

#[derive(Parser, Debug)]
#[command(
    name = "exif-redact",
    version,
    about = "Strip EXIF metadata from photos, keeping only the fields you choose"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to preferences file (default: preferences.json next to binary)
    #[arg(long, value_name = "FILE")]
    prefs: Option<PathBuf>,

    /// List the metadata fields of each image and exit
    #[arg(long)]
    list: bool,

    /// Keep a field, as directory:Name (e.g. primary:Make). Repeatable
    #[arg(short, long = "keep", value_name = "KEY")]
    keep: Vec<FieldKey>,

    /// Start from a preset: strip-all, safe or keep-camera
    #[arg(long, value_name = "PRESET")]
    preset: Option<Preset>,

    /// Output format: same, jpeg or png
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Encode quality, 1-100 (clamped to 70-100)
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Write a redaction report next to each output
    #[arg(long)]
    report: bool,

    /// Directory for cleaned files (default: next to each input)
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Remember this selection for later runs
    #[arg(long)]
    remember: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Per-image choices shared by every worker.
#[derive(Debug, Clone)]
struct Plan {
    saved: SelectionMap,
    preset: Option<Preset>,
    keep: Vec<FieldKey>,
    options: OutputOptions,
    out_dir: Option<PathBuf>,
}

impl Plan {
    /// Remembered choices first, then the preset, then explicit keeps.
    fn selection(&self, fields: &[Field]) -> SelectionMap {
        let mut selection = SelectionMap::seeded(fields, &self.saved);
        if let Some(preset) = self.preset {
            for (key, strip) in preset.apply(fields).iter() {
                selection.set(key.clone(), strip);
            }
        }
        for key in &self.keep {
            selection.set(key.clone(), false);
        }
        selection
    }
}

#[derive(Debug)]
struct FileResult {
    path: PathBuf,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    kept: Vec<String>,
    removed: Vec<String>,
    reoriented: bool,
    selection: SelectionMap,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    // Handle --list
    if cli.list {
        return list_fields(&images, cli.json);
    }

    // Load preferences and apply overrides
    let mut prefs = Preferences::load(cli.prefs.as_deref())?;
    if let Some(format) = cli.format {
        prefs.output_format = format;
    }
    if let Some(quality) = cli.quality {
        prefs.quality = quality;
    }
    if cli.report {
        prefs.include_report = true;
    }
    if cli.remember {
        prefs.remember = true;
    }

    if let Some(ref dir) = cli.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let plan = Plan {
        saved: prefs.saved_selection(),
        preset: cli.preset,
        keep: cli.keep.clone(),
        options: prefs.output_options(),
        out_dir: cli.out_dir.clone(),
    };

    let total = images.len();
    log::info!("Found {total} image(s) to process");

    // One pipeline per image, each on its own blocking worker
    let handles: Vec<_> = images
        .into_iter()
        .map(|path| {
            let plan = plan.clone();
            tokio::task::spawn_blocking(move || process_file(path, &plan))
        })
        .collect();

    let mut results = Vec::with_capacity(total);
    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.context("Image worker panicked")?;
        log::info!("[{}/{}] {}", i + 1, total, result.path.display());
        match (&result.error, &result.output) {
            (Some(err), _) => log::error!("  Error: {err}"),
            (None, Some(out)) => {
                log::info!("  Wrote: {}", out.display());
                if !result.kept.is_empty() {
                    log::info!("  Kept: {}", result.kept.join(", "));
                }
                log::info!("  Removed {} field(s)", result.removed.len());
                if result.reoriented {
                    log::info!("  Orientation applied to pixels");
                }
                if let Some(ref report) = result.report {
                    log::info!("  Report: {}", report.display());
                }
            }
            (None, None) => {}
        }
        results.push(result);
    }

    // Remember the combined selection
    let mut combined = SelectionMap::new();
    for result in results.iter().filter(|r| r.error.is_none()) {
        for (key, strip) in result.selection.iter() {
            combined.set(key.clone(), strip);
        }
    }
    prefs.save_if_remembered(&combined, cli.prefs.as_deref())?;

    // JSON output
    if cli.json {
        let json_results: Vec<serde_json::Value> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "path": r.path.display().to_string(),
                    "output": r.output.as_ref().map(|p| p.display().to_string()),
                    "report": r.report.as_ref().map(|p| p.display().to_string()),
                    "kept_fields": r.kept,
                    "removed_fields": r.removed,
                    "reoriented": r.reoriented,
                    "error": r.error,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    // Summary
    let success = results.iter().filter(|r| r.error.is_none()).count();
    let failed = total - success;
    log::info!("Done: {success} succeeded, {failed} failed out of {total} images");

    Ok(())
}

/// Run one image through the pipeline and write its outputs.
fn process_file(path: PathBuf, plan: &Plan) -> FileResult {
    let mut result = FileResult {
        path: path.clone(),
        output: None,
        report: None,
        kept: Vec::new(),
        removed: Vec::new(),
        reoriented: false,
        selection: SelectionMap::new(),
        error: None,
    };

    if let Err(e) = redact_file(&path, plan, &mut result) {
        result.error = Some(format!("{e:#}"));
    }
    result
}

fn redact_file(path: &Path, plan: &Plan, result: &mut FileResult) -> Result<()> {
    let bytes = std::fs::read(path).context("Failed to read file")?;
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned());

    let redaction = Redaction::open(name.as_deref(), &bytes)?;
    let selection = plan.selection(redaction.fields());
    let output = redaction.finish(&selection, &plan.options)?;

    let dir = match plan.out_dir {
        Some(ref dir) => dir.clone(),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let out_path = dir.join(&output.file_name);
    std::fs::write(&out_path, &output.bytes)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    result.output = Some(out_path);

    if let Some(ref report) = output.report {
        let report_path = dir.join(&output.report_file_name);
        let json = report.to_json().context("Failed to serialize report")?;
        std::fs::write(&report_path, json)
            .with_context(|| format!("Failed to write {}", report_path.display()))?;
        result.report = Some(report_path);
    }

    result.kept = selection.kept_keys().iter().map(|k| k.to_string()).collect();
    result.removed = selection.removed_keys().iter().map(|k| k.to_string()).collect();
    result.reoriented = output.reoriented;
    result.selection = selection;
    Ok(())
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

const CATEGORIES: [Category; 6] = [
    Category::Location,
    Category::Time,
    Category::Camera,
    Category::Attribution,
    Category::Orientation,
    Category::Other,
];

/// Print the projected fields of each image, grouped by category.
fn list_fields(images: &[PathBuf], json: bool) -> Result<()> {
    let mut listings = Vec::new();

    for path in images {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        let redaction = match Redaction::open(name.as_deref(), &bytes) {
            Ok(r) => r,
            Err(e) => {
                log::error!("{}: {e}", path.display());
                continue;
            }
        };

        if json {
            let fields: Vec<serde_json::Value> = redaction
                .fields()
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "key": f.key().to_string(),
                        "category": f.category().to_string(),
                        "value": f.value.to_string(),
                    })
                })
                .collect();
            listings.push(serde_json::json!({
                "path": path.display().to_string(),
                "orientation": redaction.orientation().code(),
                "fields": fields,
            }));
        } else {
            print_fields(path, &redaction);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
    }
    Ok(())
}

fn print_fields(path: &Path, redaction: &Redaction) {
    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let fields = redaction.fields();
    if fields.is_empty() {
        println!("  {DIM}(no EXIF metadata found){RESET}");
        println!();
        return;
    }

    for category in CATEGORIES {
        let group: Vec<&Field> = fields.iter().filter(|f| f.category() == category).collect();
        if group.is_empty() {
            continue;
        }
        println!("  {BOLD}{category}{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for field in group {
            print_row(&field.key().to_string(), &field.value.to_string());
        }
        println!();
    }
}

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 40;
/// Indent for continuation lines (key column width + " : " + 2 leading spaces).
const INDENT: &str = "                                 ";

/// Print a single row in the field table.
fn print_row(key: &str, val: &str) {
    let key_col = format!("{:<28}", key);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {key_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
