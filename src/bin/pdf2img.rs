//! CLI binary for pdf2img.
//!
//! A thin shim over the library crate that maps CLI flags to conversion
//! options, writes the resulting PNGs and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2img::{
    write_images, ConversionOptions, ConversionProgressCallback, ConversionResult, Converter,
    EngineConfig, ProgressCallback, RangeOptions, SourceDocument,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<u32, Instant>>,
}

impl CliProgressCallback {
    /// Starts as a spinner; `on_conversion_start` switches to a bar.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading PDF engine…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: u32) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&page_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Clear the bar if the conversion ended before the first page.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: u32, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: u32, total: usize, image_bytes: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>6} KiB", image_bytes / 1024)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: u32, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages rendered successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages rendered  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # First page at 2x into ./resume_images/
  pdf2img resume.pdf

  # Every page at 1.5x into ./out
  pdf2img --pages all --scale 1.5 -o out slides.pdf

  # A range, with a JSON report on stdout
  pdf2img --pages 2-5 --json report.pdf > report.json

  # Check that the PDF engine can be loaded
  pdf2img --check-engine

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   pdfium library file, or a directory containing it
  PDF2IMG_SCALE     Default for --scale
  PDF2IMG_QUALITY   Default for --quality
  PDF2IMG_PAGES     Default for --pages
  PDF2IMG_OUTPUT    Default for --output
  RUST_LOG          tracing filter, overrides -v / -q
"#;

/// Render PDF pages to PNG images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Render PDF pages to PNG images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    #[arg(required_unless_present = "check_engine")]
    input: Option<PathBuf>,

    /// Directory for the PNG files. Default: `<input stem>_images`.
    #[arg(short, long, env = "PDF2IMG_OUTPUT")]
    output: Option<PathBuf>,

    /// Device pixels per PDF point.
    #[arg(long, env = "PDF2IMG_SCALE", default_value_t = pdf2img::config::DEFAULT_SCALE)]
    scale: f32,

    /// Encoder quality in [0, 1]; higher spends more time compressing.
    #[arg(long, env = "PDF2IMG_QUALITY", default_value_t = pdf2img::config::DEFAULT_QUALITY)]
    quality: f32,

    /// Page selection: 5, 3-15, 3- (to the end) or all.
    #[arg(long, env = "PDF2IMG_PAGES", default_value = "1")]
    pages: String,

    /// pdfium library file or directory.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium: Option<PathBuf>,

    /// Print a JSON report on stdout.
    #[arg(long, env = "PDF2IMG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Load the PDF engine, print its name and exit.
    #[arg(long)]
    check_engine: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET")]
    quiet: bool,
}

/// Parsed `--pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageArg {
    Single(u32),
    Range { start: u32, end: Option<u32> },
}

#[derive(Serialize)]
struct Report<'a> {
    source: &'a str,
    output_dir: &'a std::path::Path,
    results: &'a [ConversionResult],
    written: &'a [PathBuf],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let engine_config = match cli.pdfium.clone() {
        Some(path) => EngineConfig::default().with_library_path(path),
        None => EngineConfig::from_env(),
    };
    let converter = Converter::pdfium(engine_config);

    // ── Engine check ─────────────────────────────────────────────────────
    if cli.check_engine {
        let name = converter
            .loader()
            .engine_name()
            .await
            .context("PDF engine is not available")?;
        println!("{} {}", green("✔"), bold(&name));
        return Ok(());
    }

    let Some(input) = cli.input.as_ref() else {
        anyhow::bail!("No input file given");
    };
    let pages = parse_pages(&cli.pages)?;
    let output_dir = cli.output.clone().unwrap_or_else(|| default_output_dir(input));

    let source = SourceDocument::from_path(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    // ── Run conversion ───────────────────────────────────────────────────
    let start = Instant::now();
    let results = match pages {
        PageArg::Single(page_number) => {
            let options = ConversionOptions::builder()
                .scale(cli.scale)
                .quality(cli.quality)
                .page_number(page_number)
                .build()
                .context("Invalid configuration")?;
            vec![converter.convert_page(&source, &options).await]
        }
        PageArg::Range { start, end } => {
            let progress = show_progress.then(CliProgressCallback::new_dynamic);
            let mut builder = RangeOptions::builder()
                .scale(cli.scale)
                .quality(cli.quality)
                .start_page(start);
            if let Some(end) = end {
                builder = builder.end_page(end);
            }
            if let Some(ref cb) = progress {
                builder = builder.progress_callback(Arc::clone(cb) as ProgressCallback);
            }
            let options = builder.build().context("Invalid configuration")?;
            let results = converter.convert_range(&source, &options).await;
            if let Some(cb) = progress {
                cb.abandon();
            }
            results
        }
    };

    let written = write_images(&results, &output_dir)
        .await
        .context("Failed to write images")?;

    if cli.json {
        let report = Report {
            source: source.name(),
            output_dir: &output_dir,
            results: &results,
            written: &written,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    }

    let ok = results.iter().filter(|r| r.is_success()).count();
    if ok == 0 {
        let first_error = results
            .iter()
            .find_map(ConversionResult::error)
            .unwrap_or("no pages converted");
        anyhow::bail!("{first_error}");
    }

    if !cli.quiet && !cli.json {
        for r in results.iter().filter(|r| !r.is_success()) {
            if !show_progress {
                eprintln!("  {} {}", red("✗"), r.error().unwrap_or_default());
            }
        }
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            if ok == results.len() {
                green("✔")
            } else {
                cyan("⚠")
            },
            ok,
            results.len(),
            start.elapsed().as_millis(),
            bold(&output_dir.display().to_string()),
        );
    }

    Ok(())
}

fn default_output_dir(input: &std::path::Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".to_string());
    input.with_file_name(format!("{stem}_images"))
}

/// Parse `--pages` into a single page or a range.
///
/// An inverted range is passed through; the converter reports it.
fn parse_pages(s: &str) -> Result<PageArg> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageArg::Range {
            start: 1,
            end: None,
        });
    }

    // Range: "3-15" or "3-"
    if let Some((start, end)) = s.split_once('-') {
        let start: u32 = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        let end = match end.trim() {
            "" => None,
            e => Some(e.parse::<u32>().context("Invalid end page in range")?),
        };
        if end == Some(0) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got 0)");
        }
        return Ok(PageArg::Range { start, end });
    }

    // Single page: "5"
    let page: u32 = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageArg::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_page_selections() {
        assert_eq!(parse_pages("3").unwrap(), PageArg::Single(3));
        assert_eq!(
            parse_pages("ALL").unwrap(),
            PageArg::Range {
                start: 1,
                end: None
            }
        );
        assert_eq!(
            parse_pages(" 2-5 ").unwrap(),
            PageArg::Range {
                start: 2,
                end: Some(5)
            }
        );
        assert_eq!(
            parse_pages("4-").unwrap(),
            PageArg::Range {
                start: 4,
                end: None
            }
        );
        assert_eq!(
            parse_pages("5-2").unwrap(),
            PageArg::Range {
                start: 5,
                end: Some(2)
            }
        );
    }

    #[test]
    fn rejects_bad_page_selections() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("0-3").is_err());
        assert!(parse_pages("2-0").is_err());
        assert!(parse_pages("x").is_err());
        assert!(parse_pages("1,3").is_err());
    }

    #[test]
    fn default_output_dir_sits_next_to_input() {
        assert_eq!(
            default_output_dir(std::path::Path::new("/tmp/docs/cv.pdf")),
            PathBuf::from("/tmp/docs/cv_images")
        );
    }
}
