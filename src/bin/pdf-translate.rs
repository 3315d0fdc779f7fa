//! CLI binary for edgequake-pdf-translate.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TranslationConfig`, asks for the target language when it was not given,
//! and prints a run summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf_translate::config::validate_language;
use edgequake_pdf_translate::pipeline::input::discover_sources;
use edgequake_pdf_translate::{
    resolve_backend, run, PageSize, ProgressCallback, RunReport, TranslationConfig,
    TranslationProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// One bar, reused for each document in turn, plus a log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, name: &str, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(progress_style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(name.to_string());
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn shorten(error: &str) -> String {
    if error.chars().count() > 80 {
        let head: String = error.chars().take(79).collect();
        format!("{head}\u{2026}")
    } else {
        error.to_string()
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Translating {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, path: &Path, total_pages: usize) {
        self.activate_bar(&file_name(path), total_pages);
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_retry(&self, page_num: usize, attempt: u32, delay: Duration, error: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}  attempt {} failed: {}  {}",
            yellow("↻"),
            page_num,
            attempt,
            shorten(error),
            dim(&format!("retry in {:.1}s", delay.as_secs_f64())),
        ));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&shorten(error)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_complete(&self, output: &Path, translated_pages: usize, total_pages: usize) {
        let mark = if translated_pages == total_pages {
            green("✔")
        } else {
            cyan("⚠")
        };
        self.bar.println(format!(
            "{} {}/{} pages  →  {}",
            mark,
            translated_pages,
            total_pages,
            bold(&output.display().to_string())
        ));
    }

    fn on_document_error(&self, path: &Path, error: &str) {
        self.bar.println(format!(
            "{} {}  {}",
            red("✘"),
            bold(&file_name(path)),
            red(&shorten(error))
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate every PDF in ./books into ./translated_pdfs (asks for the language)
  pdf-translate

  # Non-interactive
  pdf-translate --language Spanish

  # Other directories, A4 pages
  pdf-translate -l German --input-dir scans --output-dir out --page-size a4

  # Another provider
  pdf-translate -l French --provider openai --model gpt-4.1-mini

  # Machine-readable summary
  pdf-translate -l Italian --json > report.json

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  GEMINI_API_KEY          Google Gemini API key
  MISTRAL_API_KEY         Mistral API key
  EDGEQUAKE_PROVIDER      Provider name (anthropic, openai, gemini, mistral, ollama)
  EDGEQUAKE_MODEL         Model ID
"#;

/// Translate PDF documents page by page with an LLM, keeping their images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-translate",
    version,
    about = "Translate PDF documents page by page with an LLM, keeping their images",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Target language, e.g. Spanish. Asked for interactively when omitted.
    #[arg(short, long, env = "PDF_TRANSLATE_LANGUAGE")]
    language: Option<String>,

    /// Directory holding the PDFs to translate.
    #[arg(short, long, env = "PDF_TRANSLATE_INPUT_DIR", default_value = "books")]
    input_dir: PathBuf,

    /// Directory the translated PDFs are written to.
    #[arg(short, long, env = "PDF_TRANSLATE_OUTPUT_DIR", default_value = "translated_pdfs")]
    output_dir: PathBuf,

    /// LLM model ID. Default: claude-3-haiku-20240307 for Anthropic.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: anthropic, openai, gemini, mistral, ollama.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Total translation attempts per page.
    #[arg(long, env = "PDF_TRANSLATE_MAX_ATTEMPTS", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Delay before the first retry in milliseconds; doubles each retry.
    #[arg(long, env = "PDF_TRANSLATE_RETRY_DELAY_MS", default_value_t = 2000)]
    retry_delay_ms: u64,

    /// Output page size.
    #[arg(long, env = "PDF_TRANSLATE_PAGE_SIZE", value_enum, default_value = "letter")]
    page_size: PageSizeArg,

    /// Output file name prefix.
    #[arg(long, env = "PDF_TRANSLATE_PREFIX", default_value = "translated_")]
    prefix: String,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF_TRANSLATE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "PDF_TRANSLATE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_TRANSLATE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_TRANSLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_TRANSLATE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    Letter,
    A4,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::A4 => PageSize::A4,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs when it is active.
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

    // ── Inputs ───────────────────────────────────────────────────────────
    let sources = match discover_sources(&cli.input_dir) {
        Ok(sources) => sources,
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(1);
        }
    };

    let language = match cli.language.clone() {
        Some(language) => language,
        None => tokio::task::block_in_place(prompt_language)?,
    };

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        language,
        progress.clone().map(|cb| cb as ProgressCallback),
    )
    .await?;

    let backend = resolve_backend(&config).context("No translation provider available")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run(&sources, backend.as_ref(), &config).await;
    if let Some(cb) = progress {
        cb.finish();
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }

    if report.written() == 0 {
        anyhow::bail!("no document could be translated");
    }
    Ok(())
}

/// Ask on stdin until a valid language name is entered.
fn prompt_language() -> Result<String> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("Enter the target language (e.g. Spanish, French, German): ");
        io::stderr().flush().ok();
        let Some(line) = lines.next() else {
            anyhow::bail!("no target language given");
        };
        let line = line.context("Failed to read from stdin")?;
        let language = line.trim();
        match validate_language(language) {
            Ok(()) => return Ok(language.to_string()),
            Err(e) => eprintln!("{} {}", red("✘"), e),
        }
    }
}

/// Map CLI args to `TranslationConfig`.
async fn build_config(
    cli: &Cli,
    language: String,
    progress: Option<ProgressCallback>,
) -> Result<TranslationConfig> {
    let mut builder = TranslationConfig::builder()
        .target_language(language)
        .input_dir(&cli.input_dir)
        .output_dir(&cli.output_dir)
        .max_attempts(cli.max_attempts)
        .retry_base_delay_ms(cli.retry_delay_ms)
        .page_size(cli.page_size.into())
        .output_prefix(&cli.prefix);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &RunReport) {
    eprintln!();
    for doc in &report.documents {
        match (&doc.output, &doc.error) {
            (Some(out), None) => {
                let mut line = format!(
                    "{} {}  {}/{} pages  →  {}",
                    if doc.failed_pages.is_empty() {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    file_name(&doc.source),
                    doc.translated_pages.len(),
                    doc.total_pages,
                    out.display()
                );
                if !doc.failed_pages.is_empty() {
                    let pages: Vec<String> =
                        doc.failed_pages.iter().map(|e| e.page().to_string()).collect();
                    line.push_str(&dim(&format!("  (skipped: {})", pages.join(", "))));
                }
                eprintln!("{line}");
            }
            (_, Some(err)) => {
                eprintln!("{} {}  {}", red("✘"), file_name(&doc.source), red(&shorten(err)));
            }
            (None, None) => {}
        }
    }
    eprintln!(
        "{} documents written, {} pages translated into {} in {:.1}s",
        bold(&report.written().to_string()),
        report.translated_pages(),
        report.target_language,
        report.total_duration_ms as f64 / 1000.0
    );
}
