//! CLI binary for edgequake-pdf2text.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `HybridConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2text::{
    inspect, process, HybridConfig, PageMethod, PageSeparator, ProcessingProgressCallback,
    ProcessingResponse, ProgressCallback, RasterFormat, TriageReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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

/// Terminal progress: a spinner during triage, then a bar over the OCR pages.
/// OCR pages complete out of order, so per-page start times are keyed by page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    text_pages: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Triage");
        bar.set_message("Reading text layer…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            text_pages: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ProcessingProgressCallback for CliProgressCallback {
    fn on_triage(&self, page_count: usize, accepted: bool, reason: &str) {
        let verdict = if accepted {
            green("text layer accepted")
        } else {
            cyan("per-page triage")
        };
        self.bar.println(format!(
            "{} {} pages: {}  {}",
            cyan("◆"),
            bold(&page_count.to_string()),
            verdict,
            dim(reason)
        ));
    }

    fn on_page_classified(&self, _page_num: usize, method: PageMethod) {
        if method == PageMethod::Text {
            self.text_pages.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_ocr_start(&self, pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {} pages from text layer, {} pages to OCR",
            cyan("◆"),
            self.text_pages.load(Ordering::SeqCst),
            bold(&pages.to_string())
        ));
    }

    fn on_ocr_page_start(&self, page_num: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_ocr_page_complete(&self, page_num: usize, text_len: usize, confidence: f64) {
        self.bar.println(format!(
            "  {} Page {:>3}  {:<8}  {}  {}",
            green("✓"),
            page_num,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("conf {confidence:.2}")),
            dim(&format!("{:.1}s", self.elapsed_secs(page_num))),
        ));
        self.bar.inc(1);
    }

    fn on_ocr_page_error(&self, page_num: usize, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}  {}  {}",
            red("✗"),
            page_num,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs(page_num))),
        ));
        self.bar.inc(1);
    }

    fn on_complete(&self, page_count: usize, skipped_pages: usize) {
        self.bar.finish_and_clear();
        if skipped_pages == 0 {
            eprintln!(
                "{} {} pages extracted",
                green("✔"),
                bold(&page_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} skipped)",
                cyan("⚠"),
                bold(&(page_count - skipped_pages).to_string()),
                page_count,
                red(&skipped_pages.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract text (stdout)
  pdf2text document.pdf

  # Write to a file
  pdf2text scanned.pdf -o scanned.txt

  # Vietnamese scan, JPEG pages, 3 OCR calls at a time
  pdf2text --language vi --format jpg --parallel 3 contract.pdf

  # Native text layer only, never call a vision model
  pdf2text --no-ocr document.pdf

  # Show triage decisions without OCR (no API key needed)
  pdf2text --inspect-only document.pdf

  # JSON envelope {success, data, error}
  pdf2text --json document.pdf > output.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY                    OpenAI API key
  ANTHROPIC_API_KEY                 Anthropic API key
  GEMINI_API_KEY                    Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER            Provider for auto-detection (with EDGEQUAKE_MODEL)
  EDGEQUAKE_MODEL                   Model ID
  PDFIUM_LIB_PATH                   Path to libpdfium (file or directory)
  OCR_MAX_FILE_SIZE                 Input size cap in bytes
  OCR_MAX_PAGES                     Max pages sent to OCR per document
  OCR_DEFAULT_DENSITY               Rasterisation DPI
  OCR_MAX_PAGES_PARALLEL            Concurrent OCR calls per batch
  TIMEOUT                           Per-call OCR timeout in seconds
  MAX_RETRIES                       Attempts per OCR call
  MIN_WORD_COUNT, MIN_WORD_DENSITY, MIN_TEXT_ENTROPY,
  MIN_AVERAGE_WORD_LENGTH, OCR_TRIGGER_CONFIDENCE_THRESHOLD
                                    Text-quality validator thresholds
"#;

/// Extract text from PDF files and URLs, using Vision LLM OCR only where the
/// text layer is missing or garbage.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2text",
    version,
    about = "Extract text from PDFs: native text layer where trustworthy, Vision LLM OCR elsewhere",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write text to this file instead of stdout.
    #[arg(short, long, env = "PDF2TEXT_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Rasterisation DPI for OCR pages (72–600). Overrides OCR_DEFAULT_DENSITY.
    #[arg(long, value_parser = clap::value_parser!(u32).range(72..=600))]
    density: Option<u32>,

    /// Page image format sent to the vision model.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Concurrent OCR calls per batch. Overrides OCR_MAX_PAGES_PARALLEL.
    #[arg(long)]
    parallel: Option<usize>,

    /// Document language hint for OCR (e.g. "vi", "French").
    #[arg(long, env = "PDF2TEXT_LANGUAGE")]
    language: Option<String>,

    /// Never call a vision model; return the native text layer.
    #[arg(long, env = "PDF2TEXT_NO_OCR")]
    no_ocr: bool,

    /// Send rendered pages as-is, without grayscale/resize/sharpen.
    #[arg(long, env = "PDF2TEXT_NO_ENHANCE")]
    no_enhance: bool,

    /// Attempts per OCR call. Overrides MAX_RETRIES.
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-call OCR timeout in seconds. Overrides TIMEOUT.
    #[arg(long)]
    api_timeout: Option<u64>,

    /// Stop dispatching OCR after this many seconds; unfinished pages are skipped.
    #[arg(long, env = "PDF2TEXT_DOCUMENT_TIMEOUT")]
    document_timeout: Option<u64>,

    /// Page separator: blank, formfeed, marker, or a custom string.
    #[arg(long, env = "PDF2TEXT_SEPARATOR", default_value = "blank")]
    separator: String,

    /// Path to a text file containing a custom OCR prompt.
    #[arg(long, env = "PDF2TEXT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per page.
    #[arg(long, env = "PDF2TEXT_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2TEXT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Fail when any page was skipped.
    #[arg(long, env = "PDF2TEXT_STRICT")]
    strict: bool,

    /// Output the JSON envelope {success, data, error} instead of text.
    #[arg(long, env = "PDF2TEXT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2TEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Print triage decisions only, no OCR.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2TEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2TEXT_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2TEXT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpg,
}

impl From<FormatArg> for RasterFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => RasterFormat::Png,
            FormatArg::Jpg => RasterFormat::Jpg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ProcessingProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let report = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            print_report(&cli.input, &report);
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let result = process(&cli.input, &config).await;
    let result = if cli.strict {
        result.and_then(|output| output.into_strict())
    } else {
        result
    };

    if cli.json {
        let response = ProcessingResponse::from(result);
        let json =
            serde_json::to_string_pretty(&response).context("Failed to serialise output")?;
        println!("{json}");
        if !response.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    let output = result.context("Extraction failed")?;
    match cli.output {
        Some(ref path) => {
            write_output(path, &output.text).await?;
            if !cli.quiet {
                eprintln!(
                    "{}  {:?}  {} pages  {}ms  →  {}",
                    if output.metadata.skipped_pages == 0 {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    output.metadata.method,
                    output.metadata.page_count,
                    output.metadata.total_processing_time_ms,
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.text.as_bytes())
                .context("Failed to write to stdout")?;
            if !output.text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    // The progress callback already printed a summary.
    if !cli.quiet && !show_progress {
        let m = &output.metadata;
        eprintln!(
            "{:?}: {} pages ({} text, {} OCR, {} skipped) in {}ms",
            m.method, m.page_count, m.text_pages, m.ocr_pages, m.skipped_pages,
            m.total_processing_time_ms
        );
    }

    Ok(())
}

/// Map CLI args onto `HybridConfig`: environment first, explicit flags win.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<HybridConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = HybridConfig::builder()
        .with_env_overrides()
        .context("Invalid environment configuration")?
        .page_separator(parse_separator(&cli.separator))
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout);

    if let Some(n) = cli.max_retries {
        builder = builder.max_retries(n);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(secs) = cli.document_timeout {
        builder = builder.document_timeout_secs(secs);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder
        .map_options(|options| {
            options.enable_ocr = !cli.no_ocr;
            options.ocr.enhance_image = !cli.no_enhance;
            if let Some(density) = cli.density {
                options.ocr.density = density;
            }
            if let Some(format) = cli.format {
                options.ocr.format = format.into();
            }
            if let Some(parallel) = cli.parallel {
                options.ocr.max_pages_parallel = parallel;
            }
            if cli.language.is_some() {
                options.ocr.language = cli.language.clone();
            }
        })
        .build()
        .context("Invalid configuration")
}

/// Parse `--separator` into a `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "blank" | "" => PageSeparator::BlankLine,
        "formfeed" | "ff" => PageSeparator::FormFeed,
        "marker" => PageSeparator::Marker,
        _ => PageSeparator::Custom(s.replace("\\n", "\n")),
    }
}

async fn write_output(path: &std::path::Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let tmp = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp, text)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to write {:?}", path))
}

fn print_report(input: &str, report: &TriageReport) {
    let v = &report.verdict;
    println!("File:         {}", input);
    println!("Pages:        {}", report.page_count);
    println!(
        "Text layer:   {} (confidence {:.2})",
        if v.accepted { "accepted" } else { "rejected" },
        v.validation.confidence
    );
    println!("Reason:       {}", v.reason);
    let m = &v.validation.metrics;
    println!(
        "Metrics:      {} chars, {} words, density {:.3}, entropy {:.2}",
        m.char_length, m.word_count, m.word_density, m.entropy
    );

    if !report.pages.is_empty() {
        println!("OCR pages:    {}", report.ocr_pages().count());
        for page in &report.pages {
            let method = match page.method {
                PageMethod::Text => green("text"),
                PageMethod::Ocr => cyan("ocr"),
            };
            println!("  page {:>4}  {:>6} chars  {}", page.page_number, page.char_length, method);
        }
    }
}
