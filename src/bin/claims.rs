//! CLI binary for edgequake-claims.
//!
//! A thin shell over the library crate: maps CLI flags to `ExtractionConfig`,
//! reads documents, and prints the categorized record. It is the only place
//! errors are shown to the user.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_claims::{
    categorize, serialize, write_export, ApiCredential, CategorizedRecord, ClaimsError,
    ExtractedRecord, ExtractionConfig, ExtractionOutput, ExtractionProgressCallback, Extractor,
    ProgressCallback, UploadedDocument,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner. A fresh spinner is started for each document so the
/// same callback serves a whole interactive session.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }

    fn finish(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, name: &str, _mime_type: &str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix(name.to_string());
        bar.set_message("Decoding…");
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_pages_decoded(&self, page_count: usize) {
        self.with_bar(|bar| bar.set_message(format!("{page_count} page(s) decoded")));
    }

    fn on_model_request(&self, model: &str, image_count: usize) {
        self.with_bar(|bar| {
            bar.set_message(format!("Extracting with {model} ({image_count} image(s))…"))
        });
    }

    fn on_cache_hit(&self) {
        self.with_bar(|bar| bar.set_message("Using cached result"));
    }

    fn on_extraction_complete(&self, _field_count: usize) {
        self.finish();
    }

    fn on_error(&self, _kind: &str, _error: &str) {
        self.finish();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract one claim form and print the categorized fields
  claims claim.pdf

  # Raw JSON only, e.g. for piping into jq
  claims --json scan.png | jq .insured_name

  # Export extracted_data_claim.pdf.json into ./out
  claims --output-dir out claim.pdf

  # Interactive session: one path per line, `save` exports the last result
  claims

SUPPORTED FILE TYPES:
  application/pdf   every page is rendered and sent in order
  image/jpeg        one page
  image/png         one page

  The type comes from the file extension; override it with --mime.

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY     Gemini API key (checked first)
  GEMINI_API_KEY     Gemini API key (fallback)
  PDFIUM_LIB_PATH    Path to libpdfium (file or containing directory)
  RUST_LOG           Override the log filter
"#;

/// Extract structured fields from insurance claim documents.
#[derive(Parser, Debug)]
#[command(
    name = "claims",
    version,
    about = "Extract structured fields from insurance claim documents using Gemini",
    long_about = "Read an insurance claim form (PDF, JPEG or PNG), send its pages to a \
Gemini vision model and print the extracted fields grouped into personal, medical, \
financial and other information. Without FILE, starts an interactive session.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Claim document to process. Omit for an interactive session.
    file: Option<PathBuf>,

    /// Declared MIME type, overriding the file extension.
    #[arg(long, env = "CLAIMS_MIME")]
    mime: Option<String>,

    /// TOML secrets file containing GOOGLE_API_KEY.
    #[arg(long, env = "CLAIMS_SECRETS")]
    secrets: Option<PathBuf>,

    /// Gemini model ID.
    #[arg(long, env = "CLAIMS_MODEL", default_value = edgequake_claims::config::DEFAULT_MODEL)]
    model: String,

    /// Gemini API base URL.
    #[arg(long, env = "CLAIMS_API_BASE", default_value = edgequake_claims::config::DEFAULT_API_BASE)]
    api_base: String,

    /// Rendering DPI for PDF pages (72–400).
    #[arg(long, env = "CLAIMS_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Longest rendered edge in pixels.
    #[arg(long, env = "CLAIMS_MAX_PIXELS", default_value_t = 2400)]
    max_pixels: u32,

    /// Model call timeout in seconds.
    #[arg(long, env = "CLAIMS_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "CLAIMS_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max output tokens for the model reply.
    #[arg(long, env = "CLAIMS_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "CLAIMS_PASSWORD")]
    password: Option<String>,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Do not reuse results for identical documents.
    #[arg(long, env = "CLAIMS_NO_CACHE")]
    no_cache: bool,

    /// Print only the raw JSON record.
    #[arg(long, env = "CLAIMS_JSON")]
    json: bool,

    /// Write extracted_data_<file>.json after each successful extraction.
    #[arg(long, env = "CLAIMS_SAVE")]
    save: bool,

    /// Directory for exported JSON files (implies --save).
    #[arg(short, long, env = "CLAIMS_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Disable the spinner.
    #[arg(long, env = "CLAIMS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CLAIMS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "CLAIMS_QUIET")]
    quiet: bool,
}

impl Cli {
    fn export_dir(&self) -> Option<PathBuf> {
        match (&self.output_dir, self.save) {
            (Some(dir), _) => Some(dir.clone()),
            (None, true) => Some(PathBuf::from(".")),
            (None, false) => None,
        }
    }
}

/// The last successful extraction, kept for `save` in interactive mode.
struct LastResult {
    name: String,
    record: Arc<ExtractedRecord>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides all the feedback that matters; keep INFO logs
    // out of its way unless asked for.
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

    // ── Credential (fatal when missing) ──────────────────────────────────
    let credential = match ApiCredential::resolve(cli.secrets.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e);
            std::process::exit(2);
        }
    };
    tracing::debug!("Using API credential from {}", credential.source());

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let extractor = Extractor::gemini(credential, config).context("Failed to set up model client")?;

    match cli.file.clone() {
        Some(path) => {
            if let Err(e) = run_action(&cli, &extractor, &path).await {
                report_error(&e);
                std::process::exit(1);
            }
        }
        None => interactive(&cli, &extractor).await?,
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels)
        .model(cli.model.clone())
        .api_base(cli.api_base.clone())
        .api_timeout_secs(cli.api_timeout)
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_tokens)
        .memoize(!cli.no_cache);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Process one file: show its info, extract, print, optionally export.
async fn run_action(
    cli: &Cli,
    extractor: &Extractor,
    path: &Path,
) -> Result<LastResult, ClaimsError> {
    let document = UploadedDocument::from_path(path, cli.mime.as_deref()).await?;

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}  {}  {}",
            cyan("◆"),
            bold(document.name()),
            dim(&format!("{:.1} KB", document.size_kb())),
            dim(document.mime_type()),
        );
    }

    let output = extractor.process(&document).await?;

    if cli.json {
        println!("{}", serialize(&output.record)?);
    } else {
        print_output(&output, !cli.quiet)?;
    }

    if let Some(dir) = cli.export_dir() {
        let written = write_export(&output.record, &dir, document.name()).await?;
        if !cli.quiet {
            eprintln!("{} Saved {}", green("✔"), bold(&written.display().to_string()));
        }
    }

    Ok(LastResult {
        name: document.name().to_string(),
        record: output.record,
    })
}

fn print_output(output: &ExtractionOutput, show_stats: bool) -> Result<(), ClaimsError> {
    if show_stats {
        let source = if output.from_cache {
            "cached".to_string()
        } else {
            format!(
                "{} tokens in / {} tokens out",
                output.stats.input_tokens, output.stats.output_tokens
            )
        };
        eprintln!(
            "{} {} page(s)  {}ms  {}",
            green("✔"),
            output.page_count,
            output.stats.total_duration_ms,
            dim(&source),
        );
    }

    print_categorized(&categorize(&output.record));

    println!();
    println!("{}", bold("Raw JSON"));
    println!("{}", serialize(&output.record)?);
    Ok(())
}

fn print_categorized(view: &CategorizedRecord) {
    for group in &view.groups {
        println!();
        println!("{}", bold(group.category.title()));
        if group.is_empty() {
            println!("  {}", dim("(no data)"));
        }
        for line in group.lines() {
            println!("  {line}");
        }
    }

    if !view.unclassified.is_empty() {
        println!();
        println!("{}", bold("Unclassified fields"));
        for (key, value) in &view.unclassified {
            println!("  {key}: {}", dim(&value.to_string()));
        }
    }
}

/// The single error presentation boundary.
fn report_error(e: &ClaimsError) {
    eprintln!("{} {}", red(&format!("[{}]", e.kind())), e);
}

/// Read one path per line until `quit` or EOF.
async fn interactive(cli: &Cli, extractor: &Extractor) -> Result<()> {
    eprintln!(
        "{} {}",
        cyan("◆"),
        bold(&format!("claims interactive session ({})", extractor.model_name()))
    );
    eprintln!(
        "  {}",
        dim("Enter a file path to extract, `save` to export the last result, `quit` to exit.")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last: Option<LastResult> = None;

    loop {
        eprint!("{} ", cyan("›"));
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                eprintln!("  <path>   extract fields from a PDF, JPEG or PNG file");
                eprintln!("  save     write extracted_data_<file>.json for the last result");
                eprintln!("  quit     end the session");
            }
            "save" => match &last {
                Some(result) => {
                    let dir = cli.export_dir().unwrap_or_else(|| PathBuf::from("."));
                    match write_export(&result.record, &dir, &result.name).await {
                        Ok(path) => eprintln!(
                            "{} Saved {}",
                            green("✔"),
                            bold(&path.display().to_string())
                        ),
                        Err(e) => report_error(&e),
                    }
                }
                None => eprintln!("  {}", dim("Nothing extracted yet.")),
            },
            path => match run_action(cli, extractor, Path::new(unquote(path))).await {
                Ok(result) => last = Some(result),
                Err(e) => report_error(&e),
            },
        }
    }

    Ok(())
}

/// Strip one pair of matching quotes, as left by drag-and-drop into a terminal.
fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return inner;
        }
    }
    s
}
