//! CLI binary for pdf2md-batch.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! wires Ctrl-C to the batch interrupt handle, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2md_batch::{
    BatchConfig, BatchConverter, BatchProgressCallback, BatchSummary, ConversionConfig, Converter,
    LlmTranslator, PdfiumTextSource, Pdf2MdError, TranslationMode, Translator,
    DEFAULT_CHECKPOINT_FILE,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
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

/// Terminal progress: one bar for the batch, one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Looking for documents…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn short_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize, already_done: usize, pending: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(pending as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(&format!("{total} document(s) found")),
            dim(&format!("{already_done} already done, {pending} to process")),
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, path: &Path) {
        self.bar.set_message(Self::short_name(path));
    }

    fn on_file_complete(&self, index: usize, total: usize, path: &Path, pages_translated: usize) {
        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}  {}",
            green("✓"),
            index,
            total,
            Self::short_name(path),
            dim(&format!("{pages_translated} page(s) translated")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, path: &Path, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        let msg = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };
        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}  {}",
            red("✗"),
            index,
            total,
            Self::short_name(path),
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _summary: &BatchSummary) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert and translate a whole tree (English → Portuguese)
  pdf2md-batch ./pdfs ./markdown

  # Extraction only, no translation
  pdf2md-batch --no-translate ./pdfs ./markdown

  # First 20 pending files, 4 at a time
  pdf2md-batch --limit 20 --concurrency 4 ./pdfs ./markdown

  # A single file
  pdf2md-batch report.pdf -o report.md

  # Spanish → English with a specific model
  pdf2md-batch --source-lang es --target-lang en --model gpt-4.1-mini ./in ./out

RESUMING:
  Completed files are recorded in the checkpoint file (default
  ./conversion_progress.json) after each success. Press Ctrl-C to stop:
  files in flight finish, the checkpoint is saved, and running the same
  command again continues with the remaining files. The checkpoint is
  deleted once every file has been converted.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (default: ./ then system path)

  Without any API key the batch still runs, with translation disabled.
"#;

/// Convert a tree of PDF files to Markdown, translating where needed.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md-batch",
    version,
    about = "Convert a tree of PDF files to Markdown, translating pages that need it",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source directory (searched recursively) or a single PDF file.
    input: PathBuf,

    /// Destination directory for the mirrored Markdown tree.
    #[arg(env = "PDF2MD_DEST")]
    dest: Option<PathBuf>,

    /// Output file in single-file mode (default: next to the source).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip translation; only extract and reflow.
    #[arg(long, env = "PDF2MD_NO_TRANSLATE")]
    no_translate: bool,

    /// Maximum characters per translation call.
    #[arg(long, env = "PDF2MD_CHUNK_SIZE", default_value_t = 3500)]
    chunk_size: usize,

    /// Process at most this many pending files.
    #[arg(short, long, env = "PDF2MD_LIMIT")]
    limit: Option<usize>,

    /// Files converted at the same time.
    #[arg(short, long, env = "PDF2MD_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Checkpoint file recording completed sources.
    #[arg(long, env = "PDF2MD_CHECKPOINT", default_value = DEFAULT_CHECKPOINT_FILE)]
    checkpoint: PathBuf,

    /// Language translated from.
    #[arg(long, env = "PDF2MD_SOURCE_LANG", default_value = "en")]
    source_lang: String,

    /// Language of the output.
    #[arg(long, env = "PDF2MD_TARGET_LANG", default_value = "pt")]
    target_lang: String,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Pause between translation calls within one file, in milliseconds.
    #[arg(long, env = "PDF2MD_DELAY_MS", default_value_t = 300)]
    delay_ms: u64,

    /// Retries per chunk on translation failure (at most 10).
    #[arg(long, env = "PDF2MD_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call translation timeout in seconds.
    #[arg(long, env = "PDF2MD_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Translate each document as one stream instead of page by page.
    #[arg(long)]
    whole_document: bool,

    /// Keep blank lines from the PDF as paragraph separators.
    #[arg(long)]
    keep_blank_lines: bool,

    /// Path to a text file containing a custom translation prompt.
    #[arg(long, env = "PDF2MD_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2MD_PASSWORD")]
    password: Option<String>,

    /// Print the summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs when it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.input.is_dir();
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

    let conversion = build_conversion_config(&cli).await?;
    let source = Arc::new(pdfium_source(&cli));
    let translator = resolve_translator(&conversion, cli.quiet)?;

    if cli.input.is_file() {
        return convert_single(&cli, conversion, source, translator).await;
    }

    let dest = cli
        .dest
        .clone()
        .context("A destination directory is required when the input is a directory")?;

    let mut builder = BatchConfig::builder(&cli.input, dest)
        .checkpoint_path(&cli.checkpoint)
        .file_limit(cli.limit)
        .concurrency(cli.concurrency)
        .conversion(conversion);
    if show_progress {
        builder = builder.progress_callback(CliProgressCallback::new());
    }
    let config = builder.build().context("Invalid configuration")?;

    let batch = BatchConverter::new(config, source, translator).context("Invalid configuration")?;

    // ── Ctrl-C: stop starting files, save progress ───────────────────────
    let interrupt = batch.interrupt_handle();
    let quiet = cli.quiet;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.trigger();
            if !quiet {
                eprintln!(
                    "\n{} Interrupt received: finishing files in progress and saving the checkpoint…",
                    cyan("◆")
                );
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });

    let summary = batch.run().await.context("Batch failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_conversion_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .translate(!cli.no_translate)
        .source_lang(&cli.source_lang)
        .target_lang(&cli.target_lang)
        .chunk_max_chars(cli.chunk_size)
        .call_delay_ms(cli.delay_ms)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .keep_blank_lines(cli.keep_blank_lines);

    if cli.whole_document {
        builder = builder.translation_mode(TranslationMode::WholeDocument);
    }
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

    builder.build().context("Invalid configuration")
}

fn pdfium_source(cli: &Cli) -> PdfiumTextSource {
    let mut source = PdfiumTextSource::new();
    if let Some(ref lib) = cli.pdfium_lib {
        source = source.with_library_path(lib);
    }
    if let Some(ref password) = cli.password {
        source = source.with_password(password);
    }
    source
}

/// Build the LLM translator, or continue without translation when no
/// provider is configured.
fn resolve_translator(
    config: &ConversionConfig,
    quiet: bool,
) -> Result<Option<Arc<dyn Translator>>> {
    if !config.translate {
        return Ok(None);
    }
    match LlmTranslator::from_config(config) {
        Ok(t) => Ok(Some(Arc::new(t))),
        Err(Pdf2MdError::ProviderNotConfigured { provider, hint }) => {
            warn!("Translation disabled: provider '{}' not configured", provider);
            if !quiet {
                eprintln!(
                    "{} No translation provider available, continuing without translation.\n   {}",
                    cyan("⚠"),
                    dim(hint.lines().next().unwrap_or_default())
                );
            }
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to set up translation"),
    }
}

async fn convert_single(
    cli: &Cli,
    conversion: ConversionConfig,
    source: Arc<PdfiumTextSource>,
    translator: Option<Arc<dyn Translator>>,
) -> Result<()> {
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("md"));
    let converter = Converter::new(conversion, source, translator).context("Invalid configuration")?;

    let stats = converter
        .convert_to_file(&cli.input, &output_path)
        .await
        .context("Conversion failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} page(s), {} translated  {}ms  →  {}",
            green("✔"),
            stats.total_pages,
            stats.pages_translated,
            stats.duration_ms,
            bold(&output_path.display().to_string()),
        );
        if stats.chunks_failed > 0 {
            eprintln!(
                "   {} chunk(s) kept in the original language after failed translation",
                stats.chunks_failed
            );
        }
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    eprintln!(
        "{} {} total  {} succeeded  {} failed  {}",
        if summary.failed == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        bold(&summary.total.to_string()),
        green(&summary.succeeded.to_string()),
        if summary.failed == 0 {
            dim("0")
        } else {
            red(&summary.failed.to_string())
        },
        dim(&format!("({} done in earlier runs)", summary.already_done)),
    );

    if summary.interrupted {
        eprintln!(
            "{} Stopped early: {} file(s) remaining. Run the same command again to resume.",
            cyan("◆"),
            summary.remaining
        );
    } else if summary.remaining > 0 {
        eprintln!(
            "   {} file(s) not yet converted; run again to retry them.",
            summary.remaining
        );
    }
}
