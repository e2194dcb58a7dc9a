//! CLI binary for note2md.
//!
//! A thin shim over the library crate: maps flags to `Config` and
//! `ConvertOptions`, wires an indicatif progress bar into the library's
//! progress hooks, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use note2md::{
    convert_directory, convert_file, extract, Config, ConvertOptions, ConvertProgress,
    VisionBridge,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI progress sink using indicatif ────────────────────────────────────

struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(CliProgress { bar })
    }
}

impl ConvertProgress for CliProgress {
    fn on_file_start(&self, input: &Path, page_count: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_style(style);
        self.bar.set_length(page_count as u64);
        self.bar.set_position(0);
        self.bar.set_prefix("Transcribing");
        self.bar.println(format!(
            "{} {} ({page_count} pages)",
            green("◆"),
            bold(&input.display().to_string())
        ));
    }

    fn on_page_transcribed(&self, _page: usize, _page_count: usize) {
        self.bar.inc(1);
    }

    fn on_file_complete(&self, _input: &Path, output: &Path) {
        self.bar.println(format!(
            "  {} {}",
            green("✓"),
            dim(&output.display().to_string())
        ));
    }
}

/// Convert Supernote notebooks, PDFs, and PNGs to Markdown using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "note2md",
    version,
    about = "Convert Supernote .note files (and PDFs / PNGs) to Markdown using Vision LLMs",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the TOML config file.
    #[arg(short, long, global = true, env = "NOTE2MD_CONFIG")]
    config: Option<PathBuf>,

    /// Output root directory.
    #[arg(short, long, global = true, default_value = "supernote")]
    output: PathBuf,

    /// Reconvert even when the input is unchanged or the output was edited.
    #[arg(short, long, global = true)]
    force: bool,

    /// Override the configured vision model.
    #[arg(short, long, global = true, env = "NOTE2MD_MODEL")]
    model: Option<String>,

    /// Disable the progress bar.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Log level filter (error, warn, info, debug, trace).
    #[arg(short, long, global = true, default_value = "warn")]
    level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a single .note, .pdf, or .png file.
    File { path: PathBuf },
    /// Convert every supported file under a directory.
    Directory { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.level)),
        )
        .with_writer(io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path).context("Failed to load configuration")?;
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }

    let bridge = VisionBridge::from_config(&config).context("No vision provider available")?;
    let options = ConvertOptions {
        force: cli.force,
        progress: if cli.no_progress {
            None
        } else {
            Some(CliProgress::new() as Arc<dyn ConvertProgress>)
        },
    };

    match &cli.command {
        Command::File { path } => {
            let extractor = extract::for_path(path)?;
            match convert_file(
                extractor.as_ref(),
                &bridge,
                path,
                &cli.output,
                &config,
                &options,
            )
            .await
            {
                Ok(output) => println!("{}", output.display()),
                Err(e) if e.is_refusal() => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
                Err(e) => return Err(e).context("Conversion failed"),
            }
        }
        Command::Directory { path } => {
            let outputs = convert_directory(&bridge, path, &cli.output, &config, &options)
                .await
                .context("Directory conversion failed")?;
            for output in &outputs {
                println!("{}", output.display());
            }
            eprintln!(
                "{} {} file(s) converted",
                green("✔"),
                bold(&outputs.len().to_string())
            );
        }
    }

    Ok(())
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("note2md.toml")
}
