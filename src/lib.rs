//! Codecopy library crate
//!
//! This crate adds copy-to-clipboard buttons to the code blocks of an already
//! rendered HTML page. It is organized into small modules: `document` (the
//! in-memory page tree), `html` (reading and writing pages), `clipboard` (the
//! clipboard capability and its implementations), `config` (settings) and
//! `augmentor` (finding blocks, attaching controls, handling activations).
//! The binary `src/main.rs` calls `codecopy_lib::run()` to execute the CLI.
//!
//! Public API
//!
//! - [`augmentor::Augmentor`] — the page enhancement pass and click handler.
//! - `run()` — CLI entrypoint used by the binary.
//!
//! Library users embedding a page host drive the augmentor directly:
//!
//! ```no_run
//! use codecopy_lib::augmentor::{self, Augmentor};
//! use codecopy_lib::clipboard::SystemClipboard;
//! use codecopy_lib::config::Settings;
//!
//! # async fn demo() {
//! let mut page = codecopy_lib::html::parse("<pre><code>cargo build</code></pre>");
//! let aug = Augmentor::new(Settings::default(), SystemClipboard::new());
//! let controls = aug.run(&mut page);
//! let page = augmentor::share(page);
//! aug.on_activate(&page, &controls[0]).await;
//! # }
//! ```

pub mod augmentor;
pub mod clipboard;
pub mod config;
pub mod document;
pub mod html;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::augmentor::{Activation, Augmentor, label, lock, share};
use crate::clipboard::{Clipboard, RecordingClipboard, SystemClipboard};
use crate::config::Settings;
use crate::document::Document;

/// Top-level CLI types and runner. Keep `main.rs` thin.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON settings file (any subset of the fields printed by `config`)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Log debug events to stderr
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Attach a copy button to every code block of a page
    Augment {
        /// Rendered HTML page (`-` for stdin)
        input: String,

        /// Where to write the augmented page (default: stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// List the code blocks a page contains
    Blocks {
        /// Rendered HTML page (`-` for stdin)
        input: String,
    },
    /// Press the copy button of one code block
    Copy {
        /// Rendered HTML page (`-` for stdin)
        input: String,

        /// Zero-based position of the code block in the page
        #[arg(short = 'i', long = "index", default_value_t = 0usize)]
        index: usize,

        /// Print the copied text instead of touching the system clipboard
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Print the effective settings as JSON
    Config,
}

/// Run the Codecopy CLI.
///
/// Behavior summary:
/// - `augment` — parse a page, attach one control per code block, write it back.
/// - `blocks` — print each code block's position, placement and first line.
/// - `copy` — activate one control, printing the label before and after the
///   revert delay.
/// - `config` — print the settings in effect.
///
/// Example:
///
/// ```no_run
/// # async fn demo() -> anyhow::Result<()> {
/// codecopy_lib::run().await // called from src/main.rs
/// # }
/// ```
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Augment { input, output } => {
            let mut page = read_page(&input)?;
            Augmentor::new(settings, SystemClipboard::new()).run(&mut page);
            let rendered = html::serialize(&page);
            match output {
                Some(path) => std::fs::write(&path, rendered)
                    .with_context(|| format!("Failed to write page: {}", path.display()))?,
                None => print!("{}", rendered),
            }
        }
        Commands::Blocks { input } => {
            let mut page = read_page(&input)?;
            let controls = Augmentor::new(settings, SystemClipboard::new()).run(&mut page);
            for (i, control) in controls.iter().enumerate() {
                let text = page.text_content(control.block().node());
                let first_line = text.lines().next().unwrap_or("");
                println!("{}: {:?} {}", i, control.placement(), first_line);
            }
        }
        Commands::Copy {
            input,
            index,
            dry_run,
        } => {
            let page = read_page(&input)?;
            if dry_run {
                let augmentor = Augmentor::new(settings, RecordingClipboard::new());
                press(&augmentor, page, index).await?;
                if let Some(text) = augmentor.clipboard().last() {
                    println!("--- copied ---");
                    println!("{}", text);
                }
            } else {
                let augmentor = Augmentor::new(settings, SystemClipboard::new());
                press(&augmentor, page, index).await?;
            }
        }
        Commands::Config => {
            println!("{}", settings.to_json()?);
        }
    }
    Ok(())
}

/// Augment `page`, activate control `index` and report the label transitions.
async fn press<C: Clipboard>(
    augmentor: &Augmentor<C>,
    mut page: Document,
    index: usize,
) -> Result<Activation> {
    let controls = augmentor.run(&mut page);
    let control = controls.get(index).copied().with_context(|| {
        format!("no code block #{} (page has {})", index, controls.len())
    })?;

    let page = share(page);
    let outcome = augmentor.on_activate(&page, &control).await;
    println!("label: {}", label(&lock(&page), &control));

    match outcome {
        Activation::Copied => {}
        Activation::Failed => eprintln!("warning: failed to copy to clipboard"),
        Activation::Inert => return Ok(outcome),
    }

    // Give the revert timer a little headroom before looking again.
    let settle = augmentor.settings().revert_delay() + std::time::Duration::from_millis(50);
    tokio::time::sleep(settle).await;
    println!("label: {}", label(&lock(&page), &control));
    Ok(outcome)
}

fn read_page(input: &str) -> Result<Document> {
    let source = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read page from stdin")?;
        buf
    } else {
        let path = Path::new(input);
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page: {}", path.display()))?
    };
    Ok(html::parse(&source))
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .try_init();
}
