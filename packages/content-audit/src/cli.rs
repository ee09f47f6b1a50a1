//! Command-line interface for content audits.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::adapter::LlmAdapter;
use crate::client::OpenAiClient;
use crate::config::{ClientConfig, IMAGE_EXTENSIONS};
use crate::error::{AuditError, Result};
use crate::loader::{ItemLoader, LoadOptions, MediaLoader, TextLoader};
use crate::manager::{AuditManager, BatchErrorPolicy, ChoicePolicy};
use crate::model::{AuditOptionsItem, AuditResult, AuditText, TokenUsage};

/// Content Audit - Classify texts against rubrics with an LLM.
#[derive(Parser)]
#[command(name = "content-audit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit every text against every rubric.
    Audit {
        /// Rubric JSON file (repeatable)
        #[arg(short, long = "item")]
        items: Vec<PathBuf>,

        /// Directory of rubric JSON files
        #[arg(long)]
        items_dir: Option<PathBuf>,

        /// Text file, image file or directory of texts (repeatable)
        #[arg(short, long = "text", required = true)]
        texts: Vec<PathBuf>,

        /// Model name (default: LLM_MODEL or the built-in default)
        #[arg(short, long)]
        model: Option<String>,

        /// Only load the top level of text directories
        #[arg(long)]
        no_recursive: bool,

        /// Encoding of text files (e.g. utf-8, gbk)
        #[arg(long, default_value = "utf-8")]
        encoding: String,

        /// Accept choices outside the rubric's options
        #[arg(long)]
        lenient: bool,

        /// Record failed pairs instead of aborting the batch
        #[arg(long)]
        continue_on_error: bool,

        /// Print one JSON result per line
        #[arg(long)]
        json: bool,
    },
}

/// Arguments of the `audit` command.
struct AuditArgs {
    items: Vec<PathBuf>,
    items_dir: Option<PathBuf>,
    texts: Vec<PathBuf>,
    model: Option<String>,
    load_options: LoadOptions,
    lenient: bool,
    continue_on_error: bool,
    json: bool,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Audit {
            items,
            items_dir,
            texts,
            model,
            no_recursive,
            encoding,
            lenient,
            continue_on_error,
            json,
        } => audit_command(AuditArgs {
            items,
            items_dir,
            texts,
            model,
            load_options: LoadOptions {
                recursive: !no_recursive,
                encoding,
            },
            lenient,
            continue_on_error,
            json,
        }),
    }
}

/// Execute the audit command.
fn audit_command(args: AuditArgs) -> Result<()> {
    // Load everything before building the client so input errors surface first
    let items = load_items(&args.items, args.items_dir.as_deref())?;
    let texts = load_texts(&args.texts, &args.load_options)?;

    let mut config = ClientConfig::from_env()?;
    if let Some(model) = args.model {
        config.model = model;
    }

    let client = OpenAiClient::new(&config)?;
    let adapter = LlmAdapter::new(&client, config.model.as_str())?
        .temperature(config.temperature)
        .max_tokens(config.max_tokens)
        .json_mode(config.json_mode);

    let manager = AuditManager::new(adapter)
        .choice_policy(if args.lenient {
            ChoicePolicy::Lenient
        } else {
            ChoicePolicy::Strict
        })
        .on_error(if args.continue_on_error {
            BatchErrorPolicy::ContinueOnError
        } else {
            BatchErrorPolicy::Abort
        });

    if !args.json {
        println!(
            "{} {} text(s) against {} rubric(s) with {}",
            style("Auditing").bold(),
            style(texts.len()).cyan(),
            style(items.len()).cyan(),
            style(&config.model).green()
        );
        println!();
    }

    let total = (texts.len() * items.len()) as u64;
    let pb = if args.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total)
    };
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("valid template"),
    );

    let outcome = manager.audit_batch_with_progress(&texts, &items, |result| {
        pb.set_message(result.item_name.clone());
        pb.inc(1);
    });
    pb.finish_and_clear();
    let results = outcome?;

    if args.json {
        return write_json_lines(std::io::stdout().lock(), &results);
    }

    for result in &results {
        print_result(result, &texts);
    }
    print_summary(&results);

    Ok(())
}

/// Write one JSON object per result, each on its own line.
fn write_json_lines<W: Write>(mut out: W, results: &[AuditResult]) -> Result<()> {
    for result in results {
        serde_json::to_writer(&mut out, result).map_err(io::Error::from)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn load_items(files: &[PathBuf], dir: Option<&Path>) -> Result<Vec<AuditOptionsItem>> {
    let mut items = ItemLoader::from_json_files(files)?;
    if let Some(dir) = dir {
        items.extend(ItemLoader::from_dir(dir)?);
    }
    if items.is_empty() {
        return Err(AuditError::InvalidItem {
            name: "<none>".to_string(),
            reason: "no rubrics given, use --item or --items-dir".to_string(),
        });
    }
    Ok(items)
}

/// Load text paths in order. Image files go through the media loader.
fn load_texts(paths: &[PathBuf], options: &LoadOptions) -> Result<Vec<AuditText>> {
    let mut texts = Vec::new();
    for path in paths {
        if path.is_file() && is_image(path) {
            texts.push(MediaLoader::from_file(path)?);
        } else {
            texts.extend(TextLoader::from_path(path, options)?);
        }
    }
    Ok(texts)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|(known, _)| known.eq_ignore_ascii_case(ext))
        })
}

fn print_result(result: &AuditResult, texts: &[AuditText]) {
    let source = texts
        .iter()
        .find(|t| t.id() == result.text_id)
        .and_then(AuditText::source)
        .unwrap_or("<inline>");

    let choice = if result.is_error() {
        style(result.decision.choice.as_str()).red().bold()
    } else if result.annotations.is_empty() {
        style(result.decision.choice.as_str()).green().bold()
    } else {
        style(result.decision.choice.as_str()).yellow().bold()
    };

    println!("{} {} {}", style(source).dim(), style(&result.item_name).cyan(), choice);
    if !result.decision.reason.is_empty() {
        println!("  {}", result.decision.reason);
    }
}

fn print_summary(results: &[AuditResult]) {
    let mut usage = TokenUsage::default();
    for result in results {
        usage.add(&result.token_usage);
    }
    let failed = results.iter().filter(|r| r.is_error()).count();

    println!();
    println!(
        "{} {} result(s), {} failed, {} input / {} output tokens",
        style("Done:").green().bold(),
        results.len(),
        if failed > 0 {
            style(failed).red().bold()
        } else {
            style(failed)
        },
        usage.input_tokens,
        usage.output_tokens
    );
}
