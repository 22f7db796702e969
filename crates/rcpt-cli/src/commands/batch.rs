//! Batch processing command for multiple receipt text files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use rcpt_core::{
    Coordinator, ExtractionConfig, FileTextSource, GeminiGenerator, JsonFileSink, ReceiptSink,
    StructuredReceipt, TextGenerator, TextSource,
};

use super::config::load_config;
use super::process::{format_receipt, receipt_record, OutputFormat, RECEIPT_COLUMNS};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching receipt text files
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of receipts extracted concurrently
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Use only the rule-based parser
    #[arg(long)]
    no_ai: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    receipt: Option<StructuredReceipt>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if args.no_ai {
        config.extraction.ai_enabled = false;
    }

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let coordinator = Coordinator::with_fallback(GeminiGenerator::new()?, config.fallback.clone());
    let extraction = &config.extraction;
    let coordinator = &coordinator;

    let mut pending = stream::iter(files)
        .map(|path| async move {
            let file_start = Instant::now();
            let result = process_single_file(&path, coordinator, extraction).await;
            (path, result, file_start.elapsed().as_millis() as u64)
        })
        .buffer_unordered(args.jobs.max(1));

    let mut results = Vec::new();
    while let Some((path, result, processing_time_ms)) = pending.next().await {
        match result {
            Ok(receipt) => results.push(ProcessResult {
                path,
                receipt: Some(receipt),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        receipt: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    overall_pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    // Completion order is arbitrary
    results.sort_by(|a, b| a.path.cmp(&b.path));

    if let Some(output_dir) = &args.output_dir {
        write_outputs(output_dir, &results, args.format)?;
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful = results.iter().filter(|r| r.receipt.is_some()).count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn process_single_file<G: TextGenerator>(
    path: &Path,
    coordinator: &Coordinator<G>,
    config: &ExtractionConfig,
) -> anyhow::Result<StructuredReceipt> {
    let source = FileTextSource::new(path);
    let text = source.read_text()?;
    Ok(coordinator.extract(&text, config).await?)
}

fn write_outputs(output_dir: &Path, results: &[ProcessResult], format: OutputFormat) -> anyhow::Result<()> {
    let sink = JsonFileSink::new(output_dir);

    for result in results {
        let Some(receipt) = &result.receipt else {
            continue;
        };
        let name = FileTextSource::new(&result.path).name().to_string();

        let output_path = match format {
            OutputFormat::Json => sink.store(&name, receipt)?.location,
            OutputFormat::Csv | OutputFormat::Text => {
                let output_path = output_dir.join(format!("{}.{}", name, format.extension()));
                fs::write(&output_path, format_receipt(receipt, format)?)?;
                output_path
            }
        };

        debug!("Wrote output to {}", output_path.display());
    }

    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["filename", "status"];
    header.extend(RECEIPT_COLUMNS);
    header.extend(["processing_time_ms", "error"]);
    wtr.write_record(&header)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let mut record = vec![filename.to_string()];
        match &result.receipt {
            Some(receipt) => {
                record.push("success".to_string());
                record.extend(receipt_record(receipt));
            }
            None => {
                record.push("error".to_string());
                record.extend(RECEIPT_COLUMNS.map(|_| String::new()));
            }
        }
        record.push(result.processing_time_ms.to_string());
        record.push(result.error.clone().unwrap_or_default());

        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
