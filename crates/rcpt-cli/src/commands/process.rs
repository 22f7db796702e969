//! Process command - extract a single receipt.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use rcpt_core::money::format_amount;
use rcpt_core::{Coordinator, FileTextSource, GeminiGenerator, StructuredReceipt, TextSource};

use super::config::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input text file ("-" reads from stdin)
    #[arg(required = true)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Use only the rule-based parser
    #[arg(long)]
    no_ai: bool,

    /// Check the extracted figures add up
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if args.no_ai {
        config.extraction.ai_enabled = false;
    }

    let raw_text = if args.input == "-" {
        info!("Reading receipt text from stdin");
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        let source = FileTextSource::new(&args.input);
        if !source.path().exists() {
            anyhow::bail!("Input file not found: {}", source.path().display());
        }
        info!("Processing file: {}", source.path().display());
        source.read_text()?
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message(if config.extraction.ai_available() {
        "Extracting with AI..."
    } else {
        "Parsing receipt..."
    });

    let coordinator = Coordinator::with_fallback(GeminiGenerator::new()?, config.fallback.clone());
    let receipt = coordinator.extract(&raw_text, &config.extraction).await?;

    pb.finish_and_clear();

    if args.validate {
        let issues = receipt.consistency_issues();
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    let output = format_receipt(&receipt, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_receipt(receipt: &StructuredReceipt, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(receipt)?),
        OutputFormat::Csv => format_csv(receipt),
        OutputFormat::Text => Ok(format_text(receipt)),
    }
}

/// CSV columns shared by single-receipt output and the batch summary.
pub const RECEIPT_COLUMNS: [&str; 11] = [
    "merchant_name",
    "purchased_at",
    "total_amount",
    "subtotal",
    "tax_amount",
    "tip_amount",
    "payment_method",
    "receipt_number",
    "cashier",
    "items",
    "extraction_method",
];

pub fn receipt_record(receipt: &StructuredReceipt) -> [String; 11] {
    [
        receipt.merchant_name.clone().unwrap_or_default(),
        receipt.purchased_at.map(|d| d.to_string()).unwrap_or_default(),
        receipt.total_amount.map(format_amount).unwrap_or_default(),
        receipt.subtotal.map(format_amount).unwrap_or_default(),
        receipt.tax_amount.map(format_amount).unwrap_or_default(),
        receipt.tip_amount.map(format_amount).unwrap_or_default(),
        receipt.payment_method.clone().unwrap_or_default(),
        receipt.receipt_number.clone().unwrap_or_default(),
        receipt.cashier.clone().unwrap_or_default(),
        receipt.items.len().to_string(),
        receipt.extraction_method.to_string(),
    ]
}

fn format_csv(receipt: &StructuredReceipt) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(RECEIPT_COLUMNS)?;
    wtr.write_record(receipt_record(receipt))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(receipt: &StructuredReceipt) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Merchant: {}\n",
        receipt.merchant_name.as_deref().unwrap_or("-")
    ));
    if let Some(purchased_at) = receipt.purchased_at {
        output.push_str(&format!("Date: {}\n", purchased_at));
    }
    if let Some(number) = &receipt.receipt_number {
        output.push_str(&format!("Receipt: {}\n", number));
    }
    if let Some(cashier) = &receipt.cashier {
        output.push_str(&format!("Cashier: {}\n", cashier));
    }
    output.push('\n');

    if !receipt.items.is_empty() {
        output.push_str("Items:\n");
        for item in &receipt.items {
            let price = item.total_price.map(format_amount).unwrap_or_default();
            output.push_str(&format!("  {} x {}  {}\n", item.quantity, item.item_name, price));
        }
        output.push('\n');
    }

    output.push_str("Summary:\n");
    for (label, value) in [
        ("Subtotal", receipt.subtotal),
        ("Tax", receipt.tax_amount),
        ("Tip", receipt.tip_amount),
        ("Total", receipt.total_amount),
    ] {
        if let Some(value) = value {
            output.push_str(&format!("  {:<9} {}\n", format!("{}:", label), format_amount(value)));
        }
    }
    if let Some(method) = &receipt.payment_method {
        output.push_str(&format!("  Paid by:  {}\n", method));
    }

    output.push_str(&format!("\nExtracted by: {}\n", receipt.extraction_method));

    output
}
