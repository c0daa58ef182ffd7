//! Convert command - statement XML to ledger imports.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use bnk_core::delegate::provider_from_config;
use bnk_core::models::{ClassifiedTransaction, Contractor};
use bnk_core::{
    ConversionResult, ConverterConfig, ExportOptions, HybridConverter, LedgerExporter,
    MemoryCache, NoopCache, ReasoningProvider, ResultCache, StatementParser,
};

use super::{default_cache_path, load_config};
use crate::directory::load_contractors;

/// Arguments for the convert command.
#[derive(Args)]
pub struct ConvertArgs {
    /// Statement file or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory (defaults to each statement's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Contractor directory (JSON or CSV)
    #[arg(short = 'k', long)]
    contractors: Option<PathBuf>,

    /// Never call the external reasoning service
    #[arg(long)]
    no_ai: bool,

    /// Do not read or write the extraction cache
    #[arg(long)]
    no_cache: bool,

    /// Cache file (defaults to the user data directory)
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Month for the ledger document number (defaults to the statement's month)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Drop expenses before conversion
    #[arg(long)]
    skip_negative: bool,

    /// Keep bank fee lines
    #[arg(long)]
    keep_bank_fees: bool,

    /// Also write a per-transaction summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue with the next file when a statement cannot be read
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome for one statement file.
struct FileResult {
    path: PathBuf,
    conversion: Option<ConversionResult>,
    error: Option<String>,
}

pub async fn run(args: ConvertArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    apply_overrides(&mut config, &args);

    let files = expand_input(&args.input)?;
    println!(
        "{} Found {} statement file(s)",
        style("ℹ").blue(),
        files.len()
    );

    let contractors: Vec<Contractor> = match &args.contractors {
        Some(path) => load_contractors(path)?,
        None => Vec::new(),
    };
    if contractors.is_empty() {
        warn!("no contractor directory, expenses will need manual assignment");
    }

    let cache_path = args.cache_file.clone().unwrap_or_else(default_cache_path);
    let cache: Box<dyn ResultCache> = if config.processing.use_cache {
        match MemoryCache::load(&cache_path) {
            Ok(cache) => Box::new(cache),
            Err(e) => {
                warn!(path = %cache_path.display(), error = %e, "ignoring unreadable cache");
                Box::new(MemoryCache::new())
            }
        }
    } else {
        Box::new(NoopCache)
    };

    let provider = if args.no_ai {
        None
    } else {
        provider_from_config(&config.reasoning)?
    };
    match &provider {
        Some(p) => info!(provider = %p.name(), "external reasoning enabled"),
        None => println!(
            "{} External reasoning disabled, uncertain items need manual input",
            style("ℹ").blue()
        ),
    }

    let mut converter = HybridConverter::new(config.clone())
        .with_cache(cache)
        .with_contractors(contractors)
        .with_optional_provider(provider);

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} statements")?
            .progress_chars("=>-"),
    );

    let parser = StatementParser::new();
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        pb.set_message(path.display().to_string());
        let outcome = convert_file(&path, &parser, &mut converter, &config, &args).await;

        match outcome {
            Ok(conversion) => results.push(FileResult {
                path,
                conversion: Some(conversion),
                error: None,
            }),
            Err(e) => {
                let message = format!("{e:#}");
                if !args.continue_on_error {
                    error!("Failed to convert {}: {}", path.display(), message);
                    pb.abandon();
                    return Err(e);
                }
                warn!("Failed to convert {}: {}", path.display(), message);
                results.push(FileResult {
                    path,
                    conversion: None,
                    error: Some(message),
                });
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if config.processing.use_cache {
        match converter.save_cache(&cache_path) {
            Ok(()) => debug!(path = %cache_path.display(), "cache saved"),
            Err(e) => warn!(path = %cache_path.display(), error = %e, "could not save cache"),
        }
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

    print_report(&results, start);
    Ok(())
}

fn apply_overrides(config: &mut ConverterConfig, args: &ConvertArgs) {
    if args.no_cache {
        config.processing.use_cache = false;
    }
    if args.skip_negative {
        config.filter.skip_negative = true;
    }
    if args.keep_bank_fees {
        config.filter.skip_bank_fees = false;
    }
}

/// Files matching `input`, or `input` itself when it names a file.
fn expand_input(input: &str) -> anyhow::Result<Vec<PathBuf>> {
    let literal = Path::new(input);
    if literal.is_file() {
        return Ok(vec![literal.to_path_buf()]);
    }

    let files: Vec<PathBuf> = glob(input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No statement files found for: {}", input);
    }
    Ok(files)
}

async fn convert_file<P: ReasoningProvider>(
    path: &Path,
    parser: &StatementParser,
    converter: &mut HybridConverter<P>,
    config: &ConverterConfig,
    args: &ConvertArgs,
) -> anyhow::Result<ConversionResult> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    // Broken characters become U+FFFD and are dropped during normalization.
    let content = String::from_utf8_lossy(&bytes);
    let statement = parser
        .parse(&content)
        .with_context(|| format!("Invalid statement {}", path.display()))?;

    let conversion = converter.convert(&statement.transactions).await;

    let mut options = ExportOptions::from(&config.export);
    if let Some(month) = args.month.or_else(|| statement.month()) {
        options = options.with_document_month(month);
    }
    let exporter = LedgerExporter::new(options);

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("statement");

    let ledger_path = output_dir.join(format!("{stem}.txt"));
    fs::write(&ledger_path, exporter.export(&conversion.processed))?;
    let audit_path = output_dir.join(format!("{stem}_pomocniczy.txt"));
    fs::write(&audit_path, exporter.export_auxiliary(&conversion.processed))?;

    debug!(
        ledger = %ledger_path.display(),
        audit = %audit_path.display(),
        "wrote ledger files"
    );
    Ok(conversion)
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "date",
        "amount",
        "type",
        "status",
        "method",
        "confidence",
        "apartment",
        "tenant",
        "contractor",
        "warnings",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let Some(conversion) = &result.conversion else {
            let error = result.error.as_deref().unwrap_or("unknown error");
            wtr.write_record([filename, "", "", "", "error", "", "", "", "", "", error])?;
            continue;
        };

        for item in &conversion.processed {
            wtr.write_record(summary_row(filename, item))?;
        }
    }

    wtr.flush()?;
    Ok(())
}

fn summary_row(filename: &str, item: &ClassifiedTransaction) -> [String; 11] {
    let kind = serde_json::to_value(item.kind())
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let status = serde_json::to_value(item.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    [
        filename.to_string(),
        item.record.exe_date.to_string(),
        item.record.amount.to_string(),
        kind,
        status,
        item.method().to_string(),
        item.confidence().to_string(),
        item.apartment_number().unwrap_or_default(),
        item.tenant_name().unwrap_or_default().to_string(),
        item.contractor().map(|c| c.name.clone()).unwrap_or_default(),
        item.warnings().join("; "),
    ]
}

fn print_report(results: &[FileResult], start: Instant) {
    let converted: Vec<&ConversionResult> =
        results.iter().filter_map(|r| r.conversion.as_ref()).collect();
    let failed: Vec<&FileResult> = results.iter().filter(|r| r.error.is_some()).collect();

    let (mut auto, mut review, mut manual, mut skipped) = (0, 0, 0, 0);
    let (mut pattern, mut reasoning, mut cached, mut fallback) = (0, 0, 0, 0);
    for conversion in &converted {
        auto += conversion.summary.auto_approved;
        review += conversion.summary.needs_review;
        manual += conversion.summary.needs_manual_input;
        skipped += conversion.summary.skipped;
        let methods = &conversion.statistics.methods;
        pattern += methods.pattern_match;
        reasoning += methods.external_reasoning;
        cached += methods.cache_hit;
        fallback += methods.manual_fallback;
    }

    println!();
    println!(
        "{} Converted {} statement(s) in {:?}",
        style("✓").green(),
        converted.len(),
        start.elapsed()
    );
    println!(
        "   {} auto-approved, {} need review, {} need manual input, {} skipped",
        style(auto).green(),
        style(review).yellow(),
        style(manual).red(),
        skipped
    );
    println!(
        "   methods: {} pattern, {} external, {} cached, {} manual",
        pattern, reasoning, cached, fallback
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
}
