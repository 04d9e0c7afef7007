//! Batch command - convert every invoice in a directory.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use einvoice_core::batch::{discover_invoices, BatchConverter, BatchEvent};
use einvoice_core::invoice::XmlInvoiceParser;
use einvoice_core::pdf::RenderResources;

use super::load_config;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Directory containing invoice XML files (top level only)
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Output directory for the PDF files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Directory containing the fonts and images
    #[arg(short, long)]
    resource_dir: Option<PathBuf>,

    /// Also write summary.csv into the output directory
    #[arg(long)]
    summary: bool,
}

pub fn run(args: BatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(dir) = args.input_dir {
        config.paths.input_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.paths.output_dir = dir;
    }
    if let Some(dir) = args.resource_dir {
        config.paths.resource_dir = dir;
    }

    let input_dir = &config.paths.input_dir;
    let extension = &config.input.extension;

    let files = discover_invoices(input_dir, extension)
        .with_context(|| format!("Cannot read input directory {}", input_dir.display()))?;

    if files.is_empty() {
        println!(
            "{} 在 {} 目录下未找到任何 {} 文件。",
            style("ℹ").blue(),
            input_dir.display(),
            extension.to_uppercase()
        );
        return Ok(());
    }

    let resources = RenderResources::load(&config.resources, &config.paths.resource_dir)
        .context("Failed to load rendering resources")?;

    println!(
        "{} 找到 {} 个 {} 文件，开始批量转换...",
        style("ℹ").blue(),
        files.len(),
        extension.to_uppercase()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let converter = BatchConverter::new(XmlInvoiceParser::new(), &resources, &config.paths.output_dir);
    let mut rows: Vec<SummaryRow> = Vec::with_capacity(files.len());
    let report = converter.run(&files, |event| match event {
        BatchEvent::Started { path, .. } => {
            pb.println(format!("正在处理: {}...", file_name(path)));
        }
        BatchEvent::Converted { path, output } => {
            pb.println(format!("  {} 已生成: {}", style("✓").green(), file_name(output)));
            pb.inc(1);
            rows.push(SummaryRow {
                file: file_name(path),
                status: "success",
                output: file_name(output),
                error: String::new(),
            });
        }
        BatchEvent::Failed { path, error } => {
            pb.println(format!(
                "  {} 处理失败: {} - {}",
                style("✗").red(),
                file_name(path),
                error
            ));
            pb.inc(1);
            rows.push(SummaryRow {
                file: file_name(path),
                status: "error",
                output: String::new(),
                error: error.to_string(),
            });
        }
    })?;
    pb.finish_and_clear();

    if args.summary {
        let summary_path = config.paths.output_dir.join("summary.csv");
        write_summary(&summary_path, &rows)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!("转换完成！{}", report.summary_line());
    info!("Processed {} files in {:?}", report.total(), start.elapsed());

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One line of summary.csv.
struct SummaryRow {
    file: String,
    status: &'static str,
    output: String,
    error: String,
}

fn write_summary(path: &Path, rows: &[SummaryRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["file", "status", "output", "error"])?;
    for row in rows {
        wtr.write_record([
            row.file.as_str(),
            row.status,
            row.output.as_str(),
            row.error.as_str(),
        ])?;
    }

    wtr.flush()?;
    debug!("Wrote {} summary rows to {}", rows.len(), path.display());
    Ok(())
}
