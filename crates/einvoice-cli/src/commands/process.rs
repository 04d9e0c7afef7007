//! Process command - render a single invoice file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use einvoice_core::invoice::{InvoiceParser, XmlInvoiceParser};
use einvoice_core::pdf::{InvoiceRenderer, RenderResources};

use super::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input invoice XML file
    #[arg(required = true)]
    input: PathBuf,

    /// Output PDF file (default: <output_dir>/<stem>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory containing the fonts and images
    #[arg(short, long)]
    resource_dir: Option<PathBuf>,
}

pub fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(dir) = args.resource_dir {
        config.paths.resource_dir = dir;
    }

    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let output_path = match args.output {
        Some(path) => path,
        None => {
            let stem = args
                .input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "invoice".to_string());
            config.paths.output_dir.join(format!("{stem}.pdf"))
        }
    };

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);

    pb.set_message("Loading resources...");
    let resources = RenderResources::load(&config.resources, &config.paths.resource_dir)
        .context("Failed to load rendering resources")?;

    pb.set_message("Parsing invoice...");
    let invoice = XmlInvoiceParser::new()
        .parse_file(&args.input)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    pb.set_message("Rendering PDF...");
    let bytes = InvoiceRenderer::new().render(&invoice, &resources)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if output_path.exists() {
        fs::remove_file(&output_path)?;
    }
    fs::write(&output_path, bytes)?;
    pb.finish_and_clear();

    println!(
        "{} Invoice {} written to {}",
        style("✓").green(),
        invoice.invoice_number(),
        output_path.display()
    );

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
