use crate::cli::args::{Cli, FormatArg};
use crate::core::config::QcConfig;
use crate::core::engine::{self, RunConfig};
use crate::core::io::InputFormat;
use crate::report;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub fn entry() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);
    run(cli)
}

fn init_logging(quiet: bool) {
    let default = if quiet { "error" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if !cli.input.is_file() {
        bail!("input file not found: {}", cli.input.display());
    }

    let sample_name = cli
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_end_matches(".fastq").trim_end_matches(".fq").to_string())
        .context("failed to determine sample name from input file")?;

    let config = QcConfig::load(
        cli.kmer,
        cli.limits.as_deref(),
        cli.adapters.as_deref(),
        cli.contaminants.as_deref(),
    )?;

    let format = cli.format.map(|f| match f {
        FormatArg::Fastq => InputFormat::Fastq,
        FormatArg::FastqGz => InputFormat::FastqGz,
        FormatArg::Sam => InputFormat::Sam,
    });

    let out_dir = cli.out.join(format!("{}_fqcheck", sample_name));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output dir {}", out_dir.display()))?;

    let output = engine::run(&RunConfig {
        input: cli.input.clone(),
        format,
        config,
    })?;

    let data_path = out_dir.join("fqcheck_data.txt");
    let summary_path = out_dir.join("summary.txt");
    let html_path = out_dir.join("fqcheck_report.html");

    report::text::write(&data_path, &output.model, &output.file_name)
        .with_context(|| format!("failed to write {}", data_path.display()))?;
    report::summary_txt::write(&summary_path, &output.model, &output.file_name)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    report::html::write(
        &html_path,
        &output.model,
        &output.file_name,
        cli.template.as_deref(),
    )
    .with_context(|| format!("failed to write {}", html_path.display()))?;

    if !cli.no_zip {
        report::zip::write_zip(&cli.out, &sample_name)
            .with_context(|| "failed to create zip output")?;
    }

    info!(out_dir = %out_dir.display(), "report written");
    Ok(())
}
