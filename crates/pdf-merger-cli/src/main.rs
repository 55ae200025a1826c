//! PDF Merger CLI - storage maintenance and offline merging.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_merger_core::{
    AppConfig, CleanupReport, MergeInput, MergeOptions, ProgressFn, cleanup_old_files,
    merge_to_file,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pdf-merge")]
#[command(author, version, about = "Merge PDF files and maintain merger storage", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete stored uploads and outputs older than their age threshold
    Cleanup {
        /// Age threshold for uploads, in hours (default from config)
        #[arg(long)]
        uploads_max_age_hours: Option<u64>,

        /// Age threshold for merged outputs, in hours (default from config)
        #[arg(long)]
        outputs_max_age_hours: Option<u64>,

        /// Report what would be removed without deleting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Concatenate local PDF files
    Merge {
        /// Input PDF files, merged in the given order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output PDF file
        #[arg(short, long, default_value = "merged.pdf")]
        output: PathBuf,

        /// Merge in filename order instead of argument order
        #[arg(long)]
        sort_by_name: bool,

        /// Fail on the first unreadable input instead of skipping it
        #[arg(long)]
        strict: bool,
    },
}

/// Hours to a `Duration`.
const fn hours(h: u64) -> Duration {
    Duration::from_secs(h.saturating_mul(3600))
}

fn run_cleanup(
    config: &AppConfig,
    uploads_max_age_hours: Option<u64>,
    outputs_max_age_hours: Option<u64>,
    dry_run: bool,
) -> Result<CleanupReport> {
    let upload_age = uploads_max_age_hours.map_or_else(|| config.cleanup.upload_max_age(), hours);
    let output_age = outputs_max_age_hours.map_or_else(|| config.cleanup.output_max_age(), hours);

    let mut report = cleanup_old_files(&config.storage.upload_dir, upload_age, dry_run)
        .context("Failed to clean upload directory")?;
    report += cleanup_old_files(&config.storage.output_dir, output_age, dry_run)
        .context("Failed to clean output directory")?;

    Ok(report)
}

/// Inputs in merge order, labelled by file name.
fn merge_inputs(paths: &[PathBuf], sort_by_name: bool) -> Vec<MergeInput> {
    let mut inputs: Vec<MergeInput> = paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            MergeInput::new(name, path.clone())
        })
        .collect();
    if sort_by_name {
        inputs.sort_by(|a, b| a.name.cmp(&b.name));
    }
    inputs
}

fn run_merge(inputs: &[MergeInput], output: &Path, strict: bool) -> Result<()> {
    let options = MergeOptions {
        skip_unreadable: !strict,
    };

    #[allow(clippy::cast_possible_truncation)]
    let pb = ProgressBar::new(inputs.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("#>-"),
    );

    #[allow(clippy::cast_possible_truncation)]
    let progress: ProgressFn<'_> = &|done, _total| pb.set_position(done as u64);
    let outcome = merge_to_file(inputs, output, options, Some(progress))
        .context(format!("Failed to merge into {}", output.display()))?;

    pb.finish_and_clear();

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        for warning in &outcome.warnings {
            println!("Skipped: {warning}");
        }
        println!(
            "Merged {} pages from {} files into {} ({})",
            outcome.result.pages,
            inputs.len() - outcome.warnings.len(),
            outcome.result.path.display(),
            outcome.result.size_label()
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    match args.command {
        Command::Cleanup {
            uploads_max_age_hours,
            outputs_max_age_hours,
            dry_run,
        } => {
            info!(
                "Cleaning {} and {}{}",
                config.storage.upload_dir.display(),
                config.storage.output_dir.display(),
                if dry_run { " (dry run)" } else { "" }
            );
            let report =
                run_cleanup(&config, uploads_max_age_hours, outputs_max_age_hours, dry_run)?;

            #[allow(clippy::print_stdout)]
            {
                let verb = if dry_run { "Would remove" } else { "Removed" };
                println!(
                    "{verb} {} files and {} empty directories ({} errors)",
                    report.removed_files, report.removed_dirs, report.errors
                );
            }
        }
        Command::Merge {
            inputs,
            output,
            sort_by_name,
            strict,
        } => {
            let inputs = merge_inputs(&inputs, sort_by_name);
            info!("Merging {} files into {}", inputs.len(), output.display());
            run_merge(&inputs, &output, strict)?;
        }
    }

    Ok(())
}
