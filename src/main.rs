use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use vdi2770_validator::prelude::*;

/// Checkpoint data for resuming an interrupted batch validation
#[derive(Serialize, Deserialize)]
struct Checkpoint {
    completed_paths: Vec<PathBuf>,
    timestamp: SystemTime,
    total_inputs: usize,
}

#[derive(Parser)]
#[command(name = "vdi2770_validator")]
#[command(about = "Validate and build VDI 2770 documentation containers", long_about = None)]
struct Cli {
    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate container archives or folders
    Validate(ValidateArgs),

    /// Build a container archive from a folder
    Build(BuildArgs),

    /// Unpack an archive including all nested containers
    Unpack(UnpackArgs),
}

/// Settings shared by every subcommand
#[derive(Args)]
struct ConfigArgs {
    /// JSON configuration file
    #[arg(long, env = "VDI2770_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum uncompressed/compressed ratio of an archive entry
    #[arg(long)]
    max_compression_factor: Option<f64>,

    /// Maximum uncompressed size of an archive entry in bytes
    #[arg(long)]
    max_uncompressed_size: Option<u64>,

    /// Report borderline omissions as errors
    #[arg(long)]
    strict: bool,

    /// Skip PDF/A conformance detection
    #[arg(long)]
    no_pdf_check: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// Archives, container folders or folders holding either
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Search folders recursively for containers
    #[arg(short, long)]
    recursive: bool,

    #[command(flatten)]
    settings: ConfigArgs,

    /// Write the report trees as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write a plain text report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append one statistics record per validation to this file
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Number of parallel worker threads (default: number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Run in batch mode (no progress bar, summary only)
    #[arg(long)]
    batch: bool,

    /// Resume from a previous checkpoint file
    #[arg(long)]
    resume_from: Option<PathBuf>,
}

#[derive(Args)]
struct BuildArgs {
    /// Container folder
    folder: PathBuf,

    /// Output directory for the archive
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    settings: ConfigArgs,
}

#[derive(Args)]
struct UnpackArgs {
    /// Container archive
    archive: PathBuf,

    /// Target directory
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    settings: ConfigArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Validate(args) => run_validate(args),
        Commands::Build(args) => {
            let config = load_config(&args.settings)?;
            let archive = ContainerBuilder::new(&config)
                .create_container(&args.folder, &args.out)
                .with_context(|| format!("Failed to build container from {}", args.folder.display()))?;
            println!("Created {}", archive.display());
            Ok(())
        }
        Commands::Unpack(args) => {
            let config = load_config(&args.settings)?;
            let root = ArchiveInspector::new(&args.archive, config.limits)
                .with_max_depth(config.max_nesting_depth)
                .extract_to(&args.out, true)
                .with_context(|| format!("Failed to unpack {}", args.archive.display()))?;
            println!("Unpacked into {}", root.display());
            Ok(())
        }
    }
}

/// Configuration file or environment first, command line flags override.
fn load_config(args: &ConfigArgs) -> Result<ValidatorConfig> {
    let base = match args.config {
        Some(ref path) => Some(
            ValidatorConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        ),
        None => ValidatorConfig::from_env().context("Invalid VDI2770_* environment")?,
    };

    let factor = args
        .max_compression_factor
        .or(base.as_ref().map(|c| c.limits.max_compression_factor));
    let size = args
        .max_uncompressed_size
        .or(base.as_ref().map(|c| c.limits.max_uncompressed_size));

    let (Some(factor), Some(size)) = (factor, size) else {
        bail!(
            "Archive limits are required: pass --max-compression-factor and --max-uncompressed-size, \
             set VDI2770_MAX_COMPRESSION_FACTOR and VDI2770_MAX_UNCOMPRESSED_SIZE, or use --config"
        );
    };
    let limits = ArchiveLimits::new(factor, size)?;

    let config = match base {
        Some(base) => ValidatorConfig { limits, ..base },
        None => ValidatorConfig::new(limits),
    };
    let strict = config.strict || args.strict;
    let check_pdf = config.check_pdf && !args.no_pdf_check;
    Ok(config.strict(strict).check_pdf(check_pdf))
}

fn expand_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for input in inputs {
        if input.is_dir() && !classify(input).is_container() {
            let found = collect_inputs(input, recursive)
                .with_context(|| format!("Failed to scan {}", input.display()))?;
            if found.is_empty() {
                warn!("No containers found in {}", input.display());
            }
            expanded.extend(found);
        } else {
            expanded.push(input.clone());
        }
    }
    Ok(expanded)
}

fn run_validate(args: ValidateArgs) -> Result<()> {
    let config = load_config(&args.settings)?;

    // Set up graceful shutdown handler
    let shutdown_requested = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown_requested.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nShutdown requested. Finishing current containers...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Error setting Ctrl-C handler")?;

    if let Some(workers) = args.workers {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build_global()
            .context("Failed to build thread pool")?;
    }

    let mut completed: HashSet<PathBuf> = HashSet::new();
    if let Some(ref checkpoint_path) = args.resume_from {
        match load_checkpoint(checkpoint_path) {
            Ok(checkpoint) => {
                completed = checkpoint.completed_paths.into_iter().collect();
                println!("Resuming from checkpoint: {} ({} already validated)", checkpoint_path.display(), completed.len());
            }
            Err(e) => eprintln!("Warning: {:#}. Starting fresh validation.", e),
        }
    }

    let inputs: Vec<PathBuf> = expand_inputs(&args.inputs, args.recursive)?
        .into_iter()
        .filter(|path| !completed.contains(path))
        .collect();
    let total = inputs.len();
    if total == 0 {
        println!("Nothing to validate.");
        return Ok(());
    }

    println!("VDI 2770 Validator");
    println!("Validating {} input(s) with {} worker thread(s)", total, rayon::current_num_threads());
    if config.strict {
        println!("Strict mode: borderline omissions are errors");
    }
    println!();

    let progress = if args.batch {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        pb
    };

    let processor = ContainerProcessor::new(&config);
    let shutdown_check = shutdown_requested.clone();
    let results: Vec<(PathBuf, Report)> = inputs
        .par_iter()
        .progress_with(progress.clone())
        .filter_map(|path| {
            if shutdown_check.load(Ordering::SeqCst) {
                return None;
            }
            Some((path.clone(), processor.validate(path)))
        })
        .collect();

    let interrupted = shutdown_requested.load(Ordering::SeqCst);
    if interrupted {
        progress.finish_and_clear();
        let checkpoint_path = checkpoint_path_for(args.output.as_deref());
        let mut all_completed: Vec<PathBuf> = completed.into_iter().collect();
        all_completed.extend(results.iter().map(|(path, _)| path.clone()));
        match save_checkpoint(&checkpoint_path, all_completed, total) {
            Ok(()) => eprintln!("Checkpoint saved, resume with: --resume-from {}", checkpoint_path.display()),
            Err(e) => eprintln!("Warning: failed to save checkpoint: {:#}", e),
        }
    } else {
        progress.finish_with_message("Validation complete!");
    }

    let reports: Vec<Report> = results.into_iter().map(|(_, report)| report).collect();

    if !args.batch {
        println!();
        for report in &reports {
            print!("{}", render_text(report));
            println!();
        }
    }

    if let Some(ref stats) = args.stats {
        let sink = StatisticsSink::new(stats);
        for report in &reports {
            sink.append(&StatisticsRecord::from_report(report))
                .with_context(|| format!("Failed to append statistics to {}", stats.display()))?;
        }
    }

    let rejected = reports.iter().filter(|r| r.has_errors()).count();
    println!("==================================================");
    println!("VALIDATION COMPLETE");
    println!("==================================================");
    println!("Accepted containers: {}", reports.len() - rejected);
    println!("Rejected containers: {}", rejected);

    if let Some(ref json) = args.json {
        write_json_report(json, &reports)?;
        println!("JSON report saved to: {}", json.display());
    }
    if let Some(ref output) = args.output {
        write_text_report(output, &reports)?;
        println!("Detailed report saved to: {}", output.display());
    }
    if !interrupted {
        let _ = fs::remove_file(checkpoint_path_for(args.output.as_deref()));
    }

    info!("{} of {} container(s) rejected", rejected, reports.len());
    if rejected > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn checkpoint_path_for(output: Option<&Path>) -> PathBuf {
    match output {
        Some(output) => PathBuf::from(format!("{}.checkpoint", output.display())),
        None => PathBuf::from("vdi2770_validation.checkpoint"),
    }
}

/// Load checkpoint from file
fn load_checkpoint(path: &Path) -> Result<Checkpoint> {
    let file = File::open(path).with_context(|| format!("Failed to open checkpoint file {}", path.display()))?;
    let checkpoint: Checkpoint = serde_json::from_reader(file).context("Failed to parse checkpoint file")?;
    Ok(checkpoint)
}

/// Save checkpoint to file
fn save_checkpoint(path: &Path, completed_paths: Vec<PathBuf>, total_inputs: usize) -> Result<()> {
    let checkpoint = Checkpoint {
        completed_paths,
        timestamp: SystemTime::now(),
        total_inputs,
    };
    let file = File::create(path).context("Failed to create checkpoint file")?;
    serde_json::to_writer_pretty(file, &checkpoint).context("Failed to write checkpoint file")?;
    Ok(())
}
