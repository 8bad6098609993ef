use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use exif_extract::config::{self, ErrorMode};
use exif_extract::exif::NomExifService;
use exif_extract::{pipeline, report};

#[derive(Parser, Debug)]
#[command(
    name = "exif-extract",
    version,
    about = "Extract EXIF capture time and GPS location from JPEG/TIFF files into a spreadsheet-ready table"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the EXIF information from the given directory or file. If a
    /// directory is given, all files in that directory and all sub-directories
    /// will be parsed. Defaults to the current working directory.
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Image file or directory to scan
    #[arg(value_name = "PATH")]
    path: Option<String>,

    /// Separator like , or ;
    #[arg(short, long, value_name = "SEPARATOR")]
    separator: Option<String>,

    /// Don't include the full file path and only add the filename to the output
    #[arg(long = "no-directories")]
    no_directories: bool,

    /// Number of concurrent directory listings and decodes
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Skip files that cannot be decoded instead of aborting the run
    #[arg(long)]
    best_effort: bool,

    /// Match image extensions case-insensitively (JPG, Tiff, ...)
    #[arg(long)]
    ignore_case: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging (stderr, so stdout only carries the report)
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let Some(Command::Extract(args)) = cli.command else {
        anyhow::bail!("No command given. Use --help for usage.");
    };

    // Load config, then let CLI flags win
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(separator) = args.separator {
        config.report.separator = separator;
    }
    if args.no_directories {
        config.report.include_directories = false;
    }
    if let Some(jobs) = args.jobs {
        config.scan.concurrency = jobs;
    }
    if args.best_effort {
        config.scan.error_mode = ErrorMode::BestEffort;
    }
    if args.ignore_case {
        config.scan.case_insensitive_extensions = true;
    }
    config.validate()?;

    let root = pipeline::normalize_root(args.path.as_deref().unwrap_or("."));
    log::debug!(
        "Scanning {} with {} worker(s)",
        root.display(),
        config.scan.concurrency
    );

    let batch = pipeline::scan(&root, Arc::new(NomExifService::new()), &config.scan)
        .await
        .with_context(|| format!("Failed to extract metadata from {}", root.display()))?;

    // Format everything before touching the sink
    let table = report::build_report(&batch, &(&config.report).into())?;

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    report::ReportWriter::new(sink).write_report(&table)?;

    if let Some(path) = &args.output {
        log::info!("Report written to {}", path.display());
    }

    // Summary
    if !batch.is_complete() {
        for failure in &batch.failures {
            log::error!("  {} [{}]: {}", failure.path.display(), failure.error.kind(), failure.error);
        }
        anyhow::bail!(
            "{} of {} file(s) could not be processed",
            batch.failures.len(),
            batch.failures.len() + batch.records.len()
        );
    }

    log::debug!("Done: {} row(s)", table.rows.len());
    Ok(())
}
