use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowtrace_codec::FlowLogReader;
use flowtrace_store::{
    ExportReport, ExportSettings, Exporter, HostFilter, run_export, run_export_parallel,
};

#[derive(Debug, Parser)]
#[command(name = "flowtrace")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export a captured flow log to readable JSON documents.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Path to the flow log file.
    input: PathBuf,
    /// Directory the export documents are written into.
    #[arg(default_value = "./exported")]
    output_dir: PathBuf,
    /// Keep only records whose host contains this token (case-insensitive).
    #[arg(long = "filter-host")]
    filter_host: Option<String>,
    /// Number of export worker threads; 1 runs the synchronous pipeline.
    #[arg(long)]
    workers: Option<usize>,
    /// Optional TOML settings file, created with defaults when missing.
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Export(args) => export_command(args),
    }
}

fn export_command(args: ExportArgs) -> ExitCode {
    if !args.input.exists() {
        eprintln!("Error: file not found: {}", args.input.display());
        return ExitCode::FAILURE;
    }

    let mut settings = match &args.settings {
        Some(path) => match ExportSettings::load_or_create(path) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("Error: failed to load settings: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => ExportSettings::default(),
    };
    if args.filter_host.is_some() {
        settings.filter.host_contains = args.filter_host.clone();
    }
    if let Some(workers) = args.workers {
        settings.worker.workers = workers.max(1);
    }

    println!("Reading flows from: {}", args.input.display());
    println!("Output directory: {}", args.output_dir.display());

    let reader = match FlowLogReader::open(&args.input) {
        Ok(reader) => reader,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let exporter = match Exporter::new(&args.output_dir, settings.truncation_policy()) {
        Ok(exporter) => exporter,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let filter = settings.host_filter();
    let worker_config = settings.worker_config();
    info!(workers = worker_config.workers, "starting export");

    let stop = AtomicBool::new(false);
    let result = if worker_config.workers > 1 {
        run_export_parallel(reader, &exporter, filter.as_ref(), &stop, worker_config)
    } else {
        run_export(reader, &exporter, filter.as_ref(), &stop)
    };

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    print_report(&report, filter.as_ref());
    if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &ExportReport, filter: Option<&HostFilter>) {
    println!("Found {} flow records", report.total_records);
    if filter.is_some() {
        println!("Matched records: {}", report.matched_records);
    }
    if report.dropped_frames > 0 {
        println!(
            "Skipped {} unreadable frame(s) at the log tail",
            report.dropped_frames
        );
    }
    if report.failed_exports > 0 {
        println!("Failed to write {} export file(s)", report.failed_exports);
    }
    println!("\nExported {} flows", report.exported);
    if let Some(path) = &report.summary_path {
        println!("Summary saved to: {}", path.display());
    }

    println!("\nEndpoint Summary:");
    println!("{}", "-".repeat(60));
    for entry in &report.endpoints {
        let label: String = entry.endpoint.chars().take(50).collect();
        println!("  {:3}x  {label}", entry.count);
        if !entry.status_codes.is_empty() {
            let codes: Vec<String> = entry
                .status_codes
                .iter()
                .map(|code| code.to_string())
                .collect();
            println!("       Status: {}", codes.join(", "));
        }
    }
}
