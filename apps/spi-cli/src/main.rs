use clap::{Parser, Subcommand};
use spi_jobs::{
    JobError, JobStatusKind, Step, data_object_status, data_step_status, infer_step, job_steps,
    load_job,
};
use spi_mapping::{MappingError, load_mapping, map_csv_file};
use spi_system::{IndexError, System, SystemError, load_system, validation_errors};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spi")]
#[command(
    about = "Solar Performance Insight - PV system definitions, data mapping and job state",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a system file and report every validation error
    Validate {
        /// Path to the system YAML or JSON file
        system_path: PathBuf,
    },
    /// Print the node a schema path addresses
    Resolve {
        /// Path to the system YAML or JSON file
        system_path: PathBuf,
        /// Schema path, e.g. /inverters/0/arrays/1
        schema_path: String,
    },
    /// Convert a value between two units of one family
    Convert {
        from: String,
        to: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// List the units a variable may be supplied in
    Units {
        /// Canonical variable name (e.g. ghi, temp_air)
        variable: String,
    },
    /// Rewrite a CSV file into the canonical columns of a mapping
    Map {
        /// Input CSV file
        csv_path: PathBuf,
        /// Mapping YAML or JSON file
        mapping_path: PathBuf,
        /// Treat the first row as data
        #[arg(long)]
        no_headers: bool,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the workflow state of a job file
    Step {
        /// Path to the job YAML or JSON file
        job_path: PathBuf,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("{0}")]
    System(#[from] SystemError),
    #[error("{0}")]
    Index(#[from] IndexError),
    #[error("{0}")]
    Mapping(#[from] MappingError),
    #[error("{0}")]
    Job(#[from] JobError),
    #[error("{count} validation error(s)")]
    Invalid { count: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { system_path } => cmd_validate(&system_path),
        Commands::Resolve {
            system_path,
            schema_path,
        } => cmd_resolve(&system_path, &schema_path),
        Commands::Convert { from, to, value } => {
            cmd_convert(&from, &to, value);
            Ok(())
        }
        Commands::Units { variable } => {
            cmd_units(&variable);
            Ok(())
        }
        Commands::Map {
            csv_path,
            mapping_path,
            no_headers,
            output,
        } => cmd_map(&csv_path, &mapping_path, !no_headers, output.as_deref()),
        Commands::Step { job_path } => cmd_step(&job_path),
    }
}

fn cmd_validate(system_path: &Path) -> CliResult<()> {
    println!("Validating system: {}", system_path.display());
    let system: System = spi_system::read(system_path)?;
    let errors = validation_errors(&system);
    if errors.is_empty() {
        println!("✓ System is valid");
        return Ok(());
    }
    for error in &errors {
        println!("  {error}");
    }
    Err(CliError::Invalid {
        count: errors.len(),
    })
}

fn cmd_resolve(system_path: &Path, schema_path: &str) -> CliResult<()> {
    let system = load_system(system_path)?;
    let node = system.resolve(schema_path)?;
    info!(kind = node.kind(), "resolved node");
    println!("{}", serde_json::to_string_pretty(&node.to_json()?)?);
    Ok(())
}

fn cmd_convert(from: &str, to: &str, value: f64) {
    match spi_core::convert(from, to) {
        Some(converter) => println!("{}", converter.apply(value)),
        None => println!("no conversion"),
    }
}

fn cmd_units(variable: &str) {
    let options = spi_core::unit_options(variable);
    match spi_core::canonical_units(variable) {
        Some(units) if options.is_empty() => println!("{variable}: {units} (fixed)"),
        Some(units) => {
            println!("{variable} (canonical {units}):");
            for option in options {
                println!("  {option}");
            }
        }
        None => println!("Unknown variable: {variable}"),
    }
}

fn cmd_map(
    csv_path: &Path,
    mapping_path: &Path,
    has_headers: bool,
    output: Option<&Path>,
) -> CliResult<()> {
    let mapping = load_mapping(mapping_path)?;
    let csv = map_csv_file(csv_path, has_headers, &mapping)?;
    match output {
        Some(path) => {
            std::fs::write(path, &csv)?;
            println!("✓ Wrote {} field(s) to {}", mapping.len(), path.display());
        }
        None => println!("{csv}"),
    }
    Ok(())
}

fn cmd_step(job_path: &Path) -> CliResult<()> {
    let job = load_job(job_path)?;
    let step = infer_step(&job)?;
    let status: JobStatusKind = job.status_kind()?;

    println!("Current step: {step}");
    println!("Steps: {}", job_steps(&job).join(" -> "));
    println!("Status: {status}");
    println!("  submit:  {}", status.submit_label());
    println!("  results: {}", status.results_label());
    println!("Data: {}", data_object_status(&job));
    for (data_type, state) in data_step_status(&job) {
        println!("  {data_type}: {state}");
    }
    if let Step::Data(data_type) = &step {
        println!("Next upload: {data_type}");
    }
    Ok(())
}
