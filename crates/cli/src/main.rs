use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use plantao_core::{
    data_dir_from_env_value, validate_all, CoreConfig, DataPipeline, DataType,
};

#[derive(Parser)]
#[command(name = "plantao")]
#[command(about = "Plantão reference data toolkit")]
struct Cli {
    /// Data root containing data-src/ and data/ (defaults to
    /// PLANTAO_DATA_DIR, then the current directory)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile data-src/ into the consolidated data/ documents
    Compile,
    /// Validate the source and compiled data, reporting every finding
    Validate,
    /// Split the compiled documents back into per-entity source files
    Split,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| data_dir_from_env_value(std::env::var("PLANTAO_DATA_DIR").ok()));
    let pipeline = DataPipeline::new(CoreConfig::new(data_dir));

    match cli.command {
        Commands::Compile => match pipeline.compile_from_source() {
            Ok(payload) => {
                println!("Compiled data-src/ into data/");
                println!("  medications: {}", payload.medications.len());
                println!("  medication-classes: {}", payload.medication_classes.len());
                println!(
                    "  physical-exam addons: {}",
                    payload.physical_exam_addons.len()
                );
                println!("  conditions: {}", payload.conditions.len());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Data compile failed: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Validate => match validate_all(&pipeline) {
            Ok(report) => {
                if report.errors.is_empty() && report.warnings.is_empty() {
                    println!("Data validation passed with no issues.");
                    return ExitCode::SUCCESS;
                }

                if !report.errors.is_empty() {
                    eprintln!("Data validation found {} error(s):", report.errors.len());
                    for error in &report.errors {
                        eprintln!("  - {error}");
                    }
                }
                if !report.warnings.is_empty() {
                    eprintln!("Data validation found {} warning(s):", report.warnings.len());
                    for warning in &report.warnings {
                        eprintln!("  - {warning}");
                    }
                }

                if report.is_ok() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(e) => {
                eprintln!("Validation failed: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Split => match pipeline.split_compiled_to_source() {
            Ok(counts) => {
                println!("Split compiled data into data-src/");
                for (data_type, count) in counts {
                    let label = match data_type {
                        DataType::PhysicalExam => "physical-exam addons",
                        other => other.as_str(),
                    };
                    println!("  {label}: {count}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Data split failed: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
