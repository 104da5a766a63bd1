//! Command-line tool for inspecting and exercising an export directory.

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use std::path::PathBuf;
use std::process::ExitCode;
use timbremap::{Result, RoundTripValidator, ScaleMode, TimbreMap};
use tracing_subscriber::{fmt, EnvFilter};

/// Load, inspect and round-trip TimbreMap export directories
#[derive(Parser)]
#[command(name = "timbremap", version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stages and manifest
    Inspect {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
    },
    /// Round-trip the control grid through the pipeline
    Validate {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,

        /// Scale stage to build: uniform or normal
        scale: Option<ScaleMode>,

        /// Values per control axis (capped for wide control spaces)
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Map a control vector to an output vector
    Forward {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,

        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },
    /// Map an output vector back to controls
    Backward {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,

        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },
}

fn print_vector(v: &[f64]) {
    let line: Vec<String> = v.iter().map(|x| format!("{:.9}", x)).collect();
    println!("{}", line.join(" "));
}

fn inspect(map: &TimbreMap) {
    let pipeline = map.pipeline();
    println!(
        "{} stages, {} -> {}",
        pipeline.stages().len(),
        pipeline.input_width(),
        pipeline.output_width()
    );
    for (idx, stage) in pipeline.stages().iter().enumerate() {
        println!(
            "  {:>2}  {:<15} {} -> {}",
            idx,
            stage.kind().to_string(),
            stage.input_width(),
            stage.output_width()
        );
    }
    match map.source().and_then(|s| s.manifest()) {
        Some(manifest) => {
            println!(
                "manifest: format {} ({})",
                manifest.format_version, manifest.generator
            );
            for record in &manifest.inversions {
                println!("  {:<15} {}", record.stage, record.method);
            }
        }
        None => println!("manifest: none"),
    }
}

/// `Ok(false)` when validation did not produce a finite error.
fn run(command: Command) -> Result<bool> {
    match command {
        Command::Inspect { dir } => inspect(&TimbreMap::builder().root(dir).build()?),
        Command::Validate { dir, scale, steps } => {
            let mut builder = TimbreMap::builder().root(dir);
            if let Some(mode) = scale {
                builder = builder.scale(mode);
            }
            let map = builder.build()?;
            let validator = match steps {
                Some(steps) => RoundTripValidator { steps, ..*map.validator() },
                None => *map.validator(),
            };
            let report = validator.validate(map.pipeline());
            println!(
                "{} vectors, mean abs error {:.6e}, max {:.6e}",
                report.samples, report.mean_abs_error, report.max_abs_error
            );
            if let Some(e) = &report.failure {
                println!("failed: {}", e);
            }
            return Ok(report.is_finite());
        }
        Command::Forward { dir, values } => {
            let map = TimbreMap::builder().root(dir).build()?;
            print_vector(&map.forward_one(&values)?);
        }
        Command::Backward { dir, values } => {
            let map = TimbreMap::builder().root(dir).build()?;
            print_vector(&map.backward_one(&values)?);
        }
    }
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(2)
        }
    }
}
