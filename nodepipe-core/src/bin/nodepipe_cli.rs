//! Node Pipeline CLI
//!
//! Commands: parse, run
//! Outputs JSON to stdout
//! Returns 1 on usage or I/O failure, 2 on a parse or run failure

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

use nodepipe_core::{
    compute_pipeline_hash, Config, Image, Pipeline, PipelineError, PipelineExecutor,
    UnknownKeywordPolicy,
};

#[derive(Parser)]
#[command(name = "nodepipe-cli")]
#[command(about = "Node Pipeline CLI - line-oriented image processing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (run and parser options)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log every step (name, parameters, dimensions, artifacts)
    #[arg(long, global = true)]
    log: bool,

    /// Read unknown keywords as Vignette / Crop instead of rejecting them
    #[arg(long, global = true)]
    fallback: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a pipeline definition and print its operations
    Parse {
        /// Pipeline definition file
        #[arg(short, long)]
        pipeline: PathBuf,
    },

    /// Run a pipeline over an image
    Run {
        /// Source image
        #[arg(short, long)]
        input: PathBuf,

        /// Pipeline definition file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Directory receiving output.png
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Write output<N>.png after every step
        #[arg(long)]
        save_intermediate: bool,

        /// Directory for intermediate artifacts
        #[arg(long)]
        save_dir: Option<PathBuf>,

        /// Seed for the noise random source
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(c) => c,
            Err(e) => {
                print_json(&json!({"success": false, "error": format!("Failed to load config: {}", e)}));
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    if cli.log {
        config.run.logging = true;
    }
    if cli.fallback {
        config.parser.unknown_keyword = UnknownKeywordPolicy::Fallback;
    }

    let default_filter = if config.run.logging { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Parse { pipeline } => {
            let pipeline = match Pipeline::from_file(&pipeline, config.parser) {
                Ok(p) => p,
                Err(e) => return fail(e),
            };
            let hash = match compute_pipeline_hash(&pipeline) {
                Ok(h) => h,
                Err(e) => return fail(e.into()),
            };

            let operations: Vec<_> = pipeline
                .operations()
                .iter()
                .map(|op| json!({
                    "name": op.name(),
                    "params": op.other_info(),
                    "line": op.to_string(),
                }))
                .collect();

            print_json(&json!({
                "success": true,
                "pipelineHash": hash,
                "operations": operations,
            }));
            ExitCode::SUCCESS
        }

        Commands::Run {
            input,
            pipeline,
            output_dir,
            save_intermediate,
            save_dir,
            seed,
        } => {
            let pipeline = match Pipeline::from_file(&pipeline, config.parser) {
                Ok(p) => p,
                Err(e) => return fail(e),
            };
            let image = match Image::open(&input) {
                Ok(i) => i,
                Err(e) => {
                    print_json(&json!({
                        "success": false,
                        "error": format!("Failed to open {}: {}", input.display(), e),
                    }));
                    return ExitCode::FAILURE;
                }
            };

            let mut options = config.run;
            if save_intermediate {
                options.save_intermediate = true;
            }
            if let Some(dir) = save_dir {
                options.save_directory = dir;
            }

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            let executor = PipelineExecutor::new(options);
            let execution = match executor.run_with_rng(image, &pipeline, &mut rng) {
                Ok(e) => e,
                Err(e) => return fail(e),
            };

            if let Err(source) = std::fs::create_dir_all(&output_dir) {
                return fail(PipelineError::Io {
                    path: output_dir,
                    source,
                });
            }
            let output = match execution.image.save_final(&output_dir) {
                Ok(path) => path,
                Err(e) => return fail(e.into()),
            };

            print_json(&json!({
                "success": true,
                "output": output,
                "report": execution.report,
            }));
            ExitCode::SUCCESS
        }
    }
}

/// Print the error as JSON and pick the exit code for its kind
fn fail(error: PipelineError) -> ExitCode {
    print_json(&json!({"success": false, "error": error.to_string()}));
    match error {
        PipelineError::Parse(_) | PipelineError::Step { .. } => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}
