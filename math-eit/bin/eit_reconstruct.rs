//! Offline EIT reconstruction
//!
//! Reads measurement records (`<label> : v1, v2, ...`), uses the first one
//! as the reference and reconstructs every following record.
//!
//! Usage:
//!   cargo run --release --bin eit_reconstruct -- --frames data.txt --algorithm greit
//!   cargo run --release --bin eit_reconstruct -- --help

use clap::{Parser, ValueEnum};
use math_eit::{Algorithm, FrameOutcome, Orchestrator, ReconstructionConfig, parse_records};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAlgorithm {
    Bp,
    Jac,
    Greit,
}

impl From<CliAlgorithm> for Algorithm {
    fn from(alg: CliAlgorithm) -> Self {
        match alg {
            CliAlgorithm::Bp => Algorithm::BackProjection,
            CliAlgorithm::Jac => Algorithm::Jacobian,
            CliAlgorithm::Greit => Algorithm::Greit,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "eit_reconstruct")]
#[command(about = "Reconstruct EIT images from recorded measurement frames")]
struct Args {
    /// Path to JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Algorithm, overrides the configuration file
    #[arg(short, long)]
    algorithm: Option<CliAlgorithm>,

    /// Electrode count, overrides the configuration file
    #[arg(short, long)]
    electrodes: Option<usize>,

    /// Measurement records; the first is the reference
    #[arg(short, long)]
    frames: PathBuf,

    /// Output JSON file
    #[arg(short, long, default_value = "eit_images.json")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ReconstructionConfig::from_file(path)?,
        None => ReconstructionConfig::default(),
    };
    let algorithm = args.algorithm.map_or(config.algorithm, Algorithm::from);
    let n_el = args.electrodes.unwrap_or(config.n_el);

    let text = fs::read_to_string(&args.frames)?;
    let records = parse_records(&text);
    if records.len() < 2 {
        return Err(format!(
            "{} holds {} usable records, need a reference and at least one frame",
            args.frames.display(),
            records.len()
        )
        .into());
    }

    println!("=== EIT reconstruction ===");
    println!("algorithm:  {algorithm}");
    println!("electrodes: {n_el}");
    println!("records:    {}", records.len());

    let start = Instant::now();
    let mut orch = Orchestrator::new(config);
    let kind = orch.reset(algorithm, n_el)?;
    orch.start()?;
    println!("setup:      {:.2?} ({kind:?} images)", start.elapsed());

    let mut images = Vec::new();
    for record in records {
        match orch.process_frame(record.values) {
            FrameOutcome::Image(image) => {
                images.push(json!({ "label": record.label, "image": image }));
            }
            FrameOutcome::Baselined | FrameOutcome::Rebaselined => {
                println!("reference:  {}", record.label);
            }
            FrameOutcome::Skipped => println!("skipped:    {}", record.label),
            FrameOutcome::Halted | FrameOutcome::Ignored => break,
        }
    }

    let output = json!({
        "algorithm": algorithm,
        "n_el": n_el,
        "image_kind": kind,
        "images": images,
    });
    fs::write(&args.output, serde_json::to_string_pretty(&output)?)?;
    println!(
        "wrote {} images to {} in {:.2?}",
        images.len(),
        args.output.display(),
        start.elapsed()
    );
    Ok(())
}
