use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use color_tracker_rs::sim::{self, SimConfig};
use color_tracker_rs::trajectory::{self, SCALE_FACTOR};

#[derive(Parser, Debug)]
#[command(name = "generate_data")]
#[command(about = "Generate synthetic trajectories and the derived filter gain", long_about = None)]
struct Args {
    /// Where to write the trajectory files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// RNG seed (fixed seed = reproducible files)
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Number of simulation steps
    #[arg(long, default_value = "200")]
    steps: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("--- Trajectory Generator Started ---");

    let config = SimConfig {
        steps: args.steps,
        seed: args.seed,
        ..Default::default()
    };
    let generated = sim::generate(&config);

    println!("Calculated K value (float): {:.4}", generated.gain);
    println!(
        "Scaled K value (fixed-point): {}",
        (generated.gain * SCALE_FACTOR) as i64
    );

    fs::create_dir_all(&args.output_dir)?;
    for (name, rows) in [
        ("noisy_camera.txt", &generated.noisy),
        ("true_path.txt", &generated.truth),
        ("drifty_motors.txt", &generated.drifty),
    ] {
        let path = args.output_dir.join(name);
        trajectory::write_scaled(&path, rows)?;
        println!("Wrote {} ({} records)", path.display(), rows.len());
    }

    println!("--- Trajectory Generation Complete ---");
    Ok(())
}
