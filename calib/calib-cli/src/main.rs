//! Tactile calibration data collection.
//!
//! Drives a calibration bench through the trajectories of one object and
//! merges the recorded steps into the persistent store.
//!
//! # Commands
//!
//! - `calib-collect collect --object <name>` - Collect one object
//! - `calib-collect objects` - List the trajectory library
//! - `calib-collect inspect` - Summarize the persistent store
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

mod collect;
mod inspect;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Default location of the persistent store.
const DEFAULT_STORAGE: &str = "data/real_calibration_data.calt";

/// Default location of the trajectory library.
const DEFAULT_LIBRARY: &str = "obj/traj.json";

/// Tactile calibration data collection
#[derive(Parser)]
#[command(name = "calib-collect")]
#[command(about = "Collect tactile sensor calibration data", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every trajectory of one object and merge the results
    Collect(CollectArgs),

    /// List objects and trajectories in the library
    Objects {
        /// Trajectory library file
        #[arg(long, default_value = DEFAULT_LIBRARY)]
        library: PathBuf,
    },

    /// Summarize the persistent store
    Inspect {
        /// Persistent store file
        #[arg(long, default_value = DEFAULT_STORAGE)]
        storage: PathBuf,

        /// Object to print a force series for
        #[arg(long, requires = "trajectory")]
        object: Option<String>,

        /// Trajectory to print a force series for
        #[arg(long, requires = "object")]
        trajectory: Option<String>,
    },
}

#[derive(Args)]
struct CollectArgs {
    /// Object whose trajectories are run
    #[arg(long)]
    object: String,

    /// Initial pose as x y z qw qx qy qz
    #[arg(long, num_args = 7, allow_negative_numbers = true, value_names = ["X", "Y", "Z", "QW", "QX", "QY", "QZ"])]
    pose: Option<Vec<f64>>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persistent store file
    #[arg(long, default_value = DEFAULT_STORAGE)]
    storage: PathBuf,

    /// Trajectory library file
    #[arg(long, default_value = DEFAULT_LIBRARY)]
    library: PathBuf,

    /// Print the plan without moving
    #[arg(long)]
    dry_run: bool,

    /// Simulated bench: surface height in mm
    #[arg(long, default_value_t = 130.0, allow_negative_numbers = true)]
    surface_z: f64,

    /// Simulated bench: contact stiffness in N/mm
    #[arg(long, default_value_t = 1.0)]
    stiffness: f64,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Collect(args) => collect::run(&args),
        Commands::Objects { library } => inspect::objects(&library),
        Commands::Inspect {
            storage,
            object,
            trajectory,
        } => match (object, trajectory) {
            (Some(object), Some(trajectory)) => inspect::series(&storage, &object, &trajectory),
            _ => inspect::summary(&storage),
        },
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
