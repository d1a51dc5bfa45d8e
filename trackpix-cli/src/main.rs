//! trackpix command-line interface.
//!
//! Reads cells from CSV, clusters them and writes one measurement per
//! cluster.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use trackpix_algorithms::{
    parallel_sparse_ccl, sparse_ccl, CellClustering, ChannelFeatures, Clusterizer, DbscanParams,
    DensityClustering,
};
use trackpix_core::{CellCollection, ClusteringConfig, Connectivity, DetectorDescription};
use trackpix_io::{
    load_clustering_config, load_detector_description, read_cells_csv, write_labels_csv,
    write_measurements_csv,
};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    TrackpixIo(#[from] trackpix_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] trackpix_core::Error),

    #[error("Clustering error: {0}")]
    Clustering(#[from] trackpix_core::ClusteringError),
}

/// Adjacency rule selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConnectivityArg {
    /// Strip modules: neighbouring channel0 only
    Strip,
    /// Pixel modules: 8-connectivity
    Pixel,
}

impl From<ConnectivityArg> for Connectivity {
    fn from(arg: ConnectivityArg) -> Self {
        match arg {
            ConnectivityArg::Strip => Connectivity::Strip1D,
            ConnectivityArg::Pixel => Connectivity::Pixel2D,
        }
    }
}

/// Strategies timed by the benchmark command.
#[derive(Debug, Clone, Copy)]
enum Strategy {
    Ccl,
    ParallelCcl,
    Density,
    FullChain,
}

/// Silicon detector cell clusterization.
#[derive(Parser)]
#[command(name = "trackpix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (repeat for debug logging)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster cells and write measurements
    Process {
        /// Input cells CSV file
        cells: PathBuf,

        /// Detector description JSON file
        #[arg(short, long)]
        detector: PathBuf,

        /// Output measurements CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Optional per-cell label CSV file
        #[arg(long)]
        labels_output: Option<PathBuf>,

        /// Clustering configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use density (DBSCAN-Gower) clustering
        #[arg(long)]
        density: bool,

        /// Density neighbourhood radius
        #[arg(long)]
        eps: Option<f64>,

        /// Minimum core-point neighbourhood size
        #[arg(long)]
        min_pts: Option<usize>,

        /// Adjacency rule for connected-component labeling
        #[arg(long, value_enum)]
        connectivity: Option<ConnectivityArg>,

        /// Run on the rayon thread pool
        #[arg(long)]
        parallel: bool,
    },

    /// Show information about a cells file
    Info {
        /// Input cells CSV file
        cells: PathBuf,

        /// Detector description JSON file
        #[arg(short, long)]
        detector: PathBuf,
    },

    /// Benchmark clustering strategies
    Benchmark {
        /// Input cells CSV file
        cells: PathBuf,

        /// Detector description JSON file
        #[arg(short, long)]
        detector: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,

        /// Adjacency rule for connected-component labeling
        #[arg(long, value_enum, default_value = "pixel")]
        connectivity: ConnectivityArg,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_inputs(cells: &Path, detector: &Path) -> Result<(CellCollection, DetectorDescription)> {
    let detector = load_detector_description(detector)?;
    let cells = read_cells_csv(cells, &detector)?;
    Ok((cells, detector))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process {
            cells,
            detector,
            output,
            labels_output,
            config,
            density,
            eps,
            min_pts,
            connectivity,
            parallel,
        } => {
            let mut clustering = match &config {
                Some(path) => load_clustering_config(path)?,
                None => ClusteringConfig::default(),
            };
            if density {
                clustering.use_density_clustering = true;
            }
            if let Some(eps) = eps {
                clustering.eps = eps;
            }
            if let Some(min_pts) = min_pts {
                clustering.min_pts = min_pts;
            }
            if let Some(connectivity) = connectivity {
                clustering.connectivity = connectivity.into();
            }
            if parallel {
                clustering.parallel = true;
            }
            info!("configuration: {:?}", clustering);

            let start = Instant::now();
            let (cells, detector) = load_inputs(&cells, &detector)?;
            let clusterizer = Clusterizer::new(clustering)?;
            let result = clusterizer.run(&cells, &detector)?;

            write_measurements_csv(&output, &result.measurements)?;
            info!("wrote measurements to {}", output.display());
            if let Some(path) = &labels_output {
                write_labels_csv(path, &cells, &result.labels)?;
                info!("wrote labels to {}", path.display());
            }

            let stats = result.statistics;
            println!(
                "Processed {} cells in {:.2}s",
                stats.cells_processed,
                start.elapsed().as_secs_f64()
            );
            println!("Algorithm: {:?}", clusterizer.algorithm());
            println!("Clusters: {}", stats.clusters_found);
            if stats.noise_cells > 0 {
                println!("Noise cells: {}", stats.noise_cells);
            }
            if stats.clusters_dropped > 0 {
                println!("Dropped (below threshold): {}", stats.clusters_dropped);
            }
            println!("Measurements: {}", stats.measurements_created);
        }

        Commands::Info { cells, detector } => {
            let (cells, detector) = load_inputs(&cells, &detector)?;

            println!("Modules described: {}", detector.len());
            println!("Cells: {}", cells.len());

            for range in cells.module_ranges() {
                let module_index = cells.module_index[range.start];
                let geometry_id = detector
                    .get(module_index)
                    .map_or_else(|| "unknown".to_string(), |m| m.geometry_id.to_string());
                let ch0 = &cells.channel0[range.clone()];
                let ch1 = &cells.channel1[range.clone()];
                let total: f64 = cells.activation[range.clone()].iter().sum();
                println!(
                    "  module {} (geometry {}): {} cells, channel0 {}-{}, channel1 {}-{}, activation {:.3}",
                    module_index,
                    geometry_id,
                    range.len(),
                    ch0.iter().min().copied().unwrap_or(0),
                    ch0.iter().max().copied().unwrap_or(0),
                    ch1.iter().min().copied().unwrap_or(0),
                    ch1.iter().max().copied().unwrap_or(0),
                    total
                );
            }
        }

        Commands::Benchmark {
            cells,
            detector,
            iterations,
            connectivity,
        } => {
            let (cells, detector) = load_inputs(&cells, &detector)?;
            let connectivity = Connectivity::from(connectivity);
            let iterations = iterations.max(1);

            println!(
                "Benchmarking with {} cells, {} iterations, {} threads",
                cells.len(),
                iterations,
                rayon::current_num_threads()
            );
            println!(
                "{:<16} | {:<15} | {:<15} | {:<15} | {:<8}",
                "Strategy", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)", "Clusters"
            );
            println!("{:-<80}", "");

            let features = ChannelFeatures::default();
            let density = DensityClustering::new(&features, DbscanParams::default());
            let strategies = [
                (Strategy::Ccl, "CCL"),
                (Strategy::ParallelCcl, "CCL (parallel)"),
                (Strategy::Density, density.name()),
                (Strategy::FullChain, "Full chain"),
            ];

            for (strategy, name) in strategies {
                let mut times = Vec::with_capacity(iterations);
                let mut clusters = 0;
                let mut labels = vec![0; cells.len()];

                for _ in 0..iterations {
                    let start = Instant::now();
                    clusters = match strategy {
                        Strategy::Ccl => sparse_ccl(&cells, connectivity, &mut labels)?,
                        Strategy::ParallelCcl => {
                            parallel_sparse_ccl(&cells, connectivity, &mut labels)?
                        }
                        Strategy::Density => density.cluster(&cells)?.len(),
                        Strategy::FullChain => {
                            let config = ClusteringConfig::default()
                                .with_connectivity(connectivity)
                                .with_parallel(true);
                            Clusterizer::new(config)?
                                .run(&cells, &detector)?
                                .measurements
                                .len()
                        }
                    };
                    times.push(start.elapsed().as_secs_f64() * 1000.0);
                }

                let min_time = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
                let max_time = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let mean_time = times.iter().sum::<f64>() / times.len() as f64;

                println!(
                    "{:<16} | {:<15.2} | {:<15.2} | {:<15.2} | {:<8}",
                    name, mean_time, min_time, max_time, clusters
                );
            }
        }
    }

    Ok(())
}
