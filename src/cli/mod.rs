//! Kolosal benchmark CLI
//!
//! Command-line interface for running the GPU/CPU comparison, inspecting a
//! sample, and generating synthetic data.

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::backend::EstimatorPool;
use crate::config::BenchmarkConfig;
use crate::data::{make_classification, DataSaver, SampleLoader, SyntheticConfig};
use crate::harness::{BenchmarkHarness, ComparisonReport};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kolosal-bench")]
#[command(author = "KolosalAI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "GPU versus CPU estimator pools in an automated pipeline search")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Which arms to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PoolArg {
    Gpu,
    Default,
    Both,
}

impl PoolArg {
    pub fn pools(self) -> Vec<EstimatorPool> {
        match self {
            PoolArg::Gpu => vec![EstimatorPool::Gpu],
            PoolArg::Default => vec![EstimatorPool::Default],
            PoolArg::Both => vec![EstimatorPool::Gpu, EstimatorPool::Default],
        }
    }
}

/// Flags that override the configuration file
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CompareArgs {
    /// Input sample (gzip or plain CSV, label first)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Rows read from the top of the file
    #[arg(short, long)]
    pub rows: Option<usize>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Label column index
    #[arg(long)]
    pub label_column: Option<usize>,

    #[arg(long)]
    pub test_fraction: Option<f64>,

    #[arg(long)]
    pub split_seed: Option<u64>,

    #[arg(short, long)]
    pub generations: Option<usize>,

    #[arg(short, long)]
    pub population: Option<usize>,

    #[arg(long)]
    pub cv_folds: Option<usize>,

    /// Search seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads for the CPU arm (-1 = all cores)
    #[arg(long, allow_hyphen_values = true)]
    pub n_jobs: Option<i32>,

    /// Cap on rows per cross-validation fit
    #[arg(long)]
    pub max_eval_rows: Option<usize>,

    /// 0 silent .. 3 per-pipeline detail
    #[arg(short, long)]
    pub verbosity: Option<u8>,
}

impl CompareArgs {
    /// Defaults, then the config file, then flags
    pub fn resolve(&self) -> anyhow::Result<BenchmarkConfig> {
        let mut config = match &self.config {
            Some(path) => BenchmarkConfig::from_json_file(path)?,
            None => BenchmarkConfig::default(),
        };

        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(rows) = self.rows {
            config.row_limit = rows;
        }
        if let Some(column) = self.label_column {
            config.label_column = column;
        }
        if let Some(fraction) = self.test_fraction {
            config.test_fraction = fraction;
        }
        if let Some(seed) = self.split_seed {
            config.split_seed = seed;
        }

        let search = &mut config.search;
        if let Some(g) = self.generations {
            search.generations = g;
        }
        if let Some(p) = self.population {
            search.population_size = p;
        }
        if let Some(cv) = self.cv_folds {
            search.cv_folds = cv;
        }
        if let Some(seed) = self.seed {
            search.random_state = seed;
        }
        if let Some(n_jobs) = self.n_jobs {
            search.n_jobs = n_jobs;
        }
        if let Some(rows) = self.max_eval_rows {
            search.max_eval_rows = Some(rows);
        }
        if let Some(v) = self.verbosity {
            search.verbosity = v;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the same search against the GPU and the default estimator pools
    Compare {
        #[command(flatten)]
        args: CompareArgs,

        /// Arms to run
        #[arg(long, value_enum, default_value = "both")]
        pool: PoolArg,

        /// Write the comparison as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show sample shape and class balance
    Info {
        #[arg(short, long, default_value = "HIGGS.csv.gz")]
        data: PathBuf,

        #[arg(short, long, default_value = "1000000")]
        rows: usize,

        #[arg(long, default_value = "0")]
        label_column: usize,
    },

    /// Write a synthetic gzip CSV for local runs
    Generate {
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, default_value = "1000")]
        rows: usize,

        #[arg(short, long, default_value = "28")]
        features: usize,

        #[arg(long, default_value = "2")]
        classes: usize,

        #[arg(short, long, default_value = "12")]
        seed: u64,
    },
}

// ─── Compare ───────────────────────────────────────────────────────────────────

pub fn cmd_compare(args: &CompareArgs, pool: PoolArg, report_path: Option<&Path>) -> anyhow::Result<()> {
    let config = args.resolve()?;
    section("Benchmark");
    println!("  {:<14} {}", muted("Data"), config.data_path.display());
    println!("  {:<14} {}", muted("Row limit"), config.row_limit);
    println!(
        "  {:<14} {} generations × {} pipelines, {}-fold CV",
        muted("Search"),
        config.search.generations,
        config.search.population_size,
        config.search.cv_folds
    );

    let harness = BenchmarkHarness::new(config);
    let report = harness.compare(&pool.pools())?;

    print_report(&report);

    if let Some(path) = report_path {
        step_run("Writing report");
        report.to_json_file(path)?;
        step_done(&path.display().to_string());
    }
    println!();
    Ok(())
}

fn print_report(report: &ComparisonReport) {
    section("Results");
    println!("  {:<14} {} train / {} test, {} features", muted("Split"), report.n_train, report.n_test, report.n_features);
    println!();
    println!("  {:<10} {:>8} {:>10} {:>12}", muted("Pool"), muted("Jobs"), muted("Accuracy"), muted("Time"));
    println!("  {}", dim(&"─".repeat(44)));
    for arm in &report.arms {
        println!(
            "  {:<10} {:>8} {:>10.4} {:>11.2}s",
            arm.pool.to_string(),
            arm.n_jobs,
            arm.accuracy,
            arm.elapsed_secs
        );
    }
    println!("  {}", dim(&"─".repeat(44)));

    for arm in &report.arms {
        println!();
        println!("  {} {}", ok("best"), format!("{} pipeline", arm.pool).white().bold());
        println!("  {}", dim(&arm.best_pipeline));
    }

    if let Some(speedup) = report.speedup() {
        println!();
        println!("  {:<14} {:.2}x", muted("Speedup"), speedup);
    }
    if let Some(delta) = report.accuracy_delta() {
        println!("  {:<14} {:+.4}", muted("Accuracy Δ"), delta);
    }
}

// ─── Info ──────────────────────────────────────────────────────────────────────

pub fn cmd_info(data_path: &Path, rows: usize, label_column: usize) -> anyhow::Result<()> {
    section("Data Info");

    step_run("Loading sample");
    let start = Instant::now();
    let dataset = SampleLoader::new().with_label_column(label_column).load_sample(data_path, rows)?;
    step_done(&format!("{:.2?}", start.elapsed()));
    println!();

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), dataset.n_rows());
    println!("  {:<12} {}", muted("Features"), dataset.n_features());
    println!(
        "  {:<12} {:.2} MB",
        muted("Memory"),
        (dataset.n_rows() * (dataset.n_features() * 4 + 8)) as f64 / 1024.0 / 1024.0
    );
    println!();

    println!("  {:<12} {:>10} {:>8}", muted("Label"), muted("Rows"), muted("Share"));
    println!("  {}", dim(&"─".repeat(32)));
    for (label, count) in dataset.class_counts() {
        println!(
            "  {:<12} {:>10} {:>7.2}%",
            label,
            count,
            100.0 * count as f64 / dataset.n_rows() as f64
        );
    }

    println!();
    Ok(())
}

// ─── Generate ──────────────────────────────────────────────────────────────────

pub fn cmd_generate(output: &Path, rows: usize, features: usize, classes: usize, seed: u64) -> anyhow::Result<()> {
    section("Generate");

    step_run("Sampling");
    let config = SyntheticConfig::new(rows, features, seed).with_classes(classes);
    let dataset = make_classification(&config)?;
    step_done(&format!("{} rows × {} features", dataset.n_rows(), dataset.n_features()));

    step_run("Writing");
    let gzip = output
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".gz"));
    if gzip {
        DataSaver::save_csv_gz(&dataset, output)?;
    } else {
        DataSaver::save_csv(&dataset, output)?;
    }
    step_done(&output.display().to_string());

    println!();
    Ok(())
}
