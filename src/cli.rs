//! Command-line interface definitions and argument parsing

use clap::{Parser, ValueEnum};

use crate::data::Transaction;
use crate::model::{ClusterParams, DEFAULT_MAX_ITERS, DEFAULT_TOLERANCE};

/// Which analyses to run once enough checkouts are recorded
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Frequent itemset mining only
    Mine,
    /// K-Means clustering only
    Cluster,
    /// Both analyses
    All,
}

/// Supermarket checkout analytics: frequent itemsets and purchase-pattern clusters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Headerless CSV file with one transaction per line
    #[arg(short, long)]
    pub input: Option<String>,

    /// A transaction as comma-separated items (repeatable)
    /// Example: -t "Milk,Bread" -t "Diapers,Baby Formula"
    #[arg(short = 't', long = "transaction")]
    pub transactions: Vec<String>,

    /// Simulate this many random checkouts
    #[arg(long, default_value = "0")]
    pub simulate: usize,

    /// Seed for simulated checkouts and K-Means initialization
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Number of clusters for K-Means
    #[arg(short = 'k', long, default_value = "3")]
    pub clusters: usize,

    /// Minimum number of transactions an itemset must appear in
    #[arg(short = 's', long, default_value = "2")]
    pub min_support: usize,

    /// Checkouts required before the analytics panel opens
    #[arg(long, default_value = "5")]
    pub min_transactions: usize,

    /// Maximum iterations for K-Means algorithm
    #[arg(long, default_value_t = DEFAULT_MAX_ITERS)]
    pub max_iters: u64,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Give up on an analysis after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Analyses to run
    #[arg(short, long, value_enum, default_value = "all")]
    pub mode: Mode,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the `--transaction` strings into transactions
    pub fn parse_transactions(&self) -> crate::Result<Vec<Transaction>> {
        self.transactions
            .iter()
            .map(|raw| {
                let items: Vec<&str> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .collect();
                if items.is_empty() {
                    return Err(crate::AnalyticsError::InvalidArgument(format!(
                        "transaction '{}' contains no items",
                        raw
                    )));
                }
                Ok(Transaction::new(items))
            })
            .collect()
    }

    pub fn cluster_params(&self) -> ClusterParams {
        ClusterParams::new(self.clusters, self.seed)
            .max_iters(self.max_iters)
            .tolerance(self.tolerance)
    }
}
