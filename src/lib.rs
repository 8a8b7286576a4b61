//! basketforge: market-basket analytics for a supermarket checkout simulation
//!
//! Completed checkouts land in a [`TransactionStore`]. Two independent engines
//! read a snapshot of that store: [`mine`] counts co-purchased item
//! combinations and [`cluster`] groups transactions by purchasing pattern with
//! K-Means over binary membership vectors.

pub mod analysis;
pub mod cli;
pub mod data;
pub mod error;
pub mod mining;
pub mod model;
pub mod report;

// Re-export public items for easier access
pub use analysis::{AnalysisHandle, Outcome, Request};
pub use cli::Args;
pub use data::{
    encode_membership, load_transactions_csv, simulate_transactions, Cart, Transaction,
    TransactionStore, Vocabulary,
};
pub use error::{AnalyticsError, Result};
pub use mining::{mine, FrequentItemsets, Itemset};
pub use model::{cluster, fit_clusters, ClusterModel, ClusterParams};
