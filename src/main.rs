//! basketforge: checkout simulation host for the basket analytics core
//!
//! Rings up transactions from a CSV file, the command line or a seeded
//! simulation, then opens the analytics panel once enough checkouts exist.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use basketforge::analysis::{self, Outcome, Request};
use basketforge::cli::Mode;
use basketforge::{encode_membership, load_transactions_csv, report, simulate_transactions};
use basketforge::{Args, Cart, Transaction, TransactionStore, Vocabulary};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let start_time = Instant::now();

    let store = ring_up(&args)?;
    println!("Transactions: {}", store.len());

    if !store.analysis_ready(args.min_transactions) {
        println!(
            "Data mining opens after {} transactions ({} recorded so far)",
            args.min_transactions,
            store.len()
        );
        return Ok(());
    }

    let mut failures = 0;

    if matches!(args.mode, Mode::Mine | Mode::All) {
        let request = Request::Mine {
            min_support: args.min_support,
        };
        if !run_analysis(&args, &store, request) {
            failures += 1;
        }
    }

    if matches!(args.mode, Mode::Cluster | Mode::All) {
        let request = Request::Cluster(args.cluster_params());
        if !run_analysis(&args, &store, request) {
            failures += 1;
        }
    }

    if args.verbose {
        println!(
            "\nTotal processing time: {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
    }

    if failures > 0 {
        anyhow::bail!("{} analysis run(s) failed", failures);
    }

    Ok(())
}

/// Check out every transaction from the configured sources
fn ring_up(args: &Args) -> Result<TransactionStore> {
    let vocabulary = Vocabulary::supermarket();
    let mut pending: Vec<Transaction> = Vec::new();

    if let Some(path) = &args.input {
        let loaded = load_transactions_csv(path)
            .with_context(|| format!("failed to read transactions from {}", path))?;
        pending.extend(loaded);
    }
    pending.extend(args.parse_transactions()?);
    if args.simulate > 0 {
        pending.extend(simulate_transactions(&vocabulary, args.simulate, args.seed));
    }

    let mut store = TransactionStore::new(vocabulary);
    for (position, transaction) in pending.iter().enumerate() {
        let mut cart = Cart::new();
        for item in transaction.items() {
            cart.select(item);
        }
        store
            .checkout(&mut cart)
            .with_context(|| format!("checkout {} failed", position + 1))?;
    }

    Ok(store)
}

/// Run one analysis off the main thread and print its result. Errors are
/// reported, not propagated, so the other analysis still runs.
fn run_analysis(args: &Args, store: &TransactionStore, request: Request) -> bool {
    let started = Instant::now();
    let handle = analysis::spawn(store, request);

    let outcome = match args.timeout {
        Some(seconds) => match handle.wait_timeout(Duration::from_secs(seconds)) {
            Some(outcome) => outcome,
            None => {
                eprintln!("Analysis did not finish within {}s", seconds);
                return false;
            }
        },
        None => handle.wait(),
    };

    match outcome {
        Ok(Outcome::Itemsets(itemsets)) => {
            report::print_section("Frequent Itemsets", &report::itemset_lines(&itemsets));
        }
        Ok(Outcome::Clusters(model)) => {
            report::print_section(
                "K-Means Clustering",
                &report::cluster_lines(&model.labels.to_vec()),
            );

            let silhouette = encode_membership(store.transactions(), store.vocabulary())
                .map(|features| model.silhouette_sample(&features, 100))
                .unwrap_or(0.0);
            report::print_section(
                "Cluster Statistics",
                &report::cluster_summary_lines(&model, store.vocabulary(), silhouette),
            );
        }
        Err(err) => {
            eprintln!("Analysis failed: {}", err);
            return false;
        }
    }

    if args.verbose {
        println!("  Analysis time: {:.2}s", started.elapsed().as_secs_f64());
    }
    true
}
