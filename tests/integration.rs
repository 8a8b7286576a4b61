//! Integration tests for basketforge

use std::collections::HashSet;
use std::io::Write;

use basketforge::{
    cluster, fit_clusters, load_transactions_csv, mine, simulate_transactions, AnalyticsError,
    Cart, ClusterParams, Transaction, TransactionStore, Vocabulary,
};
use proptest::prelude::*;
use tempfile::NamedTempFile;

/// Create a CSV file with a week of checkouts
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();

    // Breakfast shoppers
    writeln!(file, "Milk,Bread,Egg").unwrap();
    writeln!(file, "Milk,Bread").unwrap();
    writeln!(file, "Bread,Milk,Cereal").unwrap();

    // New parents
    writeln!(file, "Diapers,Baby Formula").unwrap();
    writeln!(file, "Diapers,Baby Formula,Towel").unwrap();

    // Garage run
    writeln!(file, "Motor Oil,Light Bulb").unwrap();
    writeln!(file, "Light Bulb,Motor Oil").unwrap();

    file
}

fn ring_up(transactions: Vec<Transaction>) -> TransactionStore {
    let mut store = TransactionStore::new(Vocabulary::supermarket());
    for transaction in transactions {
        let mut cart = Cart::new();
        for item in transaction.items() {
            cart.select(item);
        }
        store.checkout(&mut cart).unwrap();
    }
    store
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let store = ring_up(load_transactions_csv(test_file.path()).unwrap());
    assert_eq!(store.len(), 7);
    assert!(store.analysis_ready(5));

    let itemsets = mine(store.transactions(), 2).unwrap();
    assert_eq!(itemsets.support(&["Milk", "Bread"]), Some(3));
    assert_eq!(itemsets.support(&["Diapers", "Baby Formula"]), Some(2));
    assert_eq!(itemsets.support(&["Light Bulb", "Motor Oil"]), Some(2));
    assert_eq!(itemsets.support(&["Egg"]), None);

    let labels = cluster(store.transactions(), store.vocabulary(), 3, 0).unwrap();
    assert_eq!(labels.len(), 7);
    assert!(labels.iter().all(|&label| label < 3));

    // Each shopper profile stays together
    assert_eq!(labels[0], labels[1]);
    assert_eq!(labels[1], labels[2]);
    assert_eq!(labels[3], labels[4]);
    assert_eq!(labels[5], labels[6]);
    let used: HashSet<usize> = labels.iter().copied().collect();
    assert_eq!(used.len(), 3);
}

#[test]
fn test_milk_bread_scenario() {
    let store = ring_up(vec![
        Transaction::new(["Milk", "Bread"]),
        Transaction::new(["Milk", "Bread"]),
        Transaction::new(["Milk"]),
    ]);

    let itemsets = mine(store.transactions(), 2).unwrap();
    let rendered: Vec<(String, usize)> = itemsets
        .iter()
        .map(|(itemset, support)| (itemset.to_string(), support))
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("Bread".to_string(), 2),
            ("Milk".to_string(), 3),
            ("Bread, Milk".to_string(), 2),
        ]
    );
}

#[test]
fn test_threshold_above_every_support() {
    let store = ring_up(vec![
        Transaction::new(["Milk", "Bread"]),
        Transaction::new(["Egg"]),
    ]);
    assert!(mine(store.transactions(), 3).unwrap().is_empty());
}

#[test]
fn test_single_cluster() {
    let store = ring_up(simulate_transactions(&Vocabulary::supermarket(), 12, 3));
    let labels = cluster(store.transactions(), store.vocabulary(), 1, 0).unwrap();
    assert_eq!(labels, vec![0; 12]);
}

#[test]
fn test_more_clusters_than_transactions() {
    let store = ring_up(vec![
        Transaction::new(["Milk"]),
        Transaction::new(["Bread"]),
    ]);
    let result = cluster(store.transactions(), store.vocabulary(), 3, 0);
    assert!(matches!(result, Err(AnalyticsError::InvalidArgument(_))));
}

#[test]
fn test_empty_store() {
    let store = TransactionStore::new(Vocabulary::supermarket());

    assert!(mine(store.transactions(), 2).unwrap().is_empty());
    let result = cluster(store.transactions(), store.vocabulary(), 1, 0);
    assert!(matches!(result, Err(AnalyticsError::InsufficientData(_))));
}

#[test]
fn test_unknown_item_is_rejected_at_checkout() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Milk,Caviar").unwrap();

    let transactions = load_transactions_csv(file.path()).unwrap();
    let mut store = TransactionStore::new(Vocabulary::supermarket());
    let mut cart = Cart::new();
    for item in transactions[0].items() {
        cart.select(item);
    }

    let result = store.checkout(&mut cart);
    assert!(matches!(result, Err(AnalyticsError::VocabularyMismatch { ref item }) if item == "Caviar"));
    assert!(store.is_empty());
}

#[test]
fn test_clustering_is_reproducible_on_simulated_store() {
    let store = ring_up(simulate_transactions(&Vocabulary::supermarket(), 40, 11));
    let params = ClusterParams::new(4, 99);

    let first = fit_clusters(store.transactions(), store.vocabulary(), &params).unwrap();
    let second = fit_clusters(store.transactions(), store.vocabulary(), &params).unwrap();

    assert_eq!(first.labels, second.labels);
    assert_eq!(first.cluster_sizes().iter().sum::<usize>(), 40);
    assert!(first.inertia >= 0.0 && first.inertia.is_finite());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_one_label_per_transaction(
        count in 1usize..30,
        seed in any::<u64>(),
        k in 1usize..6,
    ) {
        let store = ring_up(simulate_transactions(&Vocabulary::supermarket(), count, seed));
        let result = cluster(store.transactions(), store.vocabulary(), k, seed);

        if k > count {
            prop_assert!(matches!(result, Err(AnalyticsError::InvalidArgument(_))), "expected InvalidArgument");
        } else {
            let labels = result.unwrap();
            prop_assert_eq!(labels.len(), count);
            prop_assert!(labels.iter().all(|&label| label < k));
        }
    }
}
