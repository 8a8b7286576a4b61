//! Text rendering of analysis results for display

use crate::data::Vocabulary;
use crate::mining::FrequentItemsets;
use crate::model::ClusterModel;

/// Number of heaviest items listed per centroid
const CENTROID_TOP_ITEMS: usize = 3;

/// One line per transaction: `Transaction 1: Cluster 2`
pub fn cluster_lines(labels: &[usize]) -> Vec<String> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("Transaction {}: Cluster {}", i + 1, label))
        .collect()
}

/// One line per frequent itemset: `Bread, Milk: 2`
pub fn itemset_lines(itemsets: &FrequentItemsets) -> Vec<String> {
    itemsets
        .iter()
        .map(|(itemset, support)| format!("{}: {}", itemset, support))
        .collect()
}

/// Cluster sizes, fit quality and the items that characterize each centroid
pub fn cluster_summary_lines(
    model: &ClusterModel,
    vocabulary: &Vocabulary,
    silhouette: f64,
) -> Vec<String> {
    let total = model.labels.len().max(1) as f64;
    let mut lines = Vec::with_capacity(model.n_clusters + 2);

    for (cluster, &size) in model.cluster_sizes().iter().enumerate() {
        let percentage = size as f64 / total * 100.0;
        let mut line = format!(
            "Cluster {}: {} transactions ({:.1}%)",
            cluster, size, percentage
        );

        let top = centroid_top_items(model, vocabulary, cluster);
        if !top.is_empty() {
            line.push_str(" | ");
            line.push_str(&top.join(", "));
        }
        lines.push(line);
    }

    lines.push(format!("Within-cluster sum of squares: {:.2}", model.inertia));
    lines.push(format!("Silhouette score (sample): {:.3}", silhouette));
    lines
}

fn centroid_top_items(model: &ClusterModel, vocabulary: &Vocabulary, cluster: usize) -> Vec<String> {
    if cluster >= model.centroids.nrows() {
        return Vec::new();
    }

    let mut weights: Vec<(usize, f64)> = model
        .centroids
        .row(cluster)
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, weight)| weight > 0.0)
        .collect();
    weights.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    weights
        .into_iter()
        .take(CENTROID_TOP_ITEMS)
        .filter_map(|(column, weight)| {
            vocabulary
                .items()
                .get(column)
                .map(|item| format!("{} {:.2}", item, weight))
        })
        .collect()
}

/// Print a titled block of lines to stdout
pub fn print_section(title: &str, lines: &[String]) {
    println!("\n=== {} ===", title);
    if lines.is_empty() {
        println!("(no results)");
    }
    for line in lines {
        println!("{}", line);
    }
}
