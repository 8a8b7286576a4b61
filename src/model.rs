//! K-Means clustering of transactions by purchasing pattern

use std::collections::HashMap;

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::{encode_membership, Transaction, Vocabulary};
use crate::error::{AnalyticsError, Result};

pub const DEFAULT_MAX_ITERS: u64 = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Settings for a single clustering run
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    /// Number of clusters
    pub k: usize,
    /// Seed for centroid initialization
    pub seed: u64,
    /// Maximum Lloyd iterations per run
    pub max_iters: u64,
    /// Convergence tolerance on centroid movement
    pub tolerance: f64,
}

impl ClusterParams {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            max_iters: DEFAULT_MAX_ITERS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn validate(&self, n_transactions: usize) -> Result<()> {
        if self.k < 1 {
            return Err(AnalyticsError::InvalidArgument(
                "number of clusters must be at least 1".to_string(),
            ));
        }
        if self.k > n_transactions {
            return Err(AnalyticsError::InvalidArgument(format!(
                "number of clusters ({}) exceeds number of transactions ({})",
                self.k, n_transactions
            )));
        }
        if self.max_iters < 1 {
            return Err(AnalyticsError::InvalidArgument(
                "max_iters must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(AnalyticsError::InvalidArgument(format!(
                "tolerance must be a positive number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Result of clustering one snapshot of the store
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster label per transaction, in store order
    pub labels: Array1<usize>,
    /// Cluster centroids over the vocabulary, one row per cluster
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares
    pub inertia: f64,
}

impl ClusterModel {
    /// Assign a transaction to its nearest centroid
    pub fn predict(&self, transaction: &Transaction, vocabulary: &Vocabulary) -> Result<usize> {
        if vocabulary.len() != self.centroids.ncols() {
            return Err(AnalyticsError::InvalidArgument(format!(
                "vocabulary has {} items but the model was fitted on {}",
                vocabulary.len(),
                self.centroids.ncols()
            )));
        }

        let features = encode_membership(std::slice::from_ref(transaction), vocabulary)?;
        Ok(nearest_centroid(&features.row(0), &self.centroids))
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            if label < self.n_clusters {
                sizes[label] += 1;
            }
        }
        sizes
    }

    /// Mean silhouette coefficient over the first `sample_size` rows
    pub fn silhouette_sample(&self, features: &Array2<f64>, sample_size: usize) -> f64 {
        let n_samples = features.nrows().min(sample_size).min(self.labels.len());
        if n_samples < 2 {
            return 0.0;
        }

        let mut silhouette_sum = 0.0;

        for i in 0..n_samples {
            let point = features.row(i);
            let label = self.labels[i];

            let mut same = Vec::new();
            let mut others: Vec<Vec<f64>> = vec![Vec::new(); self.n_clusters];

            for j in (0..n_samples).filter(|&j| j != i) {
                let distance = squared_distance(&point, &features.row(j)).sqrt();
                let other_label = self.labels[j];
                if other_label == label {
                    same.push(distance);
                } else if other_label < self.n_clusters {
                    others[other_label].push(distance);
                }
            }

            let a = mean(&same).unwrap_or(0.0);
            let b = others
                .iter()
                .filter_map(|distances| mean(distances))
                .fold(f64::INFINITY, f64::min);

            silhouette_sum += if b.is_infinite() || (a == 0.0 && b == 0.0) {
                0.0
            } else {
                (b - a) / a.max(b)
            };
        }

        silhouette_sum / n_samples as f64
    }
}

/// Cluster transactions into `k` groups and return one label per transaction.
///
/// Labels are in `[0, k)` and aligned with the order of `transactions`. The
/// same input, `k` and `seed` always produce the same labels.
///
/// # Errors
/// * `InsufficientData` if `transactions` is empty
/// * `InvalidArgument` if `k` is zero or larger than the number of transactions
/// * `VocabularyMismatch` if a transaction holds an item outside `vocabulary`
pub fn cluster(
    transactions: &[Transaction],
    vocabulary: &Vocabulary,
    k: usize,
    seed: u64,
) -> Result<Vec<usize>> {
    let model = fit_clusters(transactions, vocabulary, &ClusterParams::new(k, seed))?;
    Ok(model.labels.to_vec())
}

/// Fit K-Means on the binary membership matrix of `transactions`
pub fn fit_clusters(
    transactions: &[Transaction],
    vocabulary: &Vocabulary,
    params: &ClusterParams,
) -> Result<ClusterModel> {
    let n_samples = transactions.len();
    if n_samples == 0 {
        return Err(AnalyticsError::InsufficientData(
            "clustering needs at least one transaction".to_string(),
        ));
    }
    params.validate(n_samples)?;

    let features = encode_membership(transactions, vocabulary)?;

    let patterns = distinct_patterns(&features);
    let (labels, centroids) = if patterns.len() < params.k {
        // Fewer distinct baskets than clusters: every basket is its own centroid
        tracing::warn!(
            k = params.k,
            distinct = patterns.len(),
            "Fewer distinct purchase patterns than clusters, some clusters stay empty"
        );
        pattern_clusters(&features, &patterns, params.k)
    } else {
        fit_kmeans(&features, params)?
    };

    let inertia = compute_inertia(&features, &labels, &centroids);

    tracing::info!(
        transactions = n_samples,
        k = params.k,
        seed = params.seed,
        inertia,
        "Clustering complete"
    );

    Ok(ClusterModel {
        n_clusters: params.k,
        labels,
        centroids,
        inertia,
    })
}

fn fit_kmeans(
    features: &Array2<f64>,
    params: &ClusterParams,
) -> Result<(Array1<usize>, Array2<f64>)> {
    let n_samples = features.nrows();
    let targets: Array1<usize> = Array1::zeros(n_samples); // Dummy targets for unsupervised learning
    let dataset = Dataset::new(features.clone(), targets);

    let rng = StdRng::seed_from_u64(params.seed);
    let model: KMeans<f64, L2Dist> = KMeans::params_with(params.k, rng, L2Dist)
        .max_n_iterations(params.max_iters)
        .tolerance(params.tolerance)
        .fit(&dataset)
        .map_err(|err| AnalyticsError::Clustering(err.to_string()))?;

    let labels = model.predict(&dataset);
    tracing::debug!(max_iters = params.max_iters, "K-Means fitted");

    Ok((labels, model.centroids().clone()))
}

/// Row index of the first occurrence of each distinct row, in row order
fn distinct_patterns(features: &Array2<f64>) -> Vec<usize> {
    let mut seen: HashMap<Vec<bool>, usize> = HashMap::new();
    let mut firsts = Vec::new();
    for (row, values) in features.outer_iter().enumerate() {
        let key: Vec<bool> = values.iter().map(|&v| v > 0.5).collect();
        seen.entry(key).or_insert_with(|| {
            firsts.push(row);
            row
        });
    }
    firsts
}

/// Label each row by its distinct pattern; clusters beyond the patterns reuse
/// the first pattern as centroid and receive no rows.
fn pattern_clusters(
    features: &Array2<f64>,
    patterns: &[usize],
    k: usize,
) -> (Array1<usize>, Array2<f64>) {
    let mut centroids = Array2::<f64>::zeros((k, features.ncols()));
    for cluster in 0..k {
        let source = patterns.get(cluster).copied().unwrap_or(patterns[0]);
        centroids.row_mut(cluster).assign(&features.row(source));
    }

    let labels = features
        .outer_iter()
        .map(|row| nearest_centroid(&row, &centroids))
        .collect();

    (labels, centroids)
}

fn nearest_centroid(point: &ArrayView1<f64>, centroids: &Array2<f64>) -> usize {
    let mut min_distance = f64::INFINITY;
    let mut closest = 0;

    for (cluster, centroid) in centroids.outer_iter().enumerate() {
        let distance = squared_distance(point, &centroid);
        if distance < min_distance {
            min_distance = distance;
            closest = cluster;
        }
    }

    closest
}

fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    labels
        .iter()
        .enumerate()
        .filter(|&(_, &cluster)| cluster < centroids.nrows())
        .map(|(i, &cluster)| squared_distance(&features.row(i), &centroids.row(cluster)))
        .sum()
}

fn squared_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn vocabulary() -> Vocabulary {
        Vocabulary::new(["Milk", "Bread", "Diapers", "Baby Formula", "Motor Oil", "Light Bulb"])
            .unwrap()
    }

    /// Three well separated shopper profiles, two baskets each
    fn grouped_transactions() -> Vec<Transaction> {
        vec![
            Transaction::new(["Milk", "Bread"]),
            Transaction::new(["Diapers", "Baby Formula"]),
            Transaction::new(["Motor Oil", "Light Bulb"]),
            Transaction::new(["Bread", "Milk"]),
            Transaction::new(["Baby Formula", "Diapers"]),
            Transaction::new(["Light Bulb", "Motor Oil"]),
        ]
    }

    #[test]
    fn test_single_cluster_labels_everything_zero() {
        let labels = cluster(&grouped_transactions(), &vocabulary(), 1, 0).unwrap();
        assert_eq!(labels, vec![0; 6]);
    }

    #[test]
    fn test_groups_are_recovered() {
        let labels = cluster(&grouped_transactions(), &vocabulary(), 3, 0).unwrap();

        assert_eq!(labels.len(), 6);
        assert!(labels.iter().all(|&label| label < 3));
        assert_eq!(labels[0], labels[3]);
        assert_eq!(labels[1], labels[4]);
        assert_eq!(labels[2], labels[5]);

        let used: HashSet<usize> = labels.iter().copied().collect();
        assert_eq!(used.len(), 3);
    }

    #[test]
    fn test_same_seed_same_labels() {
        let transactions = grouped_transactions();
        let first = cluster(&transactions, &vocabulary(), 2, 42).unwrap();
        let second = cluster(&transactions, &vocabulary(), 2, 42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_too_many_clusters() {
        let result = cluster(&grouped_transactions(), &vocabulary(), 7, 0);
        assert!(matches!(result, Err(AnalyticsError::InvalidArgument(_))));
    }

    #[test]
    fn test_zero_clusters() {
        let result = cluster(&grouped_transactions(), &vocabulary(), 0, 0);
        assert!(matches!(result, Err(AnalyticsError::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_store() {
        let result = cluster(&[], &vocabulary(), 1, 0);
        assert!(matches!(result, Err(AnalyticsError::InsufficientData(_))));
    }

    #[test]
    fn test_unknown_item() {
        let mut transactions = grouped_transactions();
        transactions.push(Transaction::new(["Caviar"]));
        let result = cluster(&transactions, &vocabulary(), 2, 0);
        assert!(matches!(result, Err(AnalyticsError::VocabularyMismatch { .. })));
    }

    #[test]
    fn test_invalid_iteration_settings() {
        let transactions = grouped_transactions();
        let params = ClusterParams::new(2, 0).max_iters(0);
        assert!(fit_clusters(&transactions, &vocabulary(), &params).is_err());

        let params = ClusterParams::new(2, 0).tolerance(0.0);
        assert!(fit_clusters(&transactions, &vocabulary(), &params).is_err());
    }

    #[test]
    fn test_identical_baskets_with_more_clusters() {
        let transactions = vec![
            Transaction::new(["Milk"]),
            Transaction::new(["Milk"]),
            Transaction::new(["Milk"]),
        ];
        let model = fit_clusters(&transactions, &vocabulary(), &ClusterParams::new(2, 0)).unwrap();

        assert_eq!(model.labels.to_vec(), vec![0, 0, 0]);
        assert_eq!(model.cluster_sizes(), vec![3, 0]);
        assert_eq!(model.inertia, 0.0);
    }

    #[test]
    fn test_model_statistics() {
        let transactions = grouped_transactions();
        let vocabulary = vocabulary();
        let model = fit_clusters(&transactions, &vocabulary, &ClusterParams::new(3, 0)).unwrap();

        assert_eq!(model.centroids.shape(), &[3, 6]);
        assert_eq!(model.cluster_sizes(), vec![2, 2, 2]);
        assert!(model.inertia.abs() < 1e-9);

        let features = encode_membership(&transactions, &vocabulary).unwrap();
        let silhouette = model.silhouette_sample(&features, 100);
        assert!(silhouette > 0.9);
    }

    #[test]
    fn test_predict() {
        let transactions = grouped_transactions();
        let vocabulary = vocabulary();
        let model = fit_clusters(&transactions, &vocabulary, &ClusterParams::new(3, 0)).unwrap();

        let shopper = Transaction::new(["Diapers", "Baby Formula"]);
        assert_eq!(model.predict(&shopper, &vocabulary).unwrap(), model.labels[1]);

        let stranger = Transaction::new(["Caviar"]);
        assert!(model.predict(&stranger, &vocabulary).is_err());
    }
}
