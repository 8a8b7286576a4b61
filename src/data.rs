//! Item vocabulary, transactions and the append-only transaction store

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{AnalyticsError, Result};

/// Items stocked by the simulated supermarket, in shelf order
pub const SUPERMARKET_ITEMS: [&str; 20] = [
    "Milk",
    "Bread",
    "Flour",
    "Egg",
    "Apple",
    "Cereal",
    "Banana",
    "Cheese",
    "Chicken",
    "Beef",
    "Rice",
    "Pasta",
    "Basketball",
    "Soccerball",
    "Light Bulb",
    "Motor Oil",
    "Diapers",
    "Baby Formula",
    "Towel",
    "Ice",
];

/// Largest cart produced by [`simulate_transactions`]
const MAX_SIMULATED_CART: usize = 5;

/// Fixed, ordered universe of item names.
///
/// The position of an item is its column in the membership matrix built by
/// [`encode_membership`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    items: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build a vocabulary, rejecting empty lists, blank names and duplicates
    pub fn new<I, S>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return Err(AnalyticsError::InvalidArgument(
                "vocabulary must contain at least one item".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if item.trim().is_empty() {
                return Err(AnalyticsError::InvalidArgument(format!(
                    "vocabulary item at position {} is blank",
                    position
                )));
            }
            if index.insert(item.clone(), position).is_some() {
                return Err(AnalyticsError::InvalidArgument(format!(
                    "vocabulary item '{}' is listed twice",
                    item
                )));
            }
        }

        Ok(Self { items, index })
    }

    /// The default supermarket vocabulary
    pub fn supermarket() -> Self {
        let items: Vec<String> = SUPERMARKET_ITEMS.iter().map(|s| s.to_string()).collect();
        let index = items
            .iter()
            .enumerate()
            .map(|(position, item)| (item.clone(), position))
            .collect();
        Self { items, index }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index_of(&self, item: &str) -> Option<usize> {
        self.index.get(item).copied()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.index.contains_key(item)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::supermarket()
    }
}

/// A completed checkout: item names in the order they were captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    items: Vec<String>,
}

impl Transaction {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Items as captured, duplicates included
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Distinct items in sorted order
    pub fn distinct_items(&self) -> BTreeSet<&str> {
        self.items.iter().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reject the first item that the vocabulary does not know
    pub fn validate(&self, vocabulary: &Vocabulary) -> Result<()> {
        match self.items.iter().find(|item| !vocabulary.contains(item)) {
            Some(item) => Err(AnalyticsError::VocabularyMismatch { item: item.clone() }),
            None => Ok(()),
        }
    }
}

/// The shopper's in-progress selection, kept in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<String>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the selection state of `item`. Returns `true` if it is now selected.
    pub fn toggle(&mut self, item: &str) -> bool {
        if let Some(position) = self.items.iter().position(|i| i == item) {
            self.items.remove(position);
            false
        } else {
            self.items.push(item.to_string());
            true
        }
    }

    /// Select `item` if it is not already selected. Returns `true` if it was added.
    pub fn select(&mut self, item: &str) -> bool {
        if self.contains(item) {
            false
        } else {
            self.items.push(item.to_string());
            true
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item)
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Append-only log of completed checkouts.
///
/// Insertion order is checkout order. The engines only ever see a borrowed
/// slice or an owned [`snapshot`](TransactionStore::snapshot), never the
/// store itself.
#[derive(Debug, Clone, Default)]
pub struct TransactionStore {
    vocabulary: Vocabulary,
    transactions: Vec<Transaction>,
}

impl TransactionStore {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary,
            transactions: Vec::new(),
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Whether enough checkouts have happened to offer the analytics panel
    pub fn analysis_ready(&self, min_transactions: usize) -> bool {
        self.transactions.len() >= min_transactions
    }

    /// Owned copy of the store as it is right now
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    /// Complete the checkout of `cart`.
    ///
    /// The cart is emptied only when the transaction was recorded; on error it
    /// is left untouched.
    pub fn checkout(&mut self, cart: &mut Cart) -> Result<&Transaction> {
        if cart.is_empty() {
            return Err(AnalyticsError::InvalidArgument(
                "cannot check out an empty cart".to_string(),
            ));
        }

        let transaction = Transaction::new(cart.items().iter().cloned());
        self.record(transaction)?;
        cart.clear();

        Ok(&self.transactions[self.transactions.len() - 1])
    }

    /// Append an already captured transaction after validating it
    pub fn record(&mut self, transaction: Transaction) -> Result<&Transaction> {
        if transaction.is_empty() {
            return Err(AnalyticsError::InvalidArgument(
                "transaction contains no items".to_string(),
            ));
        }
        if let Err(err) = transaction.validate(&self.vocabulary) {
            tracing::warn!(error = %err, "Rejected transaction");
            return Err(err);
        }

        tracing::debug!(
            position = self.transactions.len(),
            items = transaction.items().len(),
            "Recorded transaction"
        );
        self.transactions.push(transaction);

        Ok(&self.transactions[self.transactions.len() - 1])
    }
}

/// Encode transactions as a binary membership matrix.
///
/// Row `i`, column `j` is `1.0` iff transaction `i` contains vocabulary item
/// `j`. Any item outside the vocabulary is rejected.
pub fn encode_membership(
    transactions: &[Transaction],
    vocabulary: &Vocabulary,
) -> Result<Array2<f64>> {
    let mut features = Array2::<f64>::zeros((transactions.len(), vocabulary.len()));

    for (row, transaction) in transactions.iter().enumerate() {
        for item in transaction.items() {
            let column = vocabulary
                .index_of(item)
                .ok_or_else(|| AnalyticsError::VocabularyMismatch { item: item.clone() })?;
            features[[row, column]] = 1.0;
        }
    }

    Ok(features)
}

/// Load transactions from a headerless CSV file.
///
/// Each record is one transaction and each non-blank field one item. Records
/// may differ in length; records without any item are skipped.
pub fn load_transactions_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let mut transactions = Vec::new();
    for record in reader.records() {
        let record = record?;
        let items: Vec<&str> = record.iter().filter(|field| !field.is_empty()).collect();
        if items.is_empty() {
            continue;
        }
        transactions.push(Transaction::new(items));
    }

    tracing::debug!(
        path = %path.as_ref().display(),
        count = transactions.len(),
        "Loaded transactions"
    );

    Ok(transactions)
}

/// Generate `count` random checkouts of one to five distinct items
pub fn simulate_transactions(vocabulary: &Vocabulary, count: usize, seed: u64) -> Vec<Transaction> {
    let mut rng = StdRng::seed_from_u64(seed);
    let max_cart = MAX_SIMULATED_CART.min(vocabulary.len());

    (0..count)
        .map(|_| {
            let size = rng.gen_range(1..=max_cart);
            Transaction::new(vocabulary.items().choose_multiple(&mut rng, size).cloned())
        })
        .collect()
}
