//! Frequent itemset mining by exhaustive subset enumeration

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::data::Transaction;
use crate::error::{AnalyticsError, Result};

/// A canonical set of item names: sorted and free of duplicates.
///
/// Itemsets order by size first, then lexicographically by their items.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Itemset(Vec<String>);

impl Itemset {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<String> = items.into_iter().map(Into::into).collect();
        items.sort();
        items.dedup();
        Self(items)
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.0.binary_search_by(|probe| probe.as_str().cmp(item)).is_ok()
    }
}

impl Ord for Itemset {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Itemset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Itemset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// Itemsets that met the support threshold, keyed in [`Itemset`] order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequentItemsets {
    min_support: usize,
    supports: BTreeMap<Itemset, usize>,
}

impl FrequentItemsets {
    /// Threshold the itemsets were filtered with
    pub fn min_support(&self) -> usize {
        self.min_support
    }

    pub fn len(&self) -> usize {
        self.supports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Itemset, usize)> {
        self.supports.iter().map(|(itemset, &support)| (itemset, support))
    }

    /// Support of the itemset made of `items`, if it is frequent
    pub fn support<S: AsRef<str>>(&self, items: &[S]) -> Option<usize> {
        let key = Itemset::new(items.iter().map(|item| item.as_ref()));
        self.supports.get(&key).copied()
    }

    pub fn of_size(&self, size: usize) -> impl Iterator<Item = (&Itemset, usize)> {
        self.iter().filter(move |(itemset, _)| itemset.len() == size)
    }

    /// Up to `limit` itemsets, highest support first
    pub fn most_frequent(&self, limit: usize) -> Vec<(&Itemset, usize)> {
        let mut ranked: Vec<(&Itemset, usize)> = self.iter().collect();
        ranked.sort_by(|(a, sa), (b, sb)| sb.cmp(sa).then_with(|| a.cmp(b)));
        ranked.truncate(limit);
        ranked
    }

    pub fn into_map(self) -> BTreeMap<Itemset, usize> {
        self.supports
    }
}

/// Count every item combination across `transactions` and keep those seen in
/// at least `min_support` transactions.
///
/// Each transaction is reduced to its distinct items and every non-empty
/// subset of them is counted once. This is brute-force enumeration: work per
/// transaction is `2^d` for `d` distinct items, so it is only practical for
/// baskets of a few dozen items at most.
///
/// # Errors
/// * `InvalidArgument` if `min_support` is zero
pub fn mine(transactions: &[Transaction], min_support: usize) -> Result<FrequentItemsets> {
    if min_support < 1 {
        return Err(AnalyticsError::InvalidArgument(
            "min_support must be at least 1".to_string(),
        ));
    }

    let mut counts: HashMap<Vec<&str>, usize> = HashMap::new();
    for transaction in transactions {
        let distinct: Vec<&str> = transaction.distinct_items().into_iter().collect();
        count_subsets(&distinct, 0, &mut Vec::with_capacity(distinct.len()), &mut counts);
    }

    tracing::debug!(
        transactions = transactions.len(),
        candidates = counts.len(),
        "Counted item combinations"
    );

    let supports: BTreeMap<Itemset, usize> = counts
        .into_iter()
        .filter(|&(_, count)| count >= min_support)
        .map(|(items, count)| (Itemset::new(items), count))
        .collect();

    tracing::info!(
        min_support,
        frequent = supports.len(),
        "Itemset mining complete"
    );

    Ok(FrequentItemsets {
        min_support,
        supports,
    })
}

/// Extend `prefix` with every item from `start` onwards, counting each
/// resulting combination. `items` must be sorted so each prefix stays sorted.
fn count_subsets<'a>(
    items: &[&'a str],
    start: usize,
    prefix: &mut Vec<&'a str>,
    counts: &mut HashMap<Vec<&'a str>, usize>,
) {
    for (offset, &item) in items[start..].iter().enumerate() {
        prefix.push(item);
        *counts.entry(prefix.clone()).or_insert(0) += 1;
        count_subsets(items, start + offset + 1, prefix, counts);
        prefix.pop();
    }
}
