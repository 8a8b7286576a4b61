//! Running an analysis on a store snapshot away from the caller's thread.
//!
//! Both engines can take a long time on large inputs. A display loop hands a
//! [`Request`] to [`spawn`], keeps drawing, and polls the returned
//! [`AnalysisHandle`] until the [`Outcome`] arrives. Abandoning the handle
//! (or timing out in [`AnalysisHandle::wait_timeout`]) discards the result.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::data::{Transaction, TransactionStore, Vocabulary};
use crate::error::{AnalyticsError, Result};
use crate::mining::{mine, FrequentItemsets};
use crate::model::{fit_clusters, ClusterModel, ClusterParams};

/// Which engine to run, with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Mine { min_support: usize },
    Cluster(ClusterParams),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Itemsets(FrequentItemsets),
    Clusters(ClusterModel),
}

/// Run `request` synchronously on `transactions`
pub fn run(transactions: &[Transaction], vocabulary: &Vocabulary, request: Request) -> Result<Outcome> {
    match request {
        Request::Mine { min_support } => mine(transactions, min_support).map(Outcome::Itemsets),
        Request::Cluster(params) => {
            fit_clusters(transactions, vocabulary, &params).map(Outcome::Clusters)
        }
    }
}

/// Snapshot `store` and run `request` on a worker thread
pub fn spawn(store: &TransactionStore, request: Request) -> AnalysisHandle {
    let snapshot = store.snapshot();
    let vocabulary = store.vocabulary().clone();
    let (sender, receiver) = mpsc::channel();

    tracing::debug!(?request, transactions = snapshot.len(), "Starting background analysis");

    thread::spawn(move || {
        let outcome = run(&snapshot, &vocabulary, request);
        // The receiver is gone when the caller gave up on this result
        let _ = sender.send(outcome);
    });

    AnalysisHandle { receiver }
}

/// Pending result of a background analysis
#[derive(Debug)]
pub struct AnalysisHandle {
    receiver: Receiver<Result<Outcome>>,
}

impl AnalysisHandle {
    /// Non-blocking poll. `None` while the analysis is still running.
    pub fn try_result(&self) -> Option<Result<Outcome>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(worker_lost())),
        }
    }

    /// Block until the analysis finishes
    pub fn wait(self) -> Result<Outcome> {
        self.receiver.recv().unwrap_or_else(|_| Err(worker_lost()))
    }

    /// Block for at most `timeout`. On timeout the result is discarded and
    /// `None` is returned.
    pub fn wait_timeout(self, timeout: Duration) -> Option<Result<Outcome>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(?timeout, "Analysis timed out, discarding result");
                None
            }
            Err(RecvTimeoutError::Disconnected) => Some(Err(worker_lost())),
        }
    }
}

fn worker_lost() -> AnalyticsError {
    AnalyticsError::Interrupted("analysis worker stopped without a result".to_string())
}
