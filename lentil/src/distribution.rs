//! Point estimates of the topic-word (phi) and document-topic (theta)
//! distributions from a snapshot of the count tables.

use crate::common::*;
use crate::correlation_tree::CorrelationTree;
use crate::model::Hyperparameters;
use crate::sufficient_stats::CountSnapshot;
use crate::vocabulary::Vocabulary;

pub struct DistributionEstimator<'a> {
    tree: &'a CorrelationTree,
    counts: &'a CountSnapshot,
    hyper: Hyperparameters,
}

impl<'a> DistributionEstimator<'a> {
    pub fn new(tree: &'a CorrelationTree, counts: &'a CountSnapshot, hyper: Hyperparameters) -> Self {
        DistributionEstimator { tree, counts, hyper }
    }

    /// K x W matrix, each row sums to one.
    ///
    /// A node's smoothed mass `(n_kn + prior) / (N_k + P)` is spread
    /// uniformly over the words below it, so a word's probability collects
    /// its leaf share plus its share of every cluster above it.
    pub fn topic_word_distribution(&self) -> Mat {
        let kk = self.counts.num_topics;
        let nw = self.tree.num_words();
        let (beta, eta) = (self.hyper.beta, self.hyper.eta);
        let total_prior = self.tree.total_prior(beta, eta);
        let root = self.tree.root();

        let mut phi = Mat::zeros(kk, nw);
        for k in 0..kk {
            let denom = self.counts.topic_total(k) as f64 + total_prior;
            for n in 0..self.tree.num_nodes() {
                if n == root {
                    continue;
                }
                let leaves = self.tree.leaves(n);
                if leaves.is_empty() {
                    continue;
                }
                let mass = (self.counts.topic_node(k, n) as f64 + self.tree.prior(n, beta, eta)) / denom;
                let share = mass / leaves.len() as f64;
                for &w in leaves {
                    phi[(k, w)] += share;
                }
            }
        }
        phi
    }

    /// D x K matrix, `(n_dk + α) / (N_d + Kα)`.
    pub fn doc_topic_distribution(&self) -> Mat {
        let kk = self.counts.num_topics;
        let alpha = self.hyper.alpha;
        Mat::from_fn(self.counts.num_docs, kk, |d, k| {
            (self.counts.doc_topic(d, k) as f64 + alpha)
                / (self.counts.doc_total(d) as f64 + kk as f64 * alpha)
        })
    }
}

/// Highest-probability words per topic, ties broken by word id.
///
/// * `phi` - K x W topic-word matrix
/// * `vocab` - vocabulary of size W
/// * `num_top` - words per topic (capped at W)
pub fn top_words(phi: &Mat, vocab: &Vocabulary, num_top: usize) -> Vec<Vec<Box<str>>> {
    let ncols = phi.ncols().min(vocab.len());
    (0..phi.nrows())
        .map(|k| {
            let row = phi.row(k);
            let mut order: Vec<usize> = (0..ncols).collect();
            // stable sort keeps lower ids first among equal probabilities
            order.sort_by(|&a, &b| row[b].total_cmp(&row[a]));
            order
                .into_iter()
                .take(num_top)
                .filter_map(|w| vocab.word(w).map(Box::from))
                .collect()
        })
        .collect()
}
