//! Dirichlet-multinomial score functions for the tree-structured topic model.
//!
//! # Full conditional of one token (word w in document d)
//!
//! ```text
//! p(k, n | rest) ∝ (doc_topic[d][k] + alpha)
//!                  * (topic_node[k][n] + prior(n)) / (topic_total[k] + P)
//!                  / |leaves(n)|
//! ```
//!
//! over every topic k and every node n on the word's path below the root.
//! `prior(n)` is `beta` for a leaf and `eta` for a cluster node, `P` is the
//! sum of priors over all sampled nodes, and a cluster node emits each of
//! its leaves uniformly.

use crate::common::*;
use crate::correlation_tree::CorrelationTree;
use crate::sufficient_stats::CountTables;
use serde::{Deserialize, Serialize};
use special::Gamma as SpecialGamma;

/// Smoothing hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// document-topic Dirichlet concentration
    pub alpha: f64,
    /// leaf (literal word) prior
    pub beta: f64,
    /// cluster node prior
    pub eta: f64,
}

impl Hyperparameters {
    pub fn new(alpha: f64, beta: f64, eta: f64) -> Result<Self> {
        let hyper = Hyperparameters { alpha, beta, eta };
        hyper.validate()?;
        Ok(hyper)
    }

    /// All three must be finite and strictly positive.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta), ("eta", self.eta)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(LdaError::Config(format!(
                    "{} must be a positive finite number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Unnormalized log-weight of one `(topic, node)` candidate.
///
/// Called K * depth times per token in the Gibbs sampler.
///
/// * `doc_topic` - tokens of the document in this topic (current token excluded)
/// * `topic_node` - tokens of this topic credited to this node (excluded likewise)
/// * `topic_total` - tokens of this topic
/// * `prior` - `beta` or `eta` depending on the node
/// * `total_prior` - sum of priors over all sampled nodes
/// * `num_leaves` - number of words below the node
#[inline]
#[allow(clippy::too_many_arguments)]
pub fn log_candidate_weight(
    doc_topic: f64,
    alpha: f64,
    topic_node: f64,
    prior: f64,
    topic_total: f64,
    total_prior: f64,
    num_leaves: usize,
) -> f64 {
    (doc_topic + alpha).ln() + (topic_node + prior).ln()
        - (topic_total + total_prior).ln()
        - (num_leaves as f64).ln()
}

#[inline]
fn ln_gamma(x: f64) -> f64 {
    SpecialGamma::ln_gamma(x).0
}

/// Collapsed joint log-likelihood `ln p(words, topics, nodes)`.
///
/// ```text
/// Σ_d [ lnΓ(Kα) − lnΓ(N_d + Kα) + Σ_k lnΓ(n_dk + α) − lnΓ(α) ]
/// + Σ_k [ lnΓ(P) − lnΓ(N_k + P) + Σ_n lnΓ(n_kn + prior_n) − lnΓ(prior_n) ]
/// − Σ_k Σ_n n_kn ln|leaves(n)|
/// ```
///
/// Zero cells contribute nothing, so only non-empty counts are visited.
pub fn log_joint(tree: &CorrelationTree, counts: &CountTables, hyper: &Hyperparameters) -> f64 {
    let kk = counts.num_topics;
    let alpha = hyper.alpha;
    let k_alpha = kk as f64 * alpha;
    let total_prior = tree.total_prior(hyper.beta, hyper.eta);

    let ln_gamma_alpha = ln_gamma(alpha);
    let mut score = 0.0;

    for d in 0..counts.num_docs {
        score += ln_gamma(k_alpha) - ln_gamma(counts.doc_total(d) as f64 + k_alpha);
        for k in 0..kk {
            let c = counts.doc_topic(d, k);
            if c > 0 {
                score += ln_gamma(c as f64 + alpha) - ln_gamma_alpha;
            }
        }
    }

    let root = tree.root();
    for k in 0..kk {
        score += ln_gamma(total_prior) - ln_gamma(counts.topic_total(k) as f64 + total_prior);
        for n in 0..counts.num_nodes {
            if n == root {
                continue;
            }
            let c = counts.topic_node(k, n);
            if c > 0 {
                let prior = tree.prior(n, hyper.beta, hyper.eta);
                score += ln_gamma(c as f64 + prior) - ln_gamma(prior);
                score -= c as f64 * (tree.leaves(n).len() as f64).ln();
            }
        }
    }

    score
}
