//! Collapsed Gibbs sampler over `(topic, node)` pairs.
//!
//! For each token, computes the conditional posterior over every topic and
//! every node on the word's path below the root, then samples a new joint
//! assignment from the categorical distribution.
//!
//! Supports both sequential and parallel (rayon) sweeps.

use crate::common::*;
use crate::corpus::Corpus;
use crate::correlation_tree::CorrelationTree;
use crate::model::{log_candidate_weight, log_joint, Hyperparameters};
use crate::sufficient_stats::CountTables;
use mcmc_util::{sample_categorical_log, softmax};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// A `(topic, node)` pair
pub type Candidate = (usize, usize);

/// Collapsed Gibbs sampler for token assignments.
pub struct GibbsSampler {
    rng: SmallRng,
    /// Scratch space for per-candidate log-weights
    log_probs: Vec<f64>,
    /// Scratch space for the candidates aligned with `log_probs`
    candidates: Vec<Candidate>,
    /// Base seed for parallel RNG (derived from main rng on first use)
    parallel_seed: u64,
    /// Parallel sweeps done so far, across calls
    parallel_sweeps: u64,
}

impl GibbsSampler {
    pub fn new(rng: SmallRng) -> Self {
        GibbsSampler {
            rng,
            log_probs: Vec::new(),
            candidates: Vec::new(),
            parallel_seed: 0,
            parallel_sweeps: 0,
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    /// Hand back the random stream, e.g. to continue it elsewhere.
    pub fn into_rng(self) -> SmallRng {
        self.rng
    }

    /// Run `num_sweeps` full sweeps over all tokens (sequential).
    ///
    /// Returns the number of tokens whose `(topic, node)` changed.
    ///
    /// Each token sees the most recent state, including moves made earlier
    /// in the same sweep.
    ///
    /// * `tree` - correlation tree defining each word's candidate nodes
    /// * `corpus` - token assignments (modified in place)
    /// * `counts` - count tables consistent with `corpus` (modified in place)
    /// * `hyper` - smoothing hyperparameters
    /// * `num_sweeps` - number of full passes over the corpus
    pub fn run(
        &mut self,
        tree: &CorrelationTree,
        corpus: &mut Corpus,
        counts: &mut CountTables,
        hyper: &Hyperparameters,
        num_sweeps: usize,
    ) -> Result<usize> {
        let mut total_moves = 0;
        for _sweep in 0..num_sweeps {
            total_moves += self.sweep(tree, corpus, counts, hyper)?;
        }
        Ok(total_moves)
    }

    /// One pass over every token in document order.
    pub fn sweep(
        &mut self,
        tree: &CorrelationTree,
        corpus: &mut Corpus,
        counts: &mut CountTables,
        hyper: &Hyperparameters,
    ) -> Result<usize> {
        let total_prior = tree.total_prior(hyper.beta, hyper.eta);
        let mut moves = 0;

        for (d, doc) in corpus.documents_mut().iter_mut().enumerate() {
            for token in doc.tokens.iter_mut() {
                let old = (token.topic, token.node);
                counts.decrement(d, old.0, old.1)?;

                compute_log_probs_for_token(
                    d,
                    token.word,
                    None,
                    tree,
                    counts,
                    hyper,
                    total_prior,
                    &mut self.candidates,
                    &mut self.log_probs,
                );

                let j = sample_categorical_log(&self.log_probs, &mut self.rng).ok_or_else(|| {
                    LdaError::InternalInvariant(format!(
                        "document {}: no valid candidate for word {}",
                        d, token.word
                    ))
                })?;
                let new = self.candidates[j];

                counts.increment(d, new.0, new.1);
                token.topic = new.0;
                token.node = new.1;
                if new != old {
                    moves += 1;
                }
            }
        }
        Ok(moves)
    }

    /// Run `num_sweeps` full sweeps with parallel proposal computation.
    ///
    /// Within each sweep, every token computes its conditional against a
    /// frozen copy of the counts with its own contribution removed, using
    /// rayon `par_chunks` over documents. Moves are then applied
    /// sequentially. The chain is reproducible for a fixed seed but is not
    /// the same chain as [`GibbsSampler::run`].
    ///
    /// Returns the number of tokens whose `(topic, node)` changed.
    pub fn run_parallel(
        &mut self,
        tree: &CorrelationTree,
        corpus: &mut Corpus,
        counts: &mut CountTables,
        hyper: &Hyperparameters,
        num_sweeps: usize,
    ) -> Result<usize> {
        if self.parallel_seed == 0 {
            self.parallel_seed = self.rng.random::<u64>() | 1;
        }
        let base_seed = self.parallel_seed;
        let total_prior = tree.total_prior(hyper.beta, hyper.eta);

        let ndocs = corpus.num_docs();
        let doc_order: Vec<usize> = (0..ndocs).collect();
        let chunk_size = std::cmp::max(16, ndocs / rayon::current_num_threads().max(1));

        // global token index of each document's first token
        let mut offsets = Vec::with_capacity(ndocs);
        let mut acc = 0usize;
        for doc in corpus.documents() {
            offsets.push(acc);
            acc += doc.len();
        }

        let mut total_moves = 0;

        for _sweep in 0..num_sweeps {
            self.parallel_sweeps += 1;
            let sweep_seed = base_seed.wrapping_mul(self.parallel_sweeps);

            let proposals: Vec<Vec<Candidate>> = {
                let frozen: &CountTables = counts;
                let documents = corpus.documents();
                doc_order
                    .par_chunks(chunk_size)
                    .flat_map(|chunk| {
                        let mut candidates = Vec::new();
                        let mut log_probs = Vec::new();
                        chunk
                            .iter()
                            .map(|&d| {
                                documents[d]
                                    .tokens
                                    .iter()
                                    .enumerate()
                                    .map(|(i, token)| {
                                        compute_log_probs_for_token(
                                            d,
                                            token.word,
                                            Some((token.topic, token.node)),
                                            tree,
                                            frozen,
                                            hyper,
                                            total_prior,
                                            &mut candidates,
                                            &mut log_probs,
                                        );
                                        let token_seed = sweep_seed
                                            ^ ((offsets[d] + i) as u64).wrapping_mul(2654435761);
                                        let mut rng = SmallRng::seed_from_u64(token_seed);
                                        sample_categorical_log(&log_probs, &mut rng)
                                            .map(|j| candidates[j])
                                            .ok_or_else(|| {
                                                LdaError::InternalInvariant(format!(
                                                    "document {}: no valid candidate for word {}",
                                                    d, token.word
                                                ))
                                            })
                                    })
                                    .collect::<Result<Vec<_>>>()
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect::<Result<Vec<_>>>()?
            };

            for (d, (doc, proposed)) in corpus
                .documents_mut()
                .iter_mut()
                .zip(proposals)
                .enumerate()
            {
                for (token, new) in doc.tokens.iter_mut().zip(proposed) {
                    if new != (token.topic, token.node) {
                        counts.decrement(d, token.topic, token.node)?;
                        counts.increment(d, new.0, new.1);
                        token.topic = new.0;
                        token.node = new.1;
                        total_moves += 1;
                    }
                }
            }
        }

        Ok(total_moves)
    }

    /// Collapsed joint log-likelihood of the current state.
    pub fn log_likelihood(tree: &CorrelationTree, counts: &CountTables, hyper: &Hyperparameters) -> f64 {
        log_joint(tree, counts, hyper)
    }

    /// Normalized full conditional of one token, excluding its own
    /// contribution, over the same candidates the sampler would draw from.
    ///
    /// * `doc` - document index
    /// * `pos` - token position within the document
    pub fn full_conditional(
        tree: &CorrelationTree,
        corpus: &Corpus,
        counts: &CountTables,
        hyper: &Hyperparameters,
        doc: usize,
        pos: usize,
    ) -> Result<Vec<(Candidate, f64)>> {
        let token = corpus
            .documents()
            .get(doc)
            .and_then(|x| x.tokens.get(pos))
            .ok_or_else(|| LdaError::Data(format!("no token at document {}, position {}", doc, pos)))?;

        let mut candidates = Vec::new();
        let mut log_probs = Vec::new();
        compute_log_probs_for_token(
            doc,
            token.word,
            Some((token.topic, token.node)),
            tree,
            counts,
            hyper,
            tree.total_prior(hyper.beta, hyper.eta),
            &mut candidates,
            &mut log_probs,
        );

        let probs = softmax(&log_probs).ok_or_else(|| {
            LdaError::InternalInvariant(format!(
                "document {}: degenerate conditional for word {}",
                doc, token.word
            ))
        })?;
        Ok(candidates.into_iter().zip(probs).collect())
    }
}

/// Fill the candidate list and log-weights for one token, topic-major.
///
/// With `exclude = Some((topic, node))` the token is assumed to still be
/// counted in `counts` and its contribution is subtracted on the fly.
#[allow(clippy::too_many_arguments)]
fn compute_log_probs_for_token(
    doc: usize,
    word: usize,
    exclude: Option<Candidate>,
    tree: &CorrelationTree,
    counts: &CountTables,
    hyper: &Hyperparameters,
    total_prior: f64,
    candidates: &mut Vec<Candidate>,
    log_probs: &mut Vec<f64>,
) {
    candidates.clear();
    log_probs.clear();

    let path = tree.nodes_above(word);

    for k in 0..counts.num_topics {
        let own_topic = matches!(exclude, Some((kk, _)) if kk == k);
        let own = |x: bool| if x { 1.0 } else { 0.0 };

        let n_dk = counts.doc_topic(doc, k) as f64 - own(own_topic);
        let n_k = counts.topic_total(k) as f64 - own(own_topic);

        for &n in path {
            let own_node = own_topic && matches!(exclude, Some((_, nn)) if nn == n);
            let n_kn = counts.topic_node(k, n) as f64 - own(own_node);

            candidates.push((k, n));
            log_probs.push(log_candidate_weight(
                n_dk,
                hyper.alpha,
                n_kn,
                tree.prior(n, hyper.beta, hyper.eta),
                n_k,
                total_prior,
                tree.leaves(n).len(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation_tree::Cluster;
    use crate::vocabulary::Vocabulary;
    use rand::RngCore;

    fn setup(num_topics: usize) -> (CorrelationTree, Corpus, CountTables, Hyperparameters) {
        let vocab = Vocabulary::from_words(["a", "b", "c", "d", "e"]).unwrap();
        let tree = CorrelationTree::build(&vocab, &[Cluster::new("abc", vec![0, 1, 2])]).unwrap();
        let words = vec![
            vec![0, 1, 2, 3, 0],
            vec![3, 4, 4, 3],
            vec![1, 2, 0],
            vec![],
            vec![4, 0, 3, 2, 1, 1],
        ];
        let mut rng = SmallRng::seed_from_u64(7);
        let corpus = Corpus::with_random_assignments(words, &tree, num_topics, &mut rng).unwrap();
        let counts = CountTables::from_corpus(&corpus, num_topics, tree.num_nodes()).unwrap();
        let hyper = Hyperparameters::new(0.5, 0.1, 1.0).unwrap();
        (tree, corpus, counts, hyper)
    }

    #[test]
    fn test_sweeps_preserve_invariants() -> anyhow::Result<()> {
        let (tree, mut corpus, mut counts, hyper) = setup(3);
        let mut sampler = GibbsSampler::from_seed(42);

        for _ in 0..20 {
            sampler.run(&tree, &mut corpus, &mut counts, &hyper, 1)?;
            counts.check_invariants(&corpus)?;
            assert_eq!(counts, CountTables::from_corpus(&corpus, 3, tree.num_nodes())?);
            for doc in corpus.documents() {
                for t in doc.tokens.iter() {
                    assert!(t.topic < 3);
                    assert!(tree.nodes_above(t.word).contains(&t.node));
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_same_seed_same_chain() -> anyhow::Result<()> {
        let (tree, corpus, counts, hyper) = setup(3);

        let mut c1 = corpus.clone();
        let mut n1 = counts.clone();
        GibbsSampler::from_seed(11).run(&tree, &mut c1, &mut n1, &hyper, 10)?;

        let mut c2 = corpus.clone();
        let mut n2 = counts.clone();
        GibbsSampler::from_seed(11).run(&tree, &mut c2, &mut n2, &hyper, 10)?;

        assert_eq!(c1, c2);
        assert_eq!(n1, n2);
        Ok(())
    }

    #[test]
    fn test_single_candidate_consumes_no_randomness() -> anyhow::Result<()> {
        let vocab = Vocabulary::from_words(["a", "b", "c"])?;
        let tree = CorrelationTree::build(&vocab, &[])?;
        let words = vec![vec![0, 1, 2], vec![2, 2]];
        let topics = vec![vec![0, 0, 0], vec![0, 0]];
        let mut corpus = Corpus::with_assignments(words, topics, &tree, 1)?;
        let mut counts = CountTables::from_corpus(&corpus, 1, tree.num_nodes())?;
        let before = corpus.clone();
        let hyper = Hyperparameters::new(0.1, 0.1, 0.1)?;

        let mut sampler = GibbsSampler::from_seed(5);
        let moves = sampler.run(&tree, &mut corpus, &mut counts, &hyper, 3)?;
        assert_eq!(moves, 0);
        assert_eq!(corpus, before);

        let mut untouched = SmallRng::seed_from_u64(5);
        assert_eq!(sampler.into_rng().next_u64(), untouched.next_u64());
        Ok(())
    }

    #[test]
    fn test_parallel_preserves_invariants_and_is_reproducible() -> anyhow::Result<()> {
        let (tree, corpus, counts, hyper) = setup(4);

        let mut c1 = corpus.clone();
        let mut n1 = counts.clone();
        GibbsSampler::from_seed(3).run_parallel(&tree, &mut c1, &mut n1, &hyper, 15)?;
        n1.check_invariants(&c1)?;
        assert_eq!(n1, CountTables::from_corpus(&c1, 4, tree.num_nodes())?);

        let mut c2 = corpus.clone();
        let mut n2 = counts.clone();
        GibbsSampler::from_seed(3).run_parallel(&tree, &mut c2, &mut n2, &hyper, 15)?;
        assert_eq!(c1, c2);
        Ok(())
    }

    #[test]
    fn test_full_conditional_matches_direct_formula() -> anyhow::Result<()> {
        let (tree, mut corpus, mut counts, hyper) = setup(2);
        GibbsSampler::from_seed(1).run(&tree, &mut corpus, &mut counts, &hyper, 5)?;

        let (d, i) = (0, 1);
        let token = corpus.documents()[d].tokens[i];
        let conditional = GibbsSampler::full_conditional(&tree, &corpus, &counts, &hyper, d, i)?;

        // brute force on tables with the token removed
        let mut rest = counts.clone();
        rest.decrement(d, token.topic, token.node)?;
        let total_prior = tree.total_prior(hyper.beta, hyper.eta);

        let mut expected = vec![];
        for k in 0..2 {
            for &n in tree.nodes_above(token.word) {
                let w = (rest.doc_topic(d, k) as f64 + hyper.alpha)
                    * (rest.topic_node(k, n) as f64 + tree.prior(n, hyper.beta, hyper.eta))
                    / (rest.topic_total(k) as f64 + total_prior)
                    / tree.leaves(n).len() as f64;
                expected.push(((k, n), w));
            }
        }
        let z: f64 = expected.iter().map(|(_, w)| w).sum();

        assert_eq!(conditional.len(), expected.len());
        for ((c, p), (ce, we)) in conditional.iter().zip(expected.iter()) {
            assert_eq!(c, ce);
            approx::assert_abs_diff_eq!(*p, we / z, epsilon = 1e-12);
        }
        let total: f64 = conditional.iter().map(|(_, p)| p).sum();
        approx::assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        Ok(())
    }
}
