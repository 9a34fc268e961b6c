//! In-process estimator: load inputs, run the Gibbs chain, report
//! distributions, save results.
//!
//! ```text
//! Uninitialized --load/from_parts--> Initialized --estimate--> Sampling { epoch } --> Converged
//! ```
//!
//! Every input is parsed and the correlation tree is built before any count
//! table exists, so a rejected input leaves the estimator untouched.

use crate::common::*;
use crate::corpus::{read_bag_of_words, read_topic_assignments, Corpus};
use crate::correlation_tree::{Cluster, CorrelationTree};
use crate::distribution::{top_words, DistributionEstimator};
use crate::gibbs::GibbsSampler;
use crate::io::{ResultWriter, OPTIONS_FILE};
use crate::model::Hyperparameters;
use crate::sufficient_stats::CountTables;
use crate::vocabulary::Vocabulary;

use mcmc_util::McmcTrace;
use serde::{Deserialize, Serialize};

/// Options for one estimation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdaOptions {
    /// Number of topics K. Default: 10
    pub num_topics: usize,
    /// Vocabulary size W; the vocabulary file must match. Default: 0 (unset)
    pub num_words: usize,
    /// Document-topic smoothing. Default: 0.1
    pub alpha: f64,
    /// Leaf (word) smoothing. Default: 0.01
    pub beta: f64,
    /// Cluster node smoothing. Default: 100.0
    pub eta: f64,
    /// Gibbs sweeps over the corpus. Default: 1000
    pub epochs: usize,
    /// Random seed. Default: 42
    pub seed: u64,
    /// Jacobi-style parallel sweeps (reproducible, but a different chain). Default: false
    pub parallel: bool,
    /// Epochs between log-likelihood reports. Default: 10
    pub log_every: usize,
    /// Words per topic in the top-words report. Default: 20
    pub num_top_words: usize,
}

impl Default for LdaOptions {
    fn default() -> Self {
        LdaOptions {
            num_topics: 10,
            num_words: 0,
            alpha: 0.1,
            beta: 0.01,
            eta: 100.0,
            epochs: 1000,
            seed: 42,
            parallel: false,
            log_every: 10,
            num_top_words: 20,
        }
    }
}

impl LdaOptions {
    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters {
            alpha: self.alpha,
            beta: self.beta,
            eta: self.eta,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.hyperparameters().validate()?;
        if self.num_topics == 0 {
            return Err(LdaError::Config("number of topics must be positive".into()));
        }
        if self.num_words == 0 {
            return Err(LdaError::Config("number of words must be positive".into()));
        }
        if self.log_every == 0 {
            return Err(LdaError::Config("log interval must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Uninitialized,
    Initialized,
    Sampling { epoch: usize },
    Converged,
}

/// Everything that exists once the inputs are accepted.
struct Model {
    vocab: Vocabulary,
    tree: CorrelationTree,
    corpus: Corpus,
    counts: CountTables,
}

pub struct Estimator {
    options: LdaOptions,
    hyper: Hyperparameters,
    state: SamplerState,
    model: Option<Model>,
    trace: McmcTrace,
}

impl Estimator {
    pub fn new(options: LdaOptions) -> Result<Self> {
        options.validate()?;
        Ok(Estimator {
            hyper: options.hyperparameters(),
            options,
            state: SamplerState::Uninitialized,
            model: None,
            trace: McmcTrace::new(),
        })
    }

    /// Read and validate all input files, then build the count tables.
    ///
    /// * `data_file` - bag-of-words, one document per line
    /// * `vocab_file` - one word per line, line index is the word id
    /// * `cluster_file` - one comma-separated cluster of words per line
    /// * `z_file` - initial topic per token, aligned with `data_file`
    pub fn load(&mut self, data_file: &str, vocab_file: &str, cluster_file: &str, z_file: &str) -> Result<()> {
        self.expect_state(SamplerState::Uninitialized, "load")?;

        let vocab = Vocabulary::from_file(vocab_file, self.options.num_words)?;
        let clusters = CorrelationTree::read_clusters(cluster_file, &vocab)?;
        let tree = CorrelationTree::build(&vocab, &clusters)?;
        let words = read_bag_of_words(data_file, &vocab)?;
        let topics = read_topic_assignments(z_file, &words, self.options.num_topics)?;

        self.initialize(vocab, tree, words, topics)
    }

    /// Same as [`Estimator::load`] from in-memory inputs.
    ///
    /// * `vocab` - must have `options.num_words` entries
    /// * `clusters` - word clusters as word ids
    /// * `words` - word ids per document
    /// * `topics` - initial topic per token
    pub fn from_parts(
        options: LdaOptions,
        vocab: Vocabulary,
        clusters: &[Cluster],
        words: Vec<Vec<usize>>,
        topics: Vec<Vec<usize>>,
    ) -> Result<Self> {
        let mut estimator = Self::new(options)?;
        if vocab.len() != estimator.options.num_words {
            return Err(LdaError::Data(format!(
                "expected {} words, the vocabulary has {}",
                estimator.options.num_words,
                vocab.len()
            )));
        }
        let tree = CorrelationTree::build(&vocab, clusters)?;
        estimator.initialize(vocab, tree, words, topics)?;
        Ok(estimator)
    }

    fn initialize(
        &mut self,
        vocab: Vocabulary,
        tree: CorrelationTree,
        words: Vec<Vec<usize>>,
        topics: Vec<Vec<usize>>,
    ) -> Result<()> {
        let kk = self.options.num_topics;
        let corpus = Corpus::with_assignments(words, topics, &tree, kk)?;
        let counts = CountTables::from_corpus(&corpus, kk, tree.num_nodes())?;

        info!(
            "{} documents, {} tokens, {} words, {} clusters, {} topics",
            corpus.num_docs(),
            corpus.num_tokens(),
            tree.num_words(),
            tree.num_clusters(),
            kk
        );

        self.model = Some(Model {
            vocab,
            tree,
            corpus,
            counts,
        });
        self.state = SamplerState::Initialized;
        Ok(())
    }

    fn expect_state(&self, expected: SamplerState, what: &str) -> Result<()> {
        if self.state != expected {
            return Err(LdaError::Config(format!(
                "cannot {} in state {:?} (expected {:?})",
                what, self.state, expected
            )));
        }
        Ok(())
    }

    fn model(&self) -> Result<&Model> {
        self.model
            .as_ref()
            .ok_or_else(|| LdaError::Config("no input loaded".into()))
    }

    /// Run `options.epochs` Gibbs sweeps.
    ///
    /// The log-likelihood is recorded before the first sweep, every
    /// `log_every` sweeps, and after the last one.
    pub fn estimate(&mut self) -> Result<&McmcTrace> {
        self.expect_state(SamplerState::Initialized, "estimate")?;

        let epochs = self.options.epochs;
        let log_every = self.options.log_every;
        let parallel = self.options.parallel;
        let hyper = self.hyper;

        let model = self
            .model
            .as_mut()
            .ok_or_else(|| LdaError::Config("no input loaded".into()))?;
        let Model {
            tree,
            corpus,
            counts,
            ..
        } = model;

        let mut sampler = GibbsSampler::from_seed(self.options.seed);
        let llik = GibbsSampler::log_likelihood(tree, counts, &hyper);
        self.trace.push(0, llik);
        info!("initial log-likelihood: {:.4}", llik);

        let pb = new_progress_bar(
            epochs as u64,
            "Gibbs {bar:40} {pos}/{len} sweeps ({eta})",
            log::log_enabled!(log::Level::Info),
        );

        for epoch in 1..=epochs {
            self.state = SamplerState::Sampling { epoch };

            let moves = if parallel {
                sampler.run_parallel(tree, corpus, counts, &hyper, 1)?
            } else {
                sampler.run(tree, corpus, counts, &hyper, 1)?
            };

            if cfg!(debug_assertions) {
                counts.check_invariants(corpus)?;
            }

            if epoch % log_every == 0 || epoch == epochs {
                let llik = GibbsSampler::log_likelihood(tree, counts, &hyper);
                self.trace.push(epoch, llik);
                pb.suspend(|| {
                    info!("epoch {}: {} moves, log-likelihood {:.4}", epoch, moves, llik);
                });
            } else {
                debug!("epoch {}: {} moves", epoch, moves);
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if let (Some(last), Some(best), Some(recent)) =
            (self.trace.last(), self.trace.best(), self.trace.tail_mean(5))
        {
            info!(
                "final log-likelihood {:.4} (best {:.4}, mean of last {} reports {:.4})",
                last,
                best,
                self.trace.len().min(5),
                recent
            );
        }
        if let Some(change) = self.trace.relative_change(1) {
            debug!("last relative change {:.2e}", change);
        }

        self.state = SamplerState::Converged;
        Ok(&self.trace)
    }

    /// K x W topic-word matrix from the current counts.
    pub fn topic_word_distribution(&self) -> Result<Mat> {
        let model = self.model()?;
        let snapshot = model.counts.snapshot();
        Ok(DistributionEstimator::new(&model.tree, &snapshot, self.hyper).topic_word_distribution())
    }

    /// D x K document-topic matrix from the current counts.
    pub fn doc_topic_distribution(&self) -> Result<Mat> {
        let model = self.model()?;
        let snapshot = model.counts.snapshot();
        Ok(DistributionEstimator::new(&model.tree, &snapshot, self.hyper).doc_topic_distribution())
    }

    /// Write phi, theta, final assignments, top words, the
    /// log-likelihood trace and the options used.
    pub fn save(&self, out_dir: &str) -> Result<()> {
        self.expect_state(SamplerState::Converged, "save")?;
        let model = self.model()?;

        let snapshot = model.counts.snapshot();
        let dist = DistributionEstimator::new(&model.tree, &snapshot, self.hyper);
        let phi = dist.topic_word_distribution();
        let theta = dist.doc_topic_distribution();

        let writer = ResultWriter::new(out_dir)?;
        writer.write_topic_word(&phi)?;
        writer.write_doc_topic(&theta)?;
        writer.write_assignments(&model.corpus)?;
        writer.write_top_words(&top_words(&phi, &model.vocab, self.options.num_top_words))?;
        writer.write_trace(&self.trace)?;
        writer.write_json(OPTIONS_FILE, &self.options)?;

        info!("wrote results to {}", out_dir);
        Ok(())
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn options(&self) -> &LdaOptions {
        &self.options
    }

    pub fn trace(&self) -> &McmcTrace {
        &self.trace
    }

    pub fn tree(&self) -> Option<&CorrelationTree> {
        self.model.as_ref().map(|m| &m.tree)
    }

    pub fn corpus(&self) -> Option<&Corpus> {
        self.model.as_ref().map(|m| &m.corpus)
    }

    pub fn counts(&self) -> Option<&CountTables> {
        self.model.as_ref().map(|m| &m.counts)
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.model.as_ref().map(|m| &m.vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(epochs: usize) -> LdaOptions {
        LdaOptions {
            num_topics: 2,
            num_words: 4,
            alpha: 0.1,
            beta: 0.1,
            eta: 0.5,
            epochs,
            seed: 42,
            log_every: 5,
            ..Default::default()
        }
    }

    fn build(epochs: usize) -> anyhow::Result<Estimator> {
        let vocab = Vocabulary::from_words(["a", "b", "c", "d"])?;
        Ok(Estimator::from_parts(
            options(epochs),
            vocab,
            &[Cluster::new("ab", vec![0, 1])],
            vec![vec![0, 2], vec![1, 3]],
            vec![vec![0, 1], vec![1, 0]],
        )?)
    }

    #[test]
    fn test_options_validation() {
        assert!(options(1).validate().is_ok());
        for bad in [
            LdaOptions { alpha: 0.0, ..options(1) },
            LdaOptions { beta: -0.5, ..options(1) },
            LdaOptions { eta: f64::NAN, ..options(1) },
            LdaOptions { num_topics: 0, ..options(1) },
            LdaOptions { num_words: 0, ..options(1) },
            LdaOptions { log_every: 0, ..options(1) },
        ] {
            assert!(Estimator::new(bad).err().map(|e| e.is_config()).unwrap_or(false));
        }
    }

    #[test]
    fn test_lifecycle() -> anyhow::Result<()> {
        let mut est = Estimator::new(options(3))?;
        assert_eq!(est.state(), SamplerState::Uninitialized);
        assert!(est.estimate().is_err());

        let mut est = build(12)?;
        assert_eq!(est.state(), SamplerState::Initialized);
        assert!(est.save("unused").unwrap_err().is_config());

        let trace = est.estimate()?;
        // epoch 0, 5, 10 and the last one
        assert_eq!(trace.sweeps, vec![0, 5, 10, 12]);
        assert!(trace.log_likelihoods.iter().all(|x| x.is_finite()));
        assert_eq!(est.state(), SamplerState::Converged);
        assert!(est.estimate().is_err());

        let corpus = est.corpus().unwrap();
        est.counts().unwrap().check_invariants(corpus)?;
        Ok(())
    }

    #[test]
    fn test_zero_epochs_keeps_initial_state() -> anyhow::Result<()> {
        let mut est = build(0)?;
        let before = est.corpus().unwrap().clone();
        est.estimate()?;
        assert_eq!(est.corpus().unwrap(), &before);
        assert_eq!(est.trace().sweeps, vec![0]);
        Ok(())
    }

    #[test]
    fn test_vocabulary_size_mismatch() -> anyhow::Result<()> {
        let vocab = Vocabulary::from_words(["a", "b", "c"])?;
        let err = Estimator::from_parts(options(1), vocab, &[], vec![], vec![]).err().unwrap();
        assert!(err.is_data());
        Ok(())
    }

    #[test]
    fn test_distributions_are_stochastic() -> anyhow::Result<()> {
        let mut est = build(20)?;
        est.estimate()?;
        let phi = est.topic_word_distribution()?;
        let theta = est.doc_topic_distribution()?;
        for k in 0..2 {
            approx::assert_abs_diff_eq!(phi.row(k).sum(), 1.0, epsilon = 1e-6);
        }
        for d in 0..2 {
            approx::assert_abs_diff_eq!(theta.row(d).sum(), 1.0, epsilon = 1e-6);
        }
        Ok(())
    }
}
