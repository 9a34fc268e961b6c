//! Topic modelling with a word-correlation tree.
//!
//! Collapsed Gibbs sampling for latent Dirichlet allocation where each
//! token is credited either to its own word or to a cluster of correlated
//! words above it. Sharing mass across a cluster keeps topics that differ
//! only in near-synonyms from drifting apart between runs.
//!
//! # Model
//!
//! Each word is a leaf of a shallow tree: clustered words hang below their
//! cluster node, unclustered words directly below the root. A token picks a
//! topic and one node on its word's path; a cluster node emits each of its
//! words uniformly. Leaves carry prior `beta`, cluster nodes prior `eta`.

/// Shared aliases, logging re-exports and progress bars
pub mod common;

/// Error taxonomy
pub mod error;

/// Plain and gzipped readers/writers, result files
pub mod io;

/// Word <-> id bijection
pub mod vocabulary;

/// Arena correlation tree over the vocabulary
pub mod correlation_tree;

/// Documents, tokens and their latent `(topic, node)` state
pub mod corpus;

/// Coupled document-topic / topic-node count tables
pub mod sufficient_stats;

/// Hyperparameters and Dirichlet-multinomial scores
pub mod model;

/// Collapsed Gibbs sampler over `(topic, node)` pairs
pub mod gibbs;

/// Topic-word and document-topic point estimates
pub mod distribution;

/// Load, sample, report, save
pub mod estimator;

pub use correlation_tree::{Cluster, CorrelationTree};
pub use corpus::Corpus;
pub use error::{LdaError, Result};
pub use estimator::{Estimator, LdaOptions, SamplerState};
pub use vocabulary::Vocabulary;
