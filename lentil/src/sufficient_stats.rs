//! Sufficient statistics for the tree-structured topic model.
//!
//! Tracks three coupled count tables:
//! - `doc_topic[d][k]`: tokens of document d assigned topic k
//! - `topic_node[k][n]`: tokens assigned topic k and credited to tree node n
//! - `topic_total[k]`: Σ_n topic_node[k][n]
//!
//! Supports O(1) single-token updates (Gibbs step) plus full recomputation
//! from the corpus for consistency checks.

use crate::common::*;
use crate::corpus::Corpus;

/// Count tables, flattened row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountTables {
    /// Number of documents
    pub num_docs: usize,
    /// Number of topics K
    pub num_topics: usize,
    /// Number of tree nodes (including the root, which never receives counts)
    pub num_nodes: usize,
    /// `doc_topic[d * K + k]`
    doc_topic: Vec<usize>,
    /// `topic_node[k * N + n]`
    topic_node: Vec<usize>,
    /// `topic_total[k]`
    topic_total: Vec<usize>,
    /// tokens per document
    doc_total: Vec<usize>,
}

/// Immutable copy of the count tables handed to the distribution estimator.
pub type CountSnapshot = CountTables;

impl CountTables {
    /// Empty tables.
    pub fn new(num_docs: usize, num_topics: usize, num_nodes: usize) -> Self {
        CountTables {
            num_docs,
            num_topics,
            num_nodes,
            doc_topic: vec![0; num_docs * num_topics],
            topic_node: vec![0; num_topics * num_nodes],
            topic_total: vec![0; num_topics],
            doc_total: vec![0; num_docs],
        }
    }

    /// Accumulate the current assignment of every token.
    ///
    /// * `corpus` - tokens with `(topic, node)` already set
    /// * `num_topics` - number of topics K
    /// * `num_nodes` - size of the tree's node space
    pub fn from_corpus(corpus: &Corpus, num_topics: usize, num_nodes: usize) -> Result<Self> {
        let mut counts = Self::new(corpus.num_docs(), num_topics, num_nodes);
        for (d, doc) in corpus.documents().iter().enumerate() {
            for t in doc.tokens.iter() {
                if t.topic >= num_topics || t.node >= num_nodes {
                    return Err(LdaError::Data(format!(
                        "document {}: assignment (topic {}, node {}) outside ({}, {})",
                        d, t.topic, t.node, num_topics, num_nodes
                    )));
                }
                counts.increment(d, t.topic, t.node);
            }
        }
        Ok(counts)
    }

    #[inline]
    pub fn doc_topic(&self, doc: usize, topic: usize) -> usize {
        self.doc_topic[doc * self.num_topics + topic]
    }

    #[inline]
    pub fn topic_node(&self, topic: usize, node: usize) -> usize {
        self.topic_node[topic * self.num_nodes + node]
    }

    #[inline]
    pub fn topic_total(&self, topic: usize) -> usize {
        self.topic_total[topic]
    }

    #[inline]
    pub fn doc_total(&self, doc: usize) -> usize {
        self.doc_total[doc]
    }

    /// Add one token's contribution to all tables.
    #[inline]
    pub fn increment(&mut self, doc: usize, topic: usize, node: usize) {
        self.doc_topic[doc * self.num_topics + topic] += 1;
        self.topic_node[topic * self.num_nodes + node] += 1;
        self.topic_total[topic] += 1;
        self.doc_total[doc] += 1;
    }

    /// Remove one token's contribution from all tables.
    ///
    /// Nothing is modified if any of the cells is already zero; that case
    /// is an `InternalInvariant` error.
    #[inline]
    pub fn decrement(&mut self, doc: usize, topic: usize, node: usize) -> Result<()> {
        let dk = doc * self.num_topics + topic;
        let kn = topic * self.num_nodes + node;
        if self.doc_topic[dk] == 0
            || self.topic_node[kn] == 0
            || self.topic_total[topic] == 0
            || self.doc_total[doc] == 0
        {
            return Err(LdaError::InternalInvariant(format!(
                "count underflow at doc {}, topic {}, node {}",
                doc, topic, node
            )));
        }
        self.doc_topic[dk] -= 1;
        self.topic_node[kn] -= 1;
        self.topic_total[topic] -= 1;
        self.doc_total[doc] -= 1;
        Ok(())
    }

    /// Copy for read-only consumers.
    pub fn snapshot(&self) -> CountSnapshot {
        self.clone()
    }

    /// Verify the coupled-table invariants against the corpus.
    ///
    /// - Σ_k doc_topic[d][k] = |d| for every document
    /// - Σ_n topic_node[k][n] = topic_total[k] = Σ_d doc_topic[d][k] for every topic
    pub fn check_invariants(&self, corpus: &Corpus) -> Result<()> {
        if corpus.num_docs() != self.num_docs {
            return Err(LdaError::InternalInvariant(format!(
                "{} documents in the corpus, {} in the count tables",
                corpus.num_docs(),
                self.num_docs
            )));
        }

        let mut doc_sum_per_topic = vec![0usize; self.num_topics];

        for (d, doc) in corpus.documents().iter().enumerate() {
            let row = &self.doc_topic[d * self.num_topics..(d + 1) * self.num_topics];
            let s: usize = row.iter().sum();
            if s != doc.len() || self.doc_total[d] != doc.len() {
                return Err(LdaError::InternalInvariant(format!(
                    "document {}: Σ_k doc_topic = {}, cached total = {}, tokens = {}",
                    d,
                    s,
                    self.doc_total[d],
                    doc.len()
                )));
            }
            for (k, &c) in row.iter().enumerate() {
                doc_sum_per_topic[k] += c;
            }
        }

        for k in 0..self.num_topics {
            let row = &self.topic_node[k * self.num_nodes..(k + 1) * self.num_nodes];
            let s: usize = row.iter().sum();
            if s != self.topic_total[k] || doc_sum_per_topic[k] != self.topic_total[k] {
                return Err(LdaError::InternalInvariant(format!(
                    "topic {}: Σ_n topic_node = {}, topic_total = {}, Σ_d doc_topic = {}",
                    k, s, self.topic_total[k], doc_sum_per_topic[k]
                )));
            }
        }
        Ok(())
    }

    /// Full recomputation from the corpus; the result must equal `self`.
    pub fn recompute(&mut self, corpus: &Corpus) -> Result<()> {
        *self = Self::from_corpus(corpus, self.num_topics, self.num_nodes)?;
        Ok(())
    }
}
