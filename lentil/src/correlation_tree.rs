//! Word correlation tree stored as an index arena.
//!
//! Node layout:
//! - Leaves occupy ids `0..num_words`; leaf id == word id
//! - Cluster nodes occupy `num_words..num_words + num_clusters`, in input order
//! - The synthetic root is the last node
//!
//! Clustered words hang below their cluster node; unclustered words hang
//! directly off the root. The root only ties the forest together and is
//! never a sampling candidate, so an unclustered word has exactly one
//! candidate node (its own leaf).
//!
//! ```text
//!              root
//!        /      |      \
//!   cluster0    c      d
//!    /    \
//!   a      b
//! ```

use crate::common::*;
use crate::io::read_lines;
use crate::vocabulary::Vocabulary;

/// A named group of correlated words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub name: Box<str>,
    pub members: Vec<usize>,
}

impl Cluster {
    pub fn new(name: &str, members: Vec<usize>) -> Self {
        Cluster {
            name: name.into(),
            members,
        }
    }
}

/// What a tree node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// a single vocabulary word
    Leaf { word: usize },
    /// a correlation group (index into the cluster list)
    Cluster { index: usize },
    /// synthetic root
    Root,
}

/// One arena slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub kind: NodeKind,
    /// non-owning back reference; `None` only for the root
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// sorted descendant word ids
    leaves: Vec<usize>,
}

impl TreeNode {
    pub fn leaves(&self) -> &[usize] {
        &self.leaves
    }
}

/// Correlation tree partitioning the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationTree {
    nodes: Vec<TreeNode>,
    num_words: usize,
    num_clusters: usize,
    /// per word: node ids from the root down to the leaf
    paths: Vec<Vec<usize>>,
    cluster_names: Vec<Box<str>>,
}

impl CorrelationTree {
    /// Build the tree from cluster constraints.
    ///
    /// Fails with a `ConstraintError` if a word id is out of range or appears
    /// in more than one cluster (or twice in one). Empty clusters are skipped.
    pub fn build(vocab: &Vocabulary, clusters: &[Cluster]) -> Result<Self> {
        let num_words = vocab.len();

        // word -> owning cluster (position among the kept clusters)
        let mut owner: Vec<Option<usize>> = vec![None; num_words];
        let mut kept: Vec<&Cluster> = Vec::with_capacity(clusters.len());

        for cluster in clusters {
            if cluster.members.is_empty() {
                debug!("skipping empty cluster {}", cluster.name);
                continue;
            }
            let index = kept.len();
            for &w in cluster.members.iter() {
                if w >= num_words {
                    return Err(LdaError::Constraint(format!(
                        "cluster {} references unknown word id {} (vocabulary size {})",
                        cluster.name, w, num_words
                    )));
                }
                if let Some(prev) = owner[w] {
                    let word = vocab.word(w).unwrap_or("?");
                    return Err(LdaError::Constraint(if prev == index {
                        format!("word `{}` appears twice in cluster {}", word, cluster.name)
                    } else {
                        format!(
                            "word `{}` appears in both cluster {} and cluster {}",
                            word, kept[prev].name, cluster.name
                        )
                    }));
                }
                owner[w] = Some(index);
            }
            kept.push(cluster);
        }

        let num_clusters = kept.len();
        let root = num_words + num_clusters;
        let mut nodes = Vec::with_capacity(root + 1);

        for (w, own) in owner.iter().enumerate() {
            let parent = own.map(|c| num_words + c).unwrap_or(root);
            nodes.push(TreeNode {
                kind: NodeKind::Leaf { word: w },
                parent: Some(parent),
                children: vec![],
                leaves: vec![w],
            });
        }

        for (c, cluster) in kept.iter().enumerate() {
            let mut leaves = cluster.members.clone();
            leaves.sort_unstable();
            nodes.push(TreeNode {
                kind: NodeKind::Cluster { index: c },
                parent: Some(root),
                // children keep the input order
                children: cluster.members.clone(),
                leaves,
            });
        }

        let mut root_children: Vec<usize> = (num_words..root).collect();
        root_children.extend((0..num_words).filter(|&w| owner[w].is_none()));
        nodes.push(TreeNode {
            kind: NodeKind::Root,
            parent: None,
            children: root_children,
            leaves: (0..num_words).collect(),
        });

        let mut tree = CorrelationTree {
            nodes,
            num_words,
            num_clusters,
            paths: vec![],
            cluster_names: kept.iter().map(|c| c.name.clone()).collect(),
        };

        tree.paths = (0..num_words).map(|w| tree.walk_up(w)).collect();

        info!(
            "correlation tree: {} words, {} clusters, {} unclustered",
            num_words,
            num_clusters,
            owner.iter().filter(|x| x.is_none()).count()
        );

        Ok(tree)
    }

    /// Collect ancestors of a leaf via parent links, root first.
    fn walk_up(&self, word: usize) -> Vec<usize> {
        let mut path = vec![word];
        let mut current = word;
        while let Some(parent) = self.nodes[current].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Read a cluster file: one cluster per line, comma-separated words.
    ///
    /// Blank entries (e.g. a trailing comma) are ignored; a word missing
    /// from the vocabulary is a `ConstraintError`.
    pub fn read_clusters(cluster_file: &str, vocab: &Vocabulary) -> Result<Vec<Cluster>> {
        let lines = read_lines(cluster_file)?;
        let mut clusters = Vec::with_capacity(lines.len());

        for (i, line) in lines.iter().enumerate() {
            let mut members = vec![];
            for word in line.split(',').map(str::trim).filter(|w| !w.is_empty()) {
                let id = vocab.id(word).ok_or_else(|| {
                    LdaError::constraint_at(
                        cluster_file,
                        i + 1,
                        format!("word `{}` is not in the vocabulary", word),
                    )
                })?;
                members.push(id);
            }
            if !members.is_empty() {
                clusters.push(Cluster::new(&format!("cluster_{}", i), members));
            }
        }

        info!("read {} clusters from {}", clusters.len(), cluster_file);
        Ok(clusters)
    }

    /// Node ids from the root down to the word's leaf.
    #[inline]
    pub fn path_from_root_to_leaf(&self, word: usize) -> &[usize] {
        &self.paths[word]
    }

    /// Nodes that could have generated this word: the root-to-leaf path
    /// without the root, outermost first.
    #[inline]
    pub fn nodes_above(&self, word: usize) -> &[usize] {
        &self.paths[word][1..]
    }

    /// Sorted descendant words of a node.
    #[inline]
    pub fn leaves(&self, node: usize) -> &[usize] {
        &self.nodes[node].leaves
    }

    #[inline]
    pub fn is_leaf(&self, node: usize) -> bool {
        node < self.num_words
    }

    #[inline]
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.nodes[node].parent
    }

    pub fn node(&self, node: usize) -> &TreeNode {
        &self.nodes[node]
    }

    /// Dirichlet prior attached to a node: `beta` on leaves, `eta` on
    /// cluster nodes, nothing on the root.
    #[inline]
    pub fn prior(&self, node: usize, beta: f64, eta: f64) -> f64 {
        match self.nodes[node].kind {
            NodeKind::Leaf { .. } => beta,
            NodeKind::Cluster { .. } => eta,
            NodeKind::Root => 0.0,
        }
    }

    /// Sum of priors over every node that can be sampled.
    pub fn total_prior(&self, beta: f64, eta: f64) -> f64 {
        self.num_words as f64 * beta + self.num_clusters as f64 * eta
    }

    /// Cluster index owning a word, if any.
    pub fn cluster_of(&self, word: usize) -> Option<usize> {
        let parent = self.nodes[word].parent?;
        match self.nodes[parent].kind {
            NodeKind::Cluster { index } => Some(index),
            _ => None,
        }
    }

    pub fn cluster_node(&self, index: usize) -> usize {
        debug_assert!(index < self.num_clusters);
        self.num_words + index
    }

    pub fn cluster_name(&self, index: usize) -> &str {
        &self.cluster_names[index]
    }

    pub fn root(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_words(&self) -> usize {
        self.num_words
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }
}
