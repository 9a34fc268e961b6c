//! Documents as ordered token sequences with mutable latent state.

use crate::common::*;
use crate::correlation_tree::CorrelationTree;
use crate::io::read_lines;
use crate::vocabulary::Vocabulary;
use rand::Rng;

/// One word occurrence and its current `(topic, node)` assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub word: usize,
    pub topic: usize,
    /// tree node credited with generating this occurrence
    pub node: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub tokens: Vec<Token>,
}

impl Document {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Ordered collection of documents. Owns every token's latent state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Attach initial topics to word sequences.
    ///
    /// Each token starts at its outermost candidate node (the cluster node
    /// for clustered words, the leaf otherwise).
    ///
    /// * `words` - word ids per document
    /// * `topics` - initial topic per token, aligned with `words`
    /// * `tree` - correlation tree over the same vocabulary
    /// * `num_topics` - number of topics K
    pub fn with_assignments(
        words: Vec<Vec<usize>>,
        topics: Vec<Vec<usize>>,
        tree: &CorrelationTree,
        num_topics: usize,
    ) -> Result<Self> {
        if words.len() != topics.len() {
            return Err(LdaError::Data(format!(
                "{} documents but {} assignment rows",
                words.len(),
                topics.len()
            )));
        }

        let num_words = tree.num_words();
        let mut documents = Vec::with_capacity(words.len());

        for (d, (doc_words, doc_topics)) in words.into_iter().zip(topics).enumerate() {
            if doc_words.len() != doc_topics.len() {
                return Err(LdaError::Data(format!(
                    "document {} has {} tokens but {} assignments",
                    d,
                    doc_words.len(),
                    doc_topics.len()
                )));
            }
            let mut tokens = Vec::with_capacity(doc_words.len());
            for (w, k) in doc_words.into_iter().zip(doc_topics) {
                if w >= num_words {
                    return Err(LdaError::Data(format!(
                        "document {}: word id {} outside vocabulary of size {}",
                        d, w, num_words
                    )));
                }
                if k >= num_topics {
                    return Err(LdaError::Data(format!(
                        "document {}: topic {} outside [0, {})",
                        d, k, num_topics
                    )));
                }
                tokens.push(Token {
                    word: w,
                    topic: k,
                    node: tree.nodes_above(w)[0],
                });
            }
            documents.push(Document { tokens });
        }

        Ok(Corpus { documents })
    }

    /// Same as [`Corpus::with_assignments`] with uniformly random topics.
    pub fn with_random_assignments<R: Rng>(
        words: Vec<Vec<usize>>,
        tree: &CorrelationTree,
        num_topics: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if num_topics == 0 {
            return Err(LdaError::Config("number of topics must be positive".into()));
        }
        let topics = random_topics(&words, num_topics, rng);
        Self::with_assignments(words, topics, tree, num_topics)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut [Document] {
        &mut self.documents
    }

    pub fn num_docs(&self) -> usize {
        self.documents.len()
    }

    pub fn num_tokens(&self) -> usize {
        self.documents.iter().map(|d| d.len()).sum()
    }

    /// Topics per token, in document order
    pub fn topics(&self) -> Vec<Vec<usize>> {
        self.documents
            .iter()
            .map(|d| d.tokens.iter().map(|t| t.topic).collect())
            .collect()
    }
}

/// Uniform random topic per token.
pub fn random_topics<R: Rng>(words: &[Vec<usize>], num_topics: usize, rng: &mut R) -> Vec<Vec<usize>> {
    words
        .iter()
        .map(|doc| doc.iter().map(|_| rng.random_range(0..num_topics)).collect())
        .collect()
}

///
/// Read a bag-of-words file: one document per line, whitespace-separated
/// words that must all be present in the vocabulary.
///
/// A blank line is an empty document (kept so rows stay aligned with the
/// assignment file).
///
pub fn read_bag_of_words(bow_file: &str, vocab: &Vocabulary) -> Result<Vec<Vec<usize>>> {
    let lines = read_lines(bow_file)?;
    let mut docs = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let doc = line
            .split_whitespace()
            .map(|word| {
                vocab.id(word).ok_or_else(|| {
                    LdaError::data_at(bow_file, i + 1, format!("word `{}` is not in the vocabulary", word))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        docs.push(doc);
    }

    let ntok: usize = docs.iter().map(|d| d.len()).sum();
    info!("read {} documents, {} tokens from {}", docs.len(), ntok, bow_file);
    Ok(docs)
}

///
/// Read an assignment (z) file aligned with the bag-of-words documents.
///
/// * `z_file` - one line per document, one topic id per token
/// * `words` - documents as returned by [`read_bag_of_words`]
/// * `num_topics` - topics must fall in `[0, num_topics)`
///
pub fn read_topic_assignments(
    z_file: &str,
    words: &[Vec<usize>],
    num_topics: usize,
) -> Result<Vec<Vec<usize>>> {
    let mut lines = read_lines(z_file)?;

    // a trailing blank line only counts if the corpus ends with an empty document
    while lines.len() > words.len() && lines.last().map(|x| x.trim().is_empty()).unwrap_or(false) {
        lines.pop();
    }

    if lines.len() != words.len() {
        return Err(LdaError::Data(format!(
            "{}: expected {} lines (one per document), found {}",
            z_file,
            words.len(),
            lines.len()
        )));
    }

    let mut topics = Vec::with_capacity(lines.len());
    for (i, (line, doc)) in lines.iter().zip(words.iter()).enumerate() {
        let row = line
            .split_whitespace()
            .map(|x| {
                let k = x
                    .parse::<usize>()
                    .map_err(|_| LdaError::data_at(z_file, i + 1, format!("bad topic `{}`", x)))?;
                if k >= num_topics {
                    return Err(LdaError::data_at(
                        z_file,
                        i + 1,
                        format!("topic {} outside [0, {})", k, num_topics),
                    ));
                }
                Ok(k)
            })
            .collect::<Result<Vec<usize>>>()?;

        if row.len() != doc.len() {
            return Err(LdaError::data_at(
                z_file,
                i + 1,
                format!("{} topics for a document of {} tokens", row.len(), doc.len()),
            ));
        }
        topics.push(row);
    }
    Ok(topics)
}
