//! Bijection between surface words and dense integer ids.

use crate::common::*;
use crate::io::read_lines;
use fnv::FnvHashMap as HashMap;

/// Word <-> id mapping, ids dense in `[0, len)`. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    words: Vec<Box<str>>,
    word_to_id: HashMap<Box<str>, usize>,
}

impl Vocabulary {
    /// Build from an ordered word list; position is the id.
    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Vocabulary {
            words: vec![],
            word_to_id: HashMap::default(),
        };
        for (i, w) in words.into_iter().enumerate() {
            vocab.insert(w.as_ref()).map_err(|msg| {
                LdaError::Data(format!("vocabulary entry {}: {}", i, msg))
            })?;
        }
        Ok(vocab)
    }

    /// Read a vocabulary file: one word per line, line number (0-based) is the id.
    ///
    /// * `vocab_file` - file name--either gzipped or not
    /// * `num_words` - expected vocabulary size; a mismatch is a `DataError`
    pub fn from_file(vocab_file: &str, num_words: usize) -> Result<Self> {
        let mut lines = read_lines(vocab_file)?;

        // tolerate a trailing newline at the end of the file
        while lines.last().map(|x| x.trim().is_empty()).unwrap_or(false) {
            lines.pop();
        }

        let mut vocab = Vocabulary {
            words: Vec::with_capacity(lines.len()),
            word_to_id: HashMap::default(),
        };

        for (i, line) in lines.iter().enumerate() {
            vocab
                .insert(line.trim())
                .map_err(|msg| LdaError::data_at(vocab_file, i + 1, msg))?;
        }

        if vocab.len() != num_words {
            return Err(LdaError::Data(format!(
                "{}: expected {} words, found {}",
                vocab_file,
                num_words,
                vocab.len()
            )));
        }

        info!("read {} words from {}", vocab.len(), vocab_file);
        Ok(vocab)
    }

    fn insert(&mut self, word: &str) -> std::result::Result<usize, String> {
        if word.is_empty() {
            return Err("empty word".to_string());
        }
        if word.chars().any(char::is_whitespace) {
            return Err(format!("word `{}` contains whitespace", word));
        }
        if self.word_to_id.contains_key(word) {
            return Err(format!("duplicate word `{}`", word));
        }
        let id = self.words.len();
        let word: Box<str> = word.into();
        self.word_to_id.insert(word.clone(), id);
        self.words.push(word);
        Ok(id)
    }

    pub fn id(&self, word: &str) -> Option<usize> {
        self.word_to_id.get(word).copied()
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.words.get(id).map(|w| w.as_ref())
    }

    pub fn words(&self) -> &[Box<str>] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bijection() -> anyhow::Result<()> {
        let vocab = Vocabulary::from_words(["apple", "banana", "cherry"])?;
        assert_eq!(vocab.len(), 3);
        for (i, w) in vocab.words().iter().enumerate() {
            assert_eq!(vocab.id(w), Some(i));
            assert_eq!(vocab.word(i), Some(w.as_ref()));
        }
        assert_eq!(vocab.id("durian"), None);
        assert_eq!(vocab.word(3), None);
        Ok(())
    }

    #[test]
    fn test_duplicate_and_empty_words() {
        let err = Vocabulary::from_words(["a", "b", "a"]).unwrap_err();
        assert!(err.is_data());
        assert!(err.to_string().contains("duplicate"));

        let err = Vocabulary::from_words(["a", ""]).unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn test_from_file_checks_size() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("v.txt");
        std::fs::write(&file, "a\nb\nc\nd\n")?;
        let file = file.to_str().unwrap();

        let vocab = Vocabulary::from_file(file, 4)?;
        assert_eq!(vocab.id("d"), Some(3));

        let err = Vocabulary::from_file(file, 5).unwrap_err();
        assert!(err.is_data());
        Ok(())
    }

    #[test]
    fn test_from_file_reports_line() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("v.txt");
        std::fs::write(&file, "a\n\nc\n")?;
        let err = Vocabulary::from_file(file.to_str().unwrap(), 3).unwrap_err();
        assert!(err.to_string().contains(":2:"), "{}", err);
        Ok(())
    }
}
