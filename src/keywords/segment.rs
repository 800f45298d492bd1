// Chinese word segmentation and keyword candidate filtering.
//
// jieba does the segmentation and part-of-speech tagging. A word is a usable
// keyword candidate when its tag is allowed, it is not a stop word, it has at
// least two characters and it contains a letter or a CJK ideograph (numbers
// and punctuation never make useful concepts).

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use jieba_rs::Jieba;
use regex_lite::Regex;
use stop_words::{get, LANGUAGE};
use tracing::info;

/// Parts of speech kept by the TextRank-family rankers: place names and nouns.
pub const TEXTRANK_POS: [&str; 2] = ["ns", "n"];

/// A segmented word and its part-of-speech tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedWord {
    pub word: String,
    pub tag: String,
}

pub struct Segmenter {
    jieba: Jieba,
    stop_words: HashSet<String>,
    word_pattern: Regex,
}

impl Segmenter {
    /// Segmenter with jieba's bundled dictionary.
    pub fn new() -> Result<Self> {
        Self::from_jieba(Jieba::new())
    }

    /// Segmenter with a custom jieba dictionary file (e.g. a Traditional
    /// Chinese one).
    pub fn with_dict(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open jieba dictionary {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let jieba = Jieba::with_dict(&mut reader).map_err(|e| {
            anyhow::anyhow!("Failed to load jieba dictionary {}: {:?}", path.display(), e)
        })?;
        info!("Loaded jieba dictionary from {}", path.display());
        Self::from_jieba(jieba)
    }

    fn from_jieba(jieba: Jieba) -> Result<Self> {
        let stop_words: HashSet<String> = get(LANGUAGE::Chinese)
            .into_iter()
            .chain(get(LANGUAGE::English))
            .collect();
        let word_pattern =
            Regex::new("[A-Za-z㐀-䶿一-鿿豈-﫿]").context("Invalid keyword pattern")?;

        Ok(Self {
            jieba,
            stop_words,
            word_pattern,
        })
    }

    pub fn jieba(&self) -> &Jieba {
        &self.jieba
    }

    /// Segment and tag `text`, keeping every word.
    pub fn tag(&self, text: &str) -> Vec<TaggedWord> {
        self.jieba
            .tag(text, true)
            .into_iter()
            .map(|t| TaggedWord {
                word: t.word.to_string(),
                tag: t.tag.to_string(),
            })
            .collect()
    }

    /// Whether a tagged word may become a keyword. An empty `allowed_pos`
    /// accepts every tag.
    pub fn is_candidate(&self, word: &TaggedWord, allowed_pos: &[&str]) -> bool {
        let pos_ok = allowed_pos.is_empty() || allowed_pos.contains(&word.tag.as_str());
        pos_ok
            && word.word.chars().count() >= 2
            && !self.stop_words.contains(&word.word.to_lowercase())
            && self.word_pattern.is_match(&word.word)
    }

    /// Distinct candidate words of `text`, in first-seen order.
    pub fn candidates(&self, text: &str, allowed_pos: &[&str]) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tag(text)
            .into_iter()
            .filter(|w| self.is_candidate(w, allowed_pos))
            .filter(|w| seen.insert(w.word.clone()))
            .map(|w| w.word)
            .collect()
    }
}
