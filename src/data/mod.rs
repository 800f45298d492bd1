// Input files produced by the upstream data-preparation tooling.
//
//   unseen events   id,title,description per line
//   corpus          JSON {item_id: [[keyword, weight], ...]}
//   trained         JSON {item_id: [v1, v2, ...]}

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Item id -> (keyword, weight) list. Ordered by id so every run inserts
/// items into the index in the same order.
pub type Corpus = BTreeMap<String, Vec<(String, f64)>>;

/// Item id -> embedding vector.
pub type EmbeddingTable = HashMap<String, Vec<f64>>;

/// An item with no interaction history.
#[derive(Debug, Clone, PartialEq)]
pub struct UnseenItem {
    pub id: String,
    pub title: String,
    pub description: String,
}

impl UnseenItem {
    /// Title and description as one query string.
    pub fn text(&self) -> String {
        format!("{}{}", self.title, self.description)
    }
}

/// Parse unseen-event lines. Lines with fewer than three comma-separated
/// fields are skipped; commas after the second belong to the description.
/// A repeated id keeps its first position and takes the later content.
pub fn parse_unseen(content: &str) -> Vec<UnseenItem> {
    let mut items: Vec<UnseenItem> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        let mut fields = line.splitn(3, ',');
        let (Some(id), Some(title), Some(description)) =
            (fields.next(), fields.next(), fields.next())
        else {
            if !line.is_empty() {
                debug!(line, "Skipping unseen event line with too few fields");
            }
            continue;
        };

        let item = UnseenItem {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
        };
        match positions.get(id) {
            Some(&pos) => items[pos] = item,
            None => {
                positions.insert(id.to_string(), items.len());
                items.push(item);
            }
        }
    }

    items
}

pub fn load_unseen(path: &Path) -> Result<Vec<UnseenItem>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read unseen events from {}", path.display()))?;
    let items = parse_unseen(&content);
    info!(count = items.len(), "Loaded unseen events");
    Ok(items)
}

pub fn load_corpus(path: &Path) -> Result<Corpus> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus from {}", path.display()))?;
    let corpus: Corpus = serde_json::from_str(&json)
        .with_context(|| format!("Invalid corpus JSON in {}", path.display()))?;
    info!(items = corpus.len(), "Loaded item keyword corpus");
    Ok(corpus)
}

/// Each item's keywords as a token list, in corpus order.
pub fn corpus_documents(corpus: &Corpus) -> Vec<Vec<String>> {
    corpus
        .values()
        .map(|tags| tags.iter().map(|(word, _)| word.clone()).collect())
        .collect()
}

pub fn load_trained(path: &Path) -> Result<EmbeddingTable> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trained embeddings from {}", path.display()))?;
    let table: EmbeddingTable = serde_json::from_str(&json)
        .with_context(|| format!("Invalid trained embedding JSON in {}", path.display()))?;
    info!(items = table.len(), "Loaded trained item embeddings");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unseen_skips_short_lines() {
        let items = parse_unseen("1,title,desc\njust-an-id\n2,only title\n\n3,t,d\n");
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_parse_unseen_keeps_commas_in_description() {
        let items = parse_unseen("7,標題,第一句,第二句\n");
        assert_eq!(items[0].title, "標題");
        assert_eq!(items[0].description, "第一句,第二句");
    }

    #[test]
    fn test_parse_unseen_duplicate_id_keeps_position() {
        let items = parse_unseen("a,t1,d1\nb,t2,d2\na,t3,d3\n");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a");
        assert_eq!(items[0].title, "t3");
        assert_eq!(items[1].id, "b");
    }

    #[test]
    fn test_corpus_parses_keyword_weight_pairs() {
        let corpus: Corpus =
            serde_json::from_str(r#"{"20": [["展覽", 0.8], ["藝術", 1]], "10": []}"#).unwrap();
        assert_eq!(corpus.keys().collect::<Vec<_>>(), vec!["10", "20"]);
        assert_eq!(corpus["20"][1], ("藝術".to_string(), 1.0));

        let docs = corpus_documents(&corpus);
        assert_eq!(docs, vec![vec![], vec!["展覽".to_string(), "藝術".to_string()]]);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let path = std::env::temp_dir().join("coldprop-missing-corpus.json");
        let err = load_corpus(&path).unwrap_err();
        assert!(format!("{err:#}").contains("coldprop-missing-corpus.json"));
    }
}
