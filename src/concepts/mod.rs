// Concept space: pre-trained per-concept vectors and the keyword mapping
// that points surface words at them.
//
// A keyword only contributes to a label embedding when it resolves twice:
// word -> concept id through the mapping, then concept id -> vector through
// the table. Either miss silently drops the keyword.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::embedding::vector;

/// File name of the concept embedding table inside the concept directory.
pub const CONCEPT_EMBEDDING_FILE: &str = "rep.line2";

/// Dimension used when the concept table is empty.
pub const DEFAULT_DIM: usize = 128;

/// Concept id -> vector.
#[derive(Debug, Clone, Default)]
pub struct ConceptTable {
    vectors: HashMap<String, Vec<f64>>,
    dim: usize,
}

impl ConceptTable {
    /// Parse `concept_id v1 v2 ... vN` rows. The first line is a header and is
    /// discarded. Every row must carry the same number of components.
    pub fn parse(content: &str) -> Result<Self> {
        let mut vectors = HashMap::new();
        let mut dim: Option<usize> = None;

        for (line_no, line) in content.lines().enumerate().skip(1) {
            let mut fields = line.split_whitespace();
            let Some(id) = fields.next() else {
                continue;
            };

            let values = fields
                .map(|v| v.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Invalid vector component on line {}", line_no + 1))?;

            match dim {
                None => dim = Some(values.len()),
                Some(d) if d != values.len() => anyhow::bail!(
                    "Concept {id} on line {} has {} components, expected {d}",
                    line_no + 1,
                    values.len()
                ),
                Some(_) => {}
            }

            vectors.insert(id.to_string(), values);
        }

        Ok(Self {
            vectors,
            dim: dim.unwrap_or(DEFAULT_DIM),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read concept embeddings from {}", path.display()))?;
        let table = Self::parse(&content)?;
        info!(
            concepts = table.len(),
            dim = table.dim,
            "Loaded concept embeddings"
        );
        Ok(table)
    }

    pub fn get(&self, concept_id: &str) -> Option<&[f64]> {
        self.vectors.get(concept_id).map(Vec::as_slice)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Surface word -> concept id.
#[derive(Debug, Clone, Default)]
pub struct ConceptMapping {
    word_to_concept: HashMap<String, String>,
}

impl ConceptMapping {
    /// Parse `concept_id,word` rows. Blank lines are ignored; a row without a
    /// comma is malformed input and aborts the load.
    pub fn parse(content: &str) -> Result<Self> {
        let mut word_to_concept = HashMap::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (concept_id, word) = line.split_once(',').with_context(|| {
                format!("Malformed concept mapping on line {}: {line:?}", line_no + 1)
            })?;
            word_to_concept.insert(word.to_string(), concept_id.to_string());
        }
        Ok(Self { word_to_concept })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read concept mapping from {}", path.display()))?;
        let mapping = Self::parse(&content)?;
        info!(words = mapping.len(), "Loaded concept mapping");
        Ok(mapping)
    }

    pub fn concept_of(&self, word: &str) -> Option<&str> {
        self.word_to_concept.get(word).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.word_to_concept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_to_concept.is_empty()
    }
}

/// The concept table and mapping together, read-only after load.
#[derive(Debug, Clone, Default)]
pub struct ConceptSpace {
    pub table: ConceptTable,
    pub mapping: ConceptMapping,
}

impl ConceptSpace {
    pub fn new(table: ConceptTable, mapping: ConceptMapping) -> Self {
        Self { table, mapping }
    }

    /// Load `rep.line2` and the given mapping file from `concept_dir`.
    pub fn load(concept_dir: &Path, mapping_file: &str) -> Result<Self> {
        let table = ConceptTable::load(&concept_dir.join(CONCEPT_EMBEDDING_FILE))?;
        let mapping = ConceptMapping::load(&concept_dir.join(mapping_file))?;
        Ok(Self::new(table, mapping))
    }

    pub fn dim(&self) -> usize {
        self.table.dim()
    }

    /// Keyword -> concept vector, if both lookups succeed.
    pub fn resolve(&self, word: &str) -> Option<&[f64]> {
        let concept_id = self.mapping.concept_of(word)?;
        self.table.get(concept_id)
    }

    /// Mean of the concept vectors of every resolvable keyword, or `None`
    /// when nothing resolves. Repeated keywords count once per occurrence.
    pub fn label_vector<'a, I>(&self, keywords: I) -> Option<Vec<f64>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let resolved: Vec<&[f64]> = keywords
            .into_iter()
            .filter_map(|word| {
                let v = self.resolve(word);
                if v.is_none() {
                    debug!(word, "Keyword has no concept vector, skipping");
                }
                v
            })
            .collect();
        vector::mean(&resolved)
    }

    /// Like `label_vector`, but an unresolvable keyword set yields the zero
    /// vector of the table's dimension.
    pub fn query_vector<'a, I>(&self, keywords: I) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.label_vector(keywords)
            .unwrap_or_else(|| vec![0.0; self.dim()])
    }
}
