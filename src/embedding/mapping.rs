// Embedding-space mapping.
//
// A pre-trained regression model remaps vectors from the concept label space
// into the space of the trained item embeddings. The model is exported to
// ONNX and takes a single `[1, in_dim]` float tensor; whatever it returns is
// the mapped vector.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

/// File name of the mapping model inside the concept directory.
pub const MAPPING_MODEL_FILE: &str = "mapping.onnx";

/// Maps one vector into another vector space.
pub trait EmbeddingMapper {
    fn map(&self, vector: &[f64]) -> Result<Vec<f64>>;
}

/// ONNX-backed mapper. Runs one row per call.
pub struct OnnxMapper {
    session: RefCell<Session>,
    input_name: String,
}

impl OnnxMapper {
    /// Load `mapping.onnx` from the concept directory.
    ///
    /// The model's input is fed under `input_name`; Keras exports usually
    /// name it after the first layer, so the caller can override it.
    pub fn load(concept_dir: &Path, input_name: &str) -> Result<Self> {
        let model_path = concept_dir.join(MAPPING_MODEL_FILE);
        if !model_path.exists() {
            anyhow::bail!("Mapping model not found: {}", model_path.display());
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load mapping model from {}", model_path.display()))?;

        debug!("Loaded mapping model from {}", model_path.display());

        Ok(Self {
            session: RefCell::new(session),
            input_name: input_name.to_string(),
        })
    }
}

impl EmbeddingMapper for OnnxMapper {
    fn map(&self, vector: &[f64]) -> Result<Vec<f64>> {
        let row: Vec<f32> = vector.iter().map(|&v| v as f32).collect();
        let shape = [1_i64, row.len() as i64];
        let input = Tensor::from_array((shape, row)).context("Failed to create mapping input tensor")?;

        let mut session = self.session.borrow_mut();
        let outputs = session
            .run(ort::inputs! { self.input_name.as_str() => input })
            .context("Mapping ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract mapping output tensor")?;

        let mapped: Vec<f64> = data.iter().map(|&v| v as f64).collect();
        Ok(mapped)
    }
}

/// Apply `mapper` to every vector, keeping the keys.
pub fn transform(
    source: &HashMap<String, Vec<f64>>,
    mapper: &dyn EmbeddingMapper,
) -> Result<HashMap<String, Vec<f64>>> {
    let mut target = HashMap::with_capacity(source.len());
    for (key, vector) in source {
        let mapped = mapper
            .map(vector)
            .with_context(|| format!("Failed to map embedding for {key}"))?;
        target.insert(key.clone(), mapped);
    }
    info!(count = target.len(), "Mapped label embeddings");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl EmbeddingMapper for Doubler {
        fn map(&self, vector: &[f64]) -> Result<Vec<f64>> {
            Ok(vector.iter().map(|v| v * 2.0).chain(std::iter::once(1.0)).collect())
        }
    }

    #[test]
    fn test_transform_keeps_keys_and_uses_model_output_shape() {
        let mut source = HashMap::new();
        source.insert("7".to_string(), vec![1.0, 2.0]);
        source.insert("9".to_string(), vec![0.5, 0.0]);

        let target = transform(&source, &Doubler).unwrap();
        assert_eq!(target.len(), 2);
        assert_eq!(target["7"], vec![2.0, 4.0, 1.0]);
        assert_eq!(target["9"], vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let dir = std::env::temp_dir().join("coldprop-mapping-missing");
        assert!(OnnxMapper::load(&dir, "input").is_err());
    }
}
