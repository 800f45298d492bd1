// Model download helper for the sentence embedding model.
//
// EmbedRank needs a multilingual sentence transformer
// (paraphrase-multilingual-MiniLM-L12-v2, ~470MB) exported to ONNX. Files
// are stored in a platform-appropriate directory
// (~/.local/share/coldprop/models/ on Linux) so they persist across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// HuggingFace repo for the sentence embedding model.
const SENTENCE_HF_URL: &str =
    "https://huggingface.co/sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2/resolve/main";

/// Remote paths of the sentence embedding model files.
const SENTENCE_MODEL_FILE: &str = "onnx/model.onnx";
const SENTENCE_TOKENIZER_FILE: &str = "tokenizer.json";

/// Returns the default directory for storing model files.
/// Uses the platform data directory: ~/.local/share/coldprop/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coldprop")
        .join("models")
}

/// Subdirectory within model_dir for the sentence embedding model.
pub fn sentence_model_dir(base: &Path) -> PathBuf {
    base.join("paraphrase-multilingual-MiniLM-L12-v2")
}

/// Check whether both required sentence model files exist.
pub fn sentence_files_present(dir: &Path) -> bool {
    let model_dir = sentence_model_dir(dir);
    model_dir.join("model.onnx").exists() && model_dir.join("tokenizer.json").exists()
}

/// Download the sentence embedding model into `dir`.
///
/// Shows a progress bar for the model file. Skips files that already exist.
pub async fn download_model(dir: &Path) -> Result<()> {
    let model_dir = sentence_model_dir(dir);
    std::fs::create_dir_all(&model_dir)
        .with_context(|| format!("Failed to create model directory: {}", model_dir.display()))?;

    println!("\nSentence embedding model (paraphrase-multilingual-MiniLM-L12-v2):");

    let tokenizer_path = model_dir.join("tokenizer.json");
    if tokenizer_path.exists() {
        info!("Sentence tokenizer already exists, skipping");
        println!("  tokenizer.json (already exists)");
    } else {
        println!("  Downloading tokenizer.json...");
        download_file(
            &format!("{}/{}", SENTENCE_HF_URL, SENTENCE_TOKENIZER_FILE),
            &tokenizer_path,
            false,
        )
        .await?;
    }

    let model_path = model_dir.join("model.onnx");
    if model_path.exists() {
        info!("Sentence model already exists, skipping");
        println!("  model.onnx (already exists)");
    } else {
        println!("  Downloading model.onnx (~470 MB)...");
        download_file(
            &format!("{}/{}", SENTENCE_HF_URL, SENTENCE_MODEL_FILE),
            &model_path,
            true,
        )
        .await?;
    }

    Ok(())
}

/// Byte progress bar when the size is known, byte-counting spinner otherwise.
fn progress_bar(content_length: Option<u64>) -> ProgressBar {
    let (pb, template) = match content_length {
        Some(size) => (
            ProgressBar::new(size),
            "    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ),
        None => (ProgressBar::new_spinner(), "    {spinner} {bytes}"),
    };
    let style = ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = show_progress.then(|| progress_bar(response.content_length()));

    let mut bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        bytes.extend_from_slice(&chunk);
        if let Some(ref pb) = pb {
            pb.set_position(bytes.len() as u64);
        }
    }

    std::fs::write(dest, &bytes).with_context(|| format!("Failed to write {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}
