use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use coldprop::concepts::ConceptSpace;
use coldprop::config::Config;
use coldprop::data;
use coldprop::embedding::mapping::{EmbeddingMapper, OnnxMapper};
use coldprop::keywords::segment::Segmenter;
use coldprop::keywords::tfidf::TagExtractor;
use coldprop::keywords::{KeywordSources, KeywordStrategy, ModelAssets};
use coldprop::output::{self, terminal};
use coldprop::pipeline::concept::{self, Emit, PropagationSource};
use coldprop::pipeline::vsm::{self, VsmMode};

/// coldprop: cold-start item embedding propagation.
///
/// Estimates embeddings for items with no interaction history from the
/// trained embeddings of similar known items.
#[derive(Parser)]
#[command(name = "coldprop", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propagate embeddings to unseen items through the keyword concept space
    Concept {
        /// The unseen events file (id,title,description per line)
        unseen_event_file: PathBuf,

        /// The trained embedding JSON file
        embedding_file: PathBuf,

        /// The items' keyword corpus (JSON)
        corpus_file: PathBuf,

        /// Folder with concept embeddings, mappings and optional models
        concept_folder: PathBuf,

        /// How description keywords are extracted
        #[arg(long, value_enum, default_value_t = KeywordStrategy::TextRank)]
        strategy: KeywordStrategy,

        /// Which embeddings are propagated from the neighbors
        #[arg(long, value_enum, default_value_t = PropagationSource::Trained)]
        source: PropagationSource,

        /// What is written for each unseen item
        #[arg(long, value_enum, default_value_t = Emit::Propagated)]
        emit: Emit,

        /// Neighbors retrieved per unseen item (default: 10)
        #[arg(long, default_value = "10")]
        neighbors: usize,

        /// Epsilon of the 1 / (epsilon + distance) weight
        #[arg(long, default_value = "0.00001")]
        epsilon: f64,

        /// Input tensor name of the mapping model
        #[arg(long, default_value = "input")]
        mapping_input: String,

        /// Also write the label index as JSON for inspection
        #[arg(long)]
        save_index: Option<PathBuf>,

        /// The output name of the generated embedding file
        #[arg(long, default_value = "rep.txt")]
        output: PathBuf,
    },

    /// Propagate embeddings through a TF-IDF index of the corpus
    Vsm {
        /// The unseen events file (id,title,description per line)
        unseen_event_file: PathBuf,

        /// The trained embedding JSON file
        embedding_file: PathBuf,

        /// The items' keyword corpus (JSON)
        corpus_file: PathBuf,

        /// Propagate trained embeddings, or emit raw TF-IDF vectors
        #[arg(long, value_enum, default_value_t = VsmMode::Propagate)]
        mode: VsmMode,

        /// Neighbors retrieved per unseen item (default: 10)
        #[arg(long, default_value = "10")]
        neighbors: usize,

        /// Epsilon of the 1 / (epsilon + distance) weight
        #[arg(long, default_value = "0.00001")]
        epsilon: f64,

        /// Save the fitted IDF model (usable as vsm_model.json / tfidf_model.json)
        #[arg(long)]
        save_model: Option<PathBuf>,

        /// The output name of the generated embedding file
        #[arg(long, default_value = "rep.txt")]
        output: PathBuf,
    },

    /// Convert user item lists into user-item edge lines
    Export {
        /// Path of the file to convert
        file: PathBuf,

        /// Output path of the converted file
        #[arg(short, long, default_value = "../data/proNet_input.data")]
        output: PathBuf,
    },

    /// Download the multilingual sentence embedding model used by EmbedRank
    DownloadModel,
}

fn build_segmenter(config: &Config) -> Result<Segmenter> {
    match &config.jieba_dict {
        Some(path) => Segmenter::with_dict(path),
        None => Segmenter::new(),
    }
}

fn load_mapper(concept_folder: &Path, input_name: &str) -> Option<OnnxMapper> {
    match OnnxMapper::load(concept_folder, input_name) {
        Ok(mapper) => Some(mapper),
        Err(e) => {
            warn!("{e:#}");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("coldprop=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Concept {
            unseen_event_file,
            embedding_file,
            corpus_file,
            concept_folder,
            strategy,
            source,
            emit,
            neighbors,
            epsilon,
            mapping_input,
            save_index,
            output,
        } => {
            let config = Config::load()?;
            let options = config.run_options(neighbors, epsilon)?;
            let segmenter = Arc::new(build_segmenter(&config)?);

            let space = ConceptSpace::load(&concept_folder, strategy.mapping_file())?;
            let corpus = data::load_corpus(&corpus_file)?;
            let index = concept::build_label_index(&corpus, &space, &options)?;
            if let Some(path) = &save_index {
                index.forest.save(path)?;
                info!("Saved label index to {}", path.display());
            }

            let assets = ModelAssets {
                concept_dir: concept_folder.clone(),
                model_dir: config.model_dir.clone(),
                corpus: Some(&corpus),
            };
            let sources = KeywordSources::for_strategy(strategy, segmenter, &assets)?;

            let items = data::load_unseen(&unseen_event_file)?;
            let trained = data::load_trained(&embedding_file)?;

            let mapper = match source {
                PropagationSource::Mapped => load_mapper(&concept_folder, &mapping_input),
                _ => None,
            };
            let table = concept::source_table(
                source,
                trained,
                &index,
                mapper.as_ref().map(|m| m as &dyn EmbeddingMapper),
            )?;

            let (entries, summary) =
                concept::run(&items, &sources, &space, &index, &table, emit, &options)?;
            output::write_embeddings(&output, &entries)?;
            terminal::display_summary(
                "Concept propagation",
                &summary,
                &output.display().to_string(),
            );
        }

        Commands::Vsm {
            unseen_event_file,
            embedding_file,
            corpus_file,
            mode,
            neighbors,
            epsilon,
            save_model,
            output,
        } => {
            let config = Config::load()?;
            let options = config.run_options(neighbors, epsilon)?;
            let segmenter = Arc::new(build_segmenter(&config)?);

            let corpus = data::load_corpus(&corpus_file)?;
            let index = vsm::build_content_index(&corpus, &options)?;
            if let Some(path) = &save_model {
                index.model.save(path)?;
                info!("Saved IDF model to {}", path.display());
            }

            let items = data::load_unseen(&unseen_event_file)?;
            let trained = match mode {
                VsmMode::Propagate => data::load_trained(&embedding_file)?,
                VsmMode::TfIdf => data::EmbeddingTable::new(),
            };

            let tags = TagExtractor::new(segmenter);
            let (entries, summary) = vsm::run(&items, &tags, &index, &trained, mode, &options)?;
            output::write_embeddings(&output, &entries)?;
            terminal::display_summary("VSM propagation", &summary, &output.display().to_string());
        }

        Commands::Export { file, output } => {
            let edges = coldprop::export::export_pronet(&file, &output)?;
            println!("Wrote {edges} edges to {}", output.display());
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            println!(
                "Downloading sentence embedding model to: {}",
                config.model_dir.display()
            );
            coldprop::models::download::download_model(&config.model_dir).await?;
            println!("\n{}", "Model downloaded successfully.".green().bold());
            println!("EmbedRank keyword extraction is now available (--strategy embedrank).");
        }
    }

    Ok(())
}
