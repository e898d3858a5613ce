//! Optional dense text embeddings
//!
//! When enabled, a fixed-width embedding of the review is appended to the
//! feature vector. Models fit with the embedding must always be served with
//! one of the same width, and vice versa.

use reviewguard_core::{Error, Result};

/// Hidden width of a bert-base encoder
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Source of fixed-width dense text embeddings
pub trait EmbeddingProvider: Send + Sync {
    /// Width of every embedding this provider returns
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embed and enforce the provider's declared width
pub fn embed_checked(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let embedding = provider.embed(text)?;
    if embedding.len() != provider.dimension() {
        return Err(Error::dimension_mismatch(provider.dimension(), embedding.len()));
    }
    Ok(embedding)
}

#[cfg(feature = "bert-embeddings")]
pub use bert::BertEmbedder;

#[cfg(feature = "bert-embeddings")]
mod bert {
    use super::EmbeddingProvider;
    use crate::config::EmbeddingSpec;
    use candle_core::{Device, Tensor};
    use candle_nn::VarBuilder;
    use candle_transformers::models::bert::{BertModel, Config as BertConfig};
    use reviewguard_core::{Error, Result};
    use std::path::{Path, PathBuf};
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    const MODEL_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];

    /// BERT encoder pooled at the [CLS] token
    pub struct BertEmbedder {
        tokenizer: Tokenizer,
        model: BertModel,
        device: Device,
        hidden_size: usize,
        max_length: usize,
    }

    impl BertEmbedder {
        /// Load from a local directory or the HuggingFace Hub
        pub fn from_spec(spec: &EmbeddingSpec) -> Result<Self> {
            let model_dir = match (&spec.path, &spec.repo_id) {
                (Some(path), _) => {
                    if !path.exists() {
                        return Err(Error::config(format!(
                            "Embedding model path does not exist: {}",
                            path.display()
                        )));
                    }
                    path.clone()
                }
                (None, Some(repo_id)) => download(repo_id, &spec.revision)?,
                (None, None) => {
                    return Err(Error::config("embedding needs either a path or a repo_id"))
                }
            };
            Self::from_dir(&model_dir, spec.max_length)
        }

        pub fn from_dir(model_dir: &Path, max_length: usize) -> Result<Self> {
            let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
                .map_err(|e| Error::config(format!("Failed to load tokenizer: {}", e)))?;

            let raw_config = std::fs::read_to_string(model_dir.join("config.json"))?;
            let bert_config: BertConfig = serde_json::from_str(&raw_config)?;
            let hidden_size = serde_json::from_str::<serde_json::Value>(&raw_config)?
                .get("hidden_size")
                .and_then(serde_json::Value::as_u64)
                .ok_or_else(|| Error::config("config.json has no hidden_size"))?
                as usize;

            let device = Device::Cpu;
            let weights_path = model_dir.join("model.safetensors");
            // SAFETY: the weights file is memory-mapped read-only and not
            // modified while the model is alive.
            let vb = unsafe {
                VarBuilder::from_mmaped_safetensors(
                    &[weights_path],
                    candle_core::DType::F32,
                    &device,
                )
                .map_err(|e| Error::config(format!("Failed to load weights: {}", e)))?
            };
            let model = BertModel::load(vb, &bert_config)
                .map_err(|e| Error::config(format!("Failed to load BERT model: {}", e)))?;

            info!(
                model_dir = %model_dir.display(),
                hidden_size,
                "Loaded BERT embedding model"
            );

            Ok(Self {
                tokenizer,
                model,
                device,
                hidden_size,
                max_length,
            })
        }

        fn forward(&self, text: &str) -> candle_core::Result<Vec<f32>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| candle_core::Error::Msg(format!("Tokenization failed: {}", e)))?;

            let len = encoding.get_ids().len().min(self.max_length);
            let input_ids = Tensor::new(&encoding.get_ids()[..len], &self.device)?.unsqueeze(0)?;
            let token_type_ids =
                Tensor::new(&encoding.get_type_ids()[..len], &self.device)?.unsqueeze(0)?;

            let output = self.model.forward(&input_ids, &token_type_ids, None)?;
            // [batch, seq, hidden] -> [CLS] of the only batch entry
            output.get(0)?.get(0)?.to_vec1::<f32>()
        }
    }

    impl EmbeddingProvider for BertEmbedder {
        fn dimension(&self) -> usize {
            self.hidden_size
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.forward(text)
                .map_err(|e| Error::internal(format!("BERT embedding failed: {}", e)))
        }
    }

    fn download(repo_id: &str, revision: &str) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reviewguard/models");

        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_cache_dir(cache_dir)
            .build()
            .map_err(|e| Error::config(format!("Failed to initialize HuggingFace API: {}", e)))?;
        let repo = api.repo(hf_hub::Repo::with_revision(
            repo_id.to_string(),
            hf_hub::RepoType::Model,
            revision.to_string(),
        ));

        let mut model_dir = None;
        for file in MODEL_FILES {
            debug!(repo_id, file, "Fetching embedding model file");
            let path = repo
                .get(file)
                .map_err(|e| Error::config(format!("Failed to download {}: {}", file, e)))?;
            model_dir = path.parent().map(Path::to_path_buf);
        }

        model_dir.ok_or_else(|| Error::internal("Invalid model cache path"))
    }
}
