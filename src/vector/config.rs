use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{
    BertModel, Config as BertConfig, HiddenAct, PositionEmbeddingType,
};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tokio::fs;
use tracing::{error, info};

use crate::error::EmbeddingError;
use crate::vector::{MODEL_URL, TARGET_VECTOR, TOKENIZER_URL};

/// Configuration for the MiniLM sentence embedding model
#[derive(Debug, Clone)]
pub struct MiniLmConfig {
    pub model_dir: PathBuf,
    pub dimensions: usize,
    pub max_length: usize,
    pub device: Device,
}

impl Default for MiniLmConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            dimensions: 384,
            max_length: 256,
            device: Device::Cpu,
        }
    }
}

impl MiniLmConfig {
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join("all-MiniLM-L6-v2.safetensors")
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir.join("all-MiniLM-L6-v2-tokenizer.json")
    }

    /// Downloads the weights and tokenizer unless they are already on disk.
    pub async fn ensure_models_exist(&self) -> Result<(), EmbeddingError> {
        if !self.model_dir.exists() {
            fs::create_dir_all(&self.model_dir)
                .await
                .map_err(|e| EmbeddingError::Model(format!("cannot create model dir: {}", e)))?;
        }

        download_if_missing(MODEL_URL, &self.model_path()).await?;
        download_if_missing(TOKENIZER_URL, &self.tokenizer_path()).await?;
        Ok(())
    }

    fn bert_config(&self) -> BertConfig {
        BertConfig {
            hidden_size: self.dimensions,
            intermediate_size: 1536,
            max_position_embeddings: 512,
            num_attention_heads: 12,
            num_hidden_layers: 6,
            vocab_size: 30522,
            layer_norm_eps: 1e-12,
            pad_token_id: 0,
            hidden_act: HiddenAct::Gelu,
            hidden_dropout_prob: 0.0,
            type_vocab_size: 2,
            initializer_range: 0.02,
            position_embedding_type: PositionEmbeddingType::Absolute,
            use_cache: false,
            classifier_dropout: None,
            model_type: None,
        }
    }

    /// Load the BERT weights. Blocking; call from a blocking thread.
    pub fn load_model(&self) -> Result<BertModel, EmbeddingError> {
        let model_path = self.model_path();
        info!(target: TARGET_VECTOR, "Starting to load MiniLM model from {}", model_path.display());

        let buffer = std::fs::read(&model_path)
            .map_err(|e| EmbeddingError::Model(format!("cannot read model weights: {}", e)))?;
        let tensors = candle_core::safetensors::load_buffer(&buffer, &self.device).map_err(|e| {
            error!(target: TARGET_VECTOR, "!!! Failed to load model tensors: {}", e);
            EmbeddingError::Model(format!("failed to load model tensors: {}", e))
        })?;

        let vb = VarBuilder::from_tensors(tensors, DType::F32, &self.device);
        let model = BertModel::load(vb, &self.bert_config()).map_err(|e| {
            error!(target: TARGET_VECTOR, "!!! Failed to load BERT model: {}", e);
            EmbeddingError::Model(format!("failed to load BERT model: {}", e))
        })?;

        info!(target: TARGET_VECTOR, "Successfully loaded MiniLM model");
        Ok(model)
    }

    pub fn load_tokenizer(&self) -> Result<Tokenizer, EmbeddingError> {
        let tokenizer_path = self.tokenizer_path();
        info!(target: TARGET_VECTOR, "Starting to load tokenizer from {}", tokenizer_path.display());

        Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            error!(target: TARGET_VECTOR, "!!! Failed to load tokenizer: {}", e);
            EmbeddingError::Model(format!("failed to load tokenizer: {}", e))
        })
    }
}

async fn download_if_missing(url: &str, path: &Path) -> Result<(), EmbeddingError> {
    if path.exists() {
        return Ok(());
    }

    info!(target: TARGET_VECTOR, "Downloading {} to {}", url, path.display());
    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| EmbeddingError::Model(format!("download of {} failed: {}", url, e)))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| EmbeddingError::Model(format!("download of {} failed: {}", url, e)))?;
    fs::write(path, bytes)
        .await
        .map_err(|e| EmbeddingError::Model(format!("cannot write {}: {}", path.display(), e)))?;
    info!(target: TARGET_VECTOR, "Downloaded {}", path.display());
    Ok(())
}
