use async_trait::async_trait;
use candle_core::{DType, Tensor};
use candle_transformers::models::bert::BertModel;
use std::sync::Arc;
use tokenizers::Tokenizer;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::EmbeddingError;
use crate::vector::{config::MiniLmConfig, TARGET_VECTOR};

/// Computes a fixed-length vector for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Local `all-MiniLM-L6-v2` sentence embedder running on candle.
#[derive(Clone)]
pub struct MiniLmEmbedder {
    model: Arc<BertModel>,
    tokenizer: Arc<Tokenizer>,
    config: Arc<MiniLmConfig>,
}

impl MiniLmEmbedder {
    /// Downloads the model if needed and loads it into memory.
    pub async fn load(config: MiniLmConfig) -> Result<Self, EmbeddingError> {
        let init_start = Instant::now();
        config.ensure_models_exist().await?;

        let config = Arc::new(config);
        let loader = Arc::clone(&config);
        let (model, tokenizer) =
            tokio::task::spawn_blocking(move || -> Result<_, EmbeddingError> {
                Ok((loader.load_model()?, loader.load_tokenizer()?))
            })
            .await
            .map_err(|e| EmbeddingError::Model(format!("model loader panicked: {}", e)))??;

        info!(target: TARGET_VECTOR, "Embedding model ready in {:?}", init_start.elapsed());

        Ok(Self {
            model: Arc::new(model),
            tokenizer: Arc::new(tokenizer),
            config,
        })
    }
}

#[async_trait]
impl Embedder for MiniLmEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let this = self.clone();
        let text = text.to_string();
        let embedding = tokio::task::spawn_blocking(move || this.embed_blocking(&text))
            .await
            .map_err(|e| EmbeddingError::Model(format!("embedding task panicked: {}", e)))??;

        if embedding.len() != self.config.dimensions {
            return Err(EmbeddingError::Dimension {
                expected: self.config.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }
}

impl MiniLmEmbedder {
    fn embed_blocking(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let start_time = Instant::now();
        let device = &self.config.device;

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Model(format!("tokenization failed: {}", e)))?;

        let max_len = self.config.max_length;
        let input_ids: Vec<u32> = encoding.get_ids().iter().take(max_len).copied().collect();
        let attention_mask: Vec<u32> = encoding
            .get_attention_mask()
            .iter()
            .take(max_len)
            .copied()
            .collect();
        let token_count = input_ids.len();

        let vector = mean_pooled_embedding(&self.model, input_ids, attention_mask, device)
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;

        debug!(target: TARGET_VECTOR,
            "Embedding generated: {} tokens -> {} dimensions in {:?}",
            token_count,
            vector.len(),
            start_time.elapsed()
        );

        Ok(vector)
    }
}

/// Runs the encoder and mean-pools the last hidden state over real tokens, then
/// L2-normalizes the result.
fn mean_pooled_embedding(
    model: &BertModel,
    input_ids: Vec<u32>,
    attention_mask: Vec<u32>,
    device: &candle_core::Device,
) -> candle_core::Result<Vec<f32>> {
    let input_ids = Tensor::new(input_ids, device)?.unsqueeze(0)?;
    let attention_mask = Tensor::new(attention_mask, device)?.unsqueeze(0)?;
    let token_type_ids = input_ids.zeros_like()?;

    // [1, seq, hidden]
    let hidden_state = model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

    // Zero out padding before pooling
    let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
    let summed_hidden = hidden_state.broadcast_mul(&mask)?.sum(1)?;
    let valid_token_counts = mask.sum(1)?.clamp(1.0, f32::MAX)?;
    let mean_pooled = summed_hidden.broadcast_div(&valid_token_counts)?;

    let norm = mean_pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
    let normalized = mean_pooled.broadcast_div(&norm)?;

    normalized.squeeze(0)?.to_vec1::<f32>()
}
