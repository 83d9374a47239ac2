// Sentence embedding configuration
pub const TARGET_VECTOR: &str = "article-embeddings";
pub const MODEL_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/model.safetensors";
pub const TOKENIZER_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json";

pub mod config;
pub mod embedding;
pub mod similarity;

// Re-export main components
pub use config::*;
pub use embedding::*;
pub use similarity::*;
