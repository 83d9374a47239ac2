use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

/// Sends one prompt to the configured model and returns the raw text reply.
///
/// Timeouts and retries are applied by the caller through
/// [`CallContext`](crate::retry::CallContext); this function makes exactly one request.
pub async fn generate_llm_response(
    system: &str,
    prompt: &str,
    params: &LLMParams,
) -> Result<String, GenerationError> {
    debug!(target: TARGET_LLM_REQUEST, "Sending LLM request to {} with prompt: {}", params.model, prompt);

    let response_text = match &params.llm_client {
        LLMClient::Ollama(ollama) => {
            let request = GenerationRequest::new(params.model.clone(), prompt.to_string())
                .system(system.to_string())
                .options(GenerationOptions::default().temperature(params.temperature));

            ollama
                .generate(request)
                .await
                .map_err(|e| GenerationError::Request(e.to_string()))?
                .response
        }
        LLMClient::OpenAI(client) => {
            let request = CreateChatCompletionRequestArgs::default()
                .model(params.model.clone())
                .temperature(params.temperature)
                .messages(vec![
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(system.to_string())
                        .build()
                        .map_err(|e| GenerationError::Request(e.to_string()))?
                        .into(),
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(prompt.to_string())
                        .build()
                        .map_err(|e| GenerationError::Request(e.to_string()))?
                        .into(),
                ])
                .build()
                .map_err(|e| GenerationError::Request(e.to_string()))?;

            client
                .chat()
                .create(request)
                .await
                .map_err(|e| GenerationError::Request(e.to_string()))?
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default()
        }
    };

    let trimmed = response_text.trim();
    if trimmed.is_empty() {
        warn!(target: TARGET_LLM_REQUEST, "Model {} returned an empty response", params.model);
        return Err(GenerationError::Empty);
    }

    debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", trimmed);
    Ok(trimmed.to_string())
}
