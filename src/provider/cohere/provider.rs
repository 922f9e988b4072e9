use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::{Credential, ModelConfig};
use crate::error::LanguageModelError;
use crate::http::{
    DynHttpTransport, HttpResponse, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::{ChatStream, LanguageModel};
use crate::types::{LanguageModelInput, LanguageModelMetadata, ModelResponse};

use super::error::parse_cohere_error;
use super::request::build_request_body;
use super::response::map_response;
use super::stream::decode_stream;
use super::types::CohereChatResponse;

const DEFAULT_BASE_URL: &str = "https://api.cohere.com";
const PROVIDER: &str = "cohere";

/// Adapter for the Cohere Chat API (`/v2/chat`).
pub struct CohereProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    model: String,
    metadata: LanguageModelMetadata,
}

impl CohereProvider {
    /// Creates a provider with the default `api.cohere.com` base URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_bridge::provider::cohere::CohereProvider;
    /// use llm_bridge::provider::LanguageModel;
    /// use llm_bridge::http::reqwest::default_dyn_transport;
    /// let transport = default_dyn_transport().expect("transport");
    /// let provider = CohereProvider::new(transport, "test-key", "command-r-plus");
    /// assert_eq!(provider.provider(), "cohere");
    /// ```
    pub fn new(
        transport: DynHttpTransport,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            metadata: LanguageModelMetadata::default(),
        }
    }

    /// Overrides the base URL, useful for proxies or compatibility layers.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Attaches capability/pricing metadata reported by [`LanguageModel::metadata`].
    pub fn with_metadata(mut self, metadata: LanguageModelMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Constructs a provider from a [`ModelConfig`].
    ///
    /// # Errors
    /// Returns [`LanguageModelError::InvalidInput`] when the credential kind
    /// is not supported by this provider, or no model id is configured.
    pub fn from_model_config(
        config: &ModelConfig,
        transport: DynHttpTransport,
    ) -> Result<Self, LanguageModelError> {
        let api_key = match &config.credential {
            Credential::ApiKey { key, .. } => key.clone(),
            Credential::Bearer { token } => token.clone(),
            Credential::ServiceAccount { .. } => {
                return Err(LanguageModelError::InvalidInput(
                    "cohere does not support service-account credentials".to_string(),
                ));
            }
            Credential::None => {
                return Err(LanguageModelError::InvalidInput(
                    "cohere requires a credential".to_string(),
                ));
            }
        };

        let model = config.default_model.clone().ok_or_else(|| {
            LanguageModelError::InvalidInput(
                "cohere requires default_model in ModelConfig".to_string(),
            )
        })?;

        let mut provider = Self::new(transport, api_key, model);
        if let Some(base_url) = &config.base_url {
            provider = provider.with_base_url(base_url.clone());
        }
        Ok(provider)
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v2") {
            format!("{base}/chat")
        } else {
            format!("{base}/v2/chat")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {}", self.api_key));
        headers
    }

    fn ensure_success(&self, response: HttpResponse) -> Result<String, LanguageModelError> {
        let status = response.status;
        let text = response.into_string()?;
        if (200..300).contains(&status) {
            Ok(text)
        } else {
            Err(parse_cohere_error(status, &text))
        }
    }
}

#[async_trait]
impl LanguageModel for CohereProvider {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn metadata(&self) -> LanguageModelMetadata {
        self.metadata.clone()
    }

    async fn generate(&self, input: LanguageModelInput) -> Result<ModelResponse, LanguageModelError> {
        crate::provider::require_non_empty_messages(PROVIDER, &input)?;
        let body = build_request_body(&input, &self.model, false)?;
        let headers = self.build_headers();
        let response =
            post_json_with_headers(self.transport.as_ref(), self.endpoint(), headers, &body).await?;
        let text = self.ensure_success(response)?;
        let parsed: CohereChatResponse = serde_json::from_str(&text).map_err(|err| {
            LanguageModelError::invariant(PROVIDER, format!("failed to parse response: {err}"))
        })?;

        let mut mapped = map_response(parsed)?;
        if let (Some(usage), Some(pricing)) = (&mapped.usage, &self.metadata.pricing) {
            mapped.cost = Some(usage.calculate_cost(pricing));
        }
        Ok(mapped)
    }

    async fn stream(&self, input: LanguageModelInput) -> Result<ChatStream, LanguageModelError> {
        crate::provider::require_non_empty_messages(PROVIDER, &input)?;
        let body = build_request_body(&input, &self.model, true)?;
        let headers = self.build_headers();
        let response =
            post_json_stream_with_headers(self.transport.as_ref(), self.endpoint(), headers, &body)
                .await?;

        if !(200..300).contains(&response.status) {
            let bytes = collect_body(response.body).await?;
            let text = String::from_utf8(bytes)
                .map_err(|err| LanguageModelError::transport(err.to_string()))?;
            return Err(parse_cohere_error(response.status, &text));
        }

        Ok(Box::pin(decode_stream(response.body)))
    }
}

async fn collect_body(body: crate::http::HttpBodyStream) -> Result<Vec<u8>, LanguageModelError> {
    use futures_util::StreamExt;
    let chunks: Vec<Result<Vec<u8>, LanguageModelError>> = body.collect().await;
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend(chunk?);
    }
    Ok(out)
}
