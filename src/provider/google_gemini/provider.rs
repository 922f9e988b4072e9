use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::{Credential, ModelConfig};
use crate::error::LanguageModelError;
use crate::http::{
    DynHttpTransport, HttpResponse, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::{ChatStream, LanguageModel};
use crate::types::{LanguageModelInput, LanguageModelMetadata, ModelResponse};

use super::error::parse_gemini_error;
use super::request::build_gemini_body;
use super::response::map_response;
use super::stream::decode_stream;
use super::types::GeminiGenerateContentResponse;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const PROVIDER: &str = "google_gemini";

/// Adapter for the Google Gemini `generateContent`/`streamGenerateContent` API.
pub struct GoogleGeminiProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    model: String,
    metadata: LanguageModelMetadata,
}

impl GoogleGeminiProvider {
    /// Creates a provider targeting the default Generative Language endpoint.
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            metadata: LanguageModelMetadata::default(),
        }
    }

    /// Overrides the base URL, useful for proxies or Vertex AI compatibility layers.
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
                    "google_gemini does not support service-account credentials".to_string(),
                ));
            }
            Credential::None => {
                return Err(LanguageModelError::InvalidInput(
                    "google_gemini requires a credential".to_string(),
                ));
            }
        };

        let model = config.default_model.clone().ok_or_else(|| {
            LanguageModelError::InvalidInput(
                "google_gemini requires default_model in ModelConfig".to_string(),
            )
        })?;

        let mut provider = Self::new(transport, api_key, model);

        if let Some(base_url) = &config.base_url {
            provider = provider.with_base_url(base_url.clone());
        }

        Ok(provider)
    }

    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let model_path = self.model_path();
        if base.ends_with("/v1beta") {
            format!("{base}/{model_path}:generateContent")
        } else {
            format!("{base}/v1beta/{model_path}:generateContent")
        }
    }

    fn stream_endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let model_path = self.model_path();
        if base.ends_with("/v1beta") {
            format!("{base}/{model_path}:streamGenerateContent?alt=sse")
        } else {
            format!("{base}/v1beta/{model_path}:streamGenerateContent?alt=sse")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("x-goog-api-key".to_string(), self.api_key.clone());
        headers
    }

    fn ensure_success(&self, response: HttpResponse) -> Result<String, LanguageModelError> {
        let status = response.status;
        let text = response.into_string()?;
        if (200..300).contains(&status) {
            Ok(text)
        } else {
            Err(parse_gemini_error(status, &text))
        }
    }
}

#[async_trait]
impl LanguageModel for GoogleGeminiProvider {
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
        let body = build_gemini_body(&input, &self.model)?;
        let headers = self.build_headers();
        let response =
            post_json_with_headers(self.transport.as_ref(), self.endpoint(), headers, &body).await?;
        let text = self.ensure_success(response)?;
        let parsed: GeminiGenerateContentResponse = serde_json::from_str(&text).map_err(|err| {
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
        let body = build_gemini_body(&input, &self.model)?;
        let headers = self.build_headers();
        let response =
            post_json_stream_with_headers(self.transport.as_ref(), self.stream_endpoint(), headers, &body)
                .await?;

        if !(200..300).contains(&response.status) {
            let bytes = collect_body(response.body).await?;
            let text = String::from_utf8(bytes)
                .map_err(|err| LanguageModelError::transport(err.to_string()))?;
            return Err(parse_gemini_error(response.status, &text));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    #[test]
    fn endpoint_adds_v1beta_and_models_prefix() {
        let provider = GoogleGeminiProvider::new(
            crate::http::reqwest::default_dyn_transport().unwrap(),
            "key",
            "gemini-2.0-flash",
        );
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn model_already_prefixed_is_not_duplicated() {
        let provider = GoogleGeminiProvider::new(
            crate::http::reqwest::default_dyn_transport().unwrap(),
            "key",
            "models/gemini-2.0-flash",
        );
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn stream_endpoint_requests_sse() {
        let provider = GoogleGeminiProvider::new(
            crate::http::reqwest::default_dyn_transport().unwrap(),
            "key",
            "gemini-2.0-flash",
        );
        assert!(provider.stream_endpoint().ends_with(":streamGenerateContent?alt=sse"));
    }

    #[test]
    fn from_model_config_rejects_missing_default_model() {
        let config = ModelConfig {
            handle: "default".to_string(),
            provider: ProviderKind::GoogleGemini,
            credential: Credential::ApiKey {
                header: None,
                key: "key".to_string(),
            },
            default_model: None,
            base_url: None,
            extra: Default::default(),
        };
        let err = GoogleGeminiProvider::from_model_config(
            &config,
            crate::http::reqwest::default_dyn_transport().unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, LanguageModelError::InvalidInput(_)));
    }
}
