use crate::provider::DynLanguageModel;
use crate::types::{AudioOptions, Modality, ReasoningOptions, ResponseFormat};

use super::instruction::Instruction;
use super::tool::DynAgentTool;
use super::toolkit::DynToolkit;

const DEFAULT_MAX_TURNS: u32 = 10;

/// A stateless agent blueprint (§4.6): a model, its instructions, its
/// static tools and toolkit factories, and the sampling parameters used for
/// every model call a Run makes.
///
/// Safe to share across concurrent Runs; a Run owns its own mutable
/// per-run state (§5, Shared-resource policy).
#[derive(Clone)]
pub struct Agent<C> {
    pub name: String,
    pub model: DynLanguageModel,
    pub instructions: Vec<Instruction<C>>,
    pub tools: Vec<DynAgentTool<C>>,
    pub toolkits: Vec<DynToolkit<C>>,
    pub response_format: Option<ResponseFormat>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub max_tokens: Option<u32>,
    pub seed: Option<i64>,
    pub modalities: Vec<Modality>,
    pub audio: Option<AudioOptions>,
    pub reasoning: Option<ReasoningOptions>,
    /// Maximum number of model calls a Run may make before signalling
    /// `MaxTurnsExceeded` (§4.6 step 8). Defaults to 10.
    pub max_turns: u32,
}

impl<C> Agent<C> {
    pub fn new(name: impl Into<String>, model: DynLanguageModel) -> Self {
        Self {
            name: name.into(),
            model,
            instructions: Vec::new(),
            tools: Vec::new(),
            toolkits: Vec::new(),
            response_format: None,
            temperature: None,
            top_p: None,
            top_k: None,
            presence_penalty: None,
            frequency_penalty: None,
            max_tokens: None,
            seed: None,
            modalities: Vec::new(),
            audio: None,
            reasoning: None,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_instructions(mut self, instructions: Vec<Instruction<C>>) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn with_tools(mut self, tools: Vec<DynAgentTool<C>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_toolkits(mut self, toolkits: Vec<DynToolkit<C>>) -> Self {
        self.toolkits = toolkits;
        self
    }

    pub fn with_response_format(mut self, response_format: ResponseFormat) -> Self {
        self.response_format = Some(response_format);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.modalities = modalities;
        self
    }

    pub fn with_audio(mut self, audio: AudioOptions) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_reasoning(mut self, reasoning: ReasoningOptions) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LanguageModelError;
    use crate::types::{LanguageModelInput, LanguageModelMetadata, ModelResponse};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubModel;

    #[async_trait]
    impl crate::provider::LanguageModel for StubModel {
        fn provider(&self) -> &'static str {
            "stub"
        }
        fn model_id(&self) -> &str {
            "stub-model"
        }
        fn metadata(&self) -> LanguageModelMetadata {
            LanguageModelMetadata::default()
        }
        async fn generate(&self, _input: LanguageModelInput) -> Result<ModelResponse, LanguageModelError> {
            unimplemented!()
        }
        async fn stream(&self, _input: LanguageModelInput) -> Result<crate::provider::ChatStream, LanguageModelError> {
            unimplemented!()
        }
    }

    #[test]
    fn new_agent_defaults_max_turns_to_ten() {
        let agent: Agent<()> = Agent::new("assistant", Arc::new(StubModel));
        assert_eq!(agent.max_turns, 10);
        assert!(agent.instructions.is_empty());
    }

    #[test]
    fn builder_methods_set_fields() {
        let agent: Agent<()> = Agent::new("assistant", Arc::new(StubModel))
            .with_max_turns(3)
            .with_temperature(0.2)
            .with_instructions(vec![Instruction::text("be terse")]);
        assert_eq!(agent.max_turns, 3);
        assert_eq!(agent.temperature, Some(0.2));
        assert_eq!(agent.instructions.len(), 1);
    }
}
