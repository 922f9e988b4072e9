//! Provider-neutral data model: messages, parts, deltas, tool schemas,
//! sampling parameters, usage, pricing, and metadata.

mod message;
mod metadata;
mod request;
mod response;
mod tool;
mod usage;

pub use message::{
    AudioFormat, AudioPart, AudioPartDelta, ContentDelta, ImagePart, ImagePartDelta, Message,
    Part, PartDelta, ReasoningPart, ReasoningPartDelta, Role, SourcePart, TextPart, TextPartDelta,
    ToolCallPart, ToolCallPartDelta, ToolResultPart,
};
pub use metadata::{LanguageModelCapability, LanguageModelMetadata};
pub use request::{AudioOptions, LanguageModelInput, Modality, ReasoningOptions, ResponseFormat};
pub use response::{ModelResponse, PartialModelResponse};
pub use tool::{JsonSchema, Tool, ToolChoice};
pub use usage::{ModelTokensDetails, ModelUsage, Pricing, Rate};
