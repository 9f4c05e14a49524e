pub mod adapters;
pub mod contracts;
pub mod errors;
pub mod gateway;
pub mod gemini;
pub mod keys;
pub mod observability;
pub mod pipeline;
pub mod prompts;
pub mod sanitize;
pub mod validation;

pub use adapters::{
    Adapter, CaseStudyAdapter, CaseStudyInput, GenerateContentInput, GeneratedContentAdapter,
    KnowledgeAnswerAdapter, KnowledgeQuestionInput, LeadInput, LeadScoreAdapter,
    TicketAnalysisAdapter, TicketAnalysisInput, VoiceCommandInput, VoiceIntentAdapter,
};
pub use contracts::{
    AdapterKind, CaseStudyDraft, GeneratedContent, KnowledgeAnswer, LeadCategory, LeadScore,
    OutputFormat, TicketAnalysis, VoiceIntent, VoiceIntentKind, output_schema,
};
pub use errors::{ErrorKind, GatewayError, TransportFailure};
pub use gateway::{
    CompletionClient, InvocationFuture, PromptRequest, RawProviderResponse, TokenUsage,
};
pub use gemini::{GeminiClient, GeminiClientConfig, GeminiClientError};
pub use keys::{
    ApiKey, ExecutionContext, KeyCandidate, KeyCandidateSet, KeyResolver, KeySourcesConfig,
};
pub use pipeline::{Gateway, RequestState, RequestTrace};
pub use prompts::{GenerationConfig, PromptBuildError, PromptTemplate, PromptVariables, build};
pub use sanitize::{SanitizedText, sanitize, sanitize_free_text};
