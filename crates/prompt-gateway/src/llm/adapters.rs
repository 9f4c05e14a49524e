use serde::{Deserialize, Serialize};

use super::contracts::{
    AdapterKind, CaseStudyDraft, GeneratedContent, KnowledgeAnswer, LeadScore, TicketAnalysis,
    VoiceIntent,
};
use super::errors::GatewayError;
use super::prompts::{
    DEFAULT_CONTENT_MAX_OUTPUT_TOKENS, DEFAULT_CONTENT_SYSTEM_PROMPT, DEFAULT_CONTENT_TEMPERATURE,
    GenerationConfig, PromptTemplate, PromptVariables, template_for_adapter,
};
use super::sanitize::SanitizedText;
use super::validation::{parse_structured, validate_case_study};

const NOT_PROVIDED: &str = "not provided";

/// One use case plugged into the gateway pipeline: caller input in, typed
/// result out. Implementations are pure; all I/O happens in the pipeline.
pub trait Adapter: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    fn kind(&self) -> AdapterKind;

    /// Rejects caller input before any credential lookup or network call.
    fn validate(&self, input: &Self::Input) -> Result<(), GatewayError>;

    fn template(&self, _input: &Self::Input) -> Result<PromptTemplate, GatewayError> {
        Ok(template_for_adapter(self.kind()))
    }

    fn variables(&self, input: &Self::Input) -> PromptVariables;

    fn parse(&self, input: &Self::Input, text: SanitizedText)
    -> Result<Self::Output, GatewayError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketAnalysisInput {
    pub subject: String,
    pub message: String,
    pub client_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyInput {
    pub project_name: String,
    pub client_review: String,
    pub rating: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeQuestionInput {
    pub question: String,
    pub knowledge_base: String,
    pub service_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadInput {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub message: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCommandInput {
    pub transcript: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentInput {
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TicketAnalysisAdapter;

#[derive(Debug, Clone, Copy, Default)]
pub struct CaseStudyAdapter;

#[derive(Debug, Clone, Copy, Default)]
pub struct KnowledgeAnswerAdapter;

#[derive(Debug, Clone, Copy, Default)]
pub struct LeadScoreAdapter;

#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceIntentAdapter;

#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratedContentAdapter;

impl Adapter for TicketAnalysisAdapter {
    type Input = TicketAnalysisInput;
    type Output = TicketAnalysis;

    fn kind(&self) -> AdapterKind {
        AdapterKind::TicketAnalysis
    }

    fn validate(&self, input: &Self::Input) -> Result<(), GatewayError> {
        require_text("subject", &input.subject)?;
        require_text("message", &input.message)?;
        require_text("clientName", &input.client_name)
    }

    fn variables(&self, input: &Self::Input) -> PromptVariables {
        PromptVariables::new()
            .text("client_name", input.client_name.trim())
            .text("subject", input.subject.trim())
            .untrusted("message", input.message.as_str())
    }

    fn parse(&self, _input: &Self::Input, text: SanitizedText) -> Result<Self::Output, GatewayError> {
        Ok(TicketAnalysis {
            analysis: text.into_string(),
        })
    }
}

impl Adapter for CaseStudyAdapter {
    type Input = CaseStudyInput;
    type Output = CaseStudyDraft;

    fn kind(&self) -> AdapterKind {
        AdapterKind::CaseStudyDraft
    }

    fn validate(&self, input: &Self::Input) -> Result<(), GatewayError> {
        require_text("projectName", &input.project_name)?;
        require_text("clientReview", &input.client_review)?;
        if !(1..=5).contains(&input.rating) {
            return Err(GatewayError::invalid_request(
                "rating must be between 1 and 5",
            ));
        }
        Ok(())
    }

    fn variables(&self, input: &Self::Input) -> PromptVariables {
        PromptVariables::new()
            .text("project_name", input.project_name.trim())
            .text("rating", input.rating.to_string())
            .untrusted("client_review", input.client_review.as_str())
    }

    fn parse(&self, input: &Self::Input, text: SanitizedText) -> Result<Self::Output, GatewayError> {
        let mut draft: CaseStudyDraft = parse_structured(self.kind(), &text)?;
        validate_case_study(&draft)?;
        draft.metadata.rating.get_or_insert(input.rating);
        Ok(draft)
    }
}

impl Adapter for KnowledgeAnswerAdapter {
    type Input = KnowledgeQuestionInput;
    type Output = KnowledgeAnswer;

    fn kind(&self) -> AdapterKind {
        AdapterKind::KnowledgeAnswer
    }

    fn validate(&self, input: &Self::Input) -> Result<(), GatewayError> {
        require_text("question", &input.question)?;
        require_text("knowledgeBase", &input.knowledge_base)?;
        require_text("serviceName", &input.service_name)
    }

    fn variables(&self, input: &Self::Input) -> PromptVariables {
        PromptVariables::new()
            .text("service_name", input.service_name.trim())
            .untrusted("knowledge_base", input.knowledge_base.as_str())
            .untrusted("question", input.question.as_str())
    }

    fn parse(&self, _input: &Self::Input, text: SanitizedText) -> Result<Self::Output, GatewayError> {
        Ok(KnowledgeAnswer {
            answer: text.into_string(),
        })
    }
}

impl Adapter for LeadScoreAdapter {
    type Input = LeadInput;
    type Output = LeadScore;

    fn kind(&self) -> AdapterKind {
        AdapterKind::LeadScore
    }

    fn validate(&self, input: &Self::Input) -> Result<(), GatewayError> {
        require_text("name", &input.name)?;
        require_text("message", &input.message)
    }

    fn variables(&self, input: &Self::Input) -> PromptVariables {
        PromptVariables::new()
            .text("name", input.name.trim())
            .text("company", optional_text(input.company.as_deref()))
            .text("email", optional_text(input.email.as_deref()))
            .text("source", optional_text(input.source.as_deref()))
            .text("budget", optional_text(input.budget.as_deref()))
            .untrusted("message", input.message.as_str())
    }

    fn parse(&self, _input: &Self::Input, text: SanitizedText) -> Result<Self::Output, GatewayError> {
        parse_structured(self.kind(), &text)
    }
}

impl Adapter for VoiceIntentAdapter {
    type Input = VoiceCommandInput;
    type Output = VoiceIntent;

    fn kind(&self) -> AdapterKind {
        AdapterKind::VoiceIntent
    }

    fn validate(&self, input: &Self::Input) -> Result<(), GatewayError> {
        require_text("transcript", &input.transcript)
    }

    fn variables(&self, input: &Self::Input) -> PromptVariables {
        PromptVariables::new().untrusted("transcript", input.transcript.as_str())
    }

    fn parse(&self, _input: &Self::Input, text: SanitizedText) -> Result<Self::Output, GatewayError> {
        parse_structured(self.kind(), &text)
    }
}

impl Adapter for GeneratedContentAdapter {
    type Input = GenerateContentInput;
    type Output = GeneratedContent;

    fn kind(&self) -> AdapterKind {
        AdapterKind::GeneratedContent
    }

    fn validate(&self, input: &Self::Input) -> Result<(), GatewayError> {
        require_text("prompt", &input.prompt)?;
        generation_for(input)?;
        Ok(())
    }

    fn template(&self, input: &Self::Input) -> Result<PromptTemplate, GatewayError> {
        Ok(template_for_adapter(self.kind()).with_generation(generation_for(input)?))
    }

    fn variables(&self, input: &Self::Input) -> PromptVariables {
        let system_prompt = input
            .system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CONTENT_SYSTEM_PROMPT);

        PromptVariables::new()
            .text("system_prompt", system_prompt)
            .text("prompt", input.prompt.as_str())
    }

    fn parse(&self, _input: &Self::Input, text: SanitizedText) -> Result<Self::Output, GatewayError> {
        Ok(GeneratedContent {
            text: text.into_string(),
        })
    }
}

fn generation_for(input: &GenerateContentInput) -> Result<GenerationConfig, GatewayError> {
    GenerationConfig::new(
        input.temperature.unwrap_or(DEFAULT_CONTENT_TEMPERATURE),
        input
            .max_output_tokens
            .unwrap_or(DEFAULT_CONTENT_MAX_OUTPUT_TOKENS),
    )
    .map_err(GatewayError::from)
}

fn require_text(field: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::invalid_request(format!("{field} is required")));
    }
    Ok(())
}

fn optional_text(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(NOT_PROVIDED)
}

#[cfg(test)]
mod tests {
    use super::{
        Adapter, CaseStudyAdapter, CaseStudyInput, GenerateContentInput, GeneratedContentAdapter,
        KnowledgeAnswerAdapter, KnowledgeQuestionInput, LeadInput, LeadScoreAdapter,
        TicketAnalysisAdapter, TicketAnalysisInput, VoiceCommandInput, VoiceIntentAdapter,
    };
    use crate::llm::errors::ErrorKind;
    use crate::llm::prompts::build;
    use crate::llm::sanitize::{sanitize, sanitize_free_text};

    fn assert_builds<A: Adapter>(adapter: &A, input: &A::Input) -> crate::llm::PromptRequest {
        adapter.validate(input).expect("input should be valid");
        let template = adapter.template(input).expect("template should resolve");
        build(&template, &adapter.variables(input)).expect("every placeholder should be supplied")
    }

    fn lead() -> LeadInput {
        LeadInput {
            name: "Anna Nowak".to_string(),
            company: None,
            email: Some("anna@example.com".to_string()),
            message: "We need a new shop before Q3, budget approved.".to_string(),
            source: Some("  ".to_string()),
            budget: Some("50k PLN".to_string()),
        }
    }

    #[test]
    fn every_adapter_supplies_all_template_variables() {
        assert_builds(
            &TicketAnalysisAdapter,
            &TicketAnalysisInput {
                subject: "Login broken".to_string(),
                message: "Can't sign in".to_string(),
                client_name: "Acme Corp".to_string(),
            },
        );
        assert_builds(
            &CaseStudyAdapter,
            &CaseStudyInput {
                project_name: "Acme Shop".to_string(),
                client_review: "Fantastic team!".to_string(),
                rating: 5,
            },
        );
        let knowledge = assert_builds(
            &KnowledgeAnswerAdapter,
            &KnowledgeQuestionInput {
                question: "How do I reset my password?".to_string(),
                knowledge_base: "Passwords are reset from the login page.".to_string(),
                service_name: "Acme Portal".to_string(),
            },
        );
        assert!(knowledge.system_prompt().contains("support assistant for Acme Portal"));

        let lead = assert_builds(&LeadScoreAdapter, &lead());
        assert!(lead.user_content().contains("Company: not provided"));
        assert!(lead.user_content().contains("Source: not provided"));
        assert!(lead.user_content().contains("Budget: 50k PLN"));

        assert_builds(
            &VoiceIntentAdapter,
            &VoiceCommandInput {
                transcript: "add a task call Anna tomorrow".to_string(),
            },
        );
    }

    #[test]
    fn generic_content_uses_caller_generation_and_default_system_prompt() {
        let request = assert_builds(
            &GeneratedContentAdapter,
            &GenerateContentInput {
                prompt: "Write a tagline for a bakery".to_string(),
                system_prompt: None,
                temperature: Some(0.9),
                max_output_tokens: Some(128),
            },
        );
        assert_eq!(request.temperature(), 0.9);
        assert_eq!(request.max_output_tokens(), 128);
        assert!(request.system_prompt().starts_with("You are a marketing and content assistant."));
        assert_eq!(request.user_content(), "Write a tagline for a bakery");
    }

    #[test]
    fn caller_input_is_validated_before_the_pipeline() {
        let err = TicketAnalysisAdapter
            .validate(&TicketAnalysisInput {
                subject: " ".to_string(),
                message: "m".to_string(),
                client_name: "c".to_string(),
            })
            .expect_err("blank subject is rejected");
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.public_message(), "subject is required");

        let err = CaseStudyAdapter
            .validate(&CaseStudyInput {
                project_name: "p".to_string(),
                client_review: "r".to_string(),
                rating: 6,
            })
            .expect_err("rating above 5 is rejected");
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = GeneratedContentAdapter
            .validate(&GenerateContentInput {
                prompt: "p".to_string(),
                system_prompt: None,
                temperature: Some(1.2),
                max_output_tokens: None,
            })
            .expect_err("temperature above 1 is rejected");
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = GeneratedContentAdapter
            .validate(&GenerateContentInput {
                prompt: "p".to_string(),
                system_prompt: None,
                temperature: None,
                max_output_tokens: Some(0),
            })
            .expect_err("zero token ceiling is rejected");
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn free_text_adapters_return_sanitized_text_verbatim() {
        let input = TicketAnalysisInput {
            subject: "s".to_string(),
            message: "m".to_string(),
            client_name: "c".to_string(),
        };
        let report = "**Summary:** login outage\n\n- priority: high";
        let analysis = TicketAnalysisAdapter
            .parse(&input, sanitize_free_text(report))
            .expect("free text always parses");
        assert_eq!(analysis.analysis, report);

        let empty = TicketAnalysisAdapter
            .parse(&input, sanitize_free_text("   "))
            .expect("empty text is a valid free-text result");
        assert_eq!(empty.analysis, "");
    }

    #[test]
    fn case_study_keeps_model_rating_or_falls_back_to_caller_rating() {
        let input = CaseStudyInput {
            project_name: "Acme Shop".to_string(),
            client_review: "Fantastic team!".to_string(),
            rating: 4,
        };
        let translation = r#"{"category":"E-commerce","title":"Shop","description":"d","challenge":"c","solution":"s","results":[],"technologies":[],"testimonial":{"quote":"Fantastic team!","author":"Jan"}}"#;
        let payload = format!(
            r#"{{"slug":"acme-shop","metadata":{{"clientName":"Acme"}},"translations":{{"pl":{translation},"en":{translation}}}}}"#
        );

        let draft = CaseStudyAdapter
            .parse(&input, sanitize(&payload))
            .expect("draft should parse");
        assert_eq!(draft.metadata.rating, Some(4));
        assert_eq!(draft.translations["en"].testimonial.quote, "Fantastic team!");
    }
}
