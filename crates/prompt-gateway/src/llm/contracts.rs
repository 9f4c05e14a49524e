use std::collections::BTreeMap;
use std::fmt;

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Languages the case-study template asks the provider to produce.
pub const CASE_STUDY_LANGUAGES: &[&str] = &["pl", "en"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    TicketAnalysis,
    CaseStudyDraft,
    KnowledgeAnswer,
    LeadScore,
    VoiceIntent,
    GeneratedContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    FreeText,
    Structured,
}

impl AdapterKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TicketAnalysis => "ticket_analysis",
            Self::CaseStudyDraft => "case_study_draft",
            Self::KnowledgeAnswer => "knowledge_answer",
            Self::LeadScore => "lead_score",
            Self::VoiceIntent => "voice_intent",
            Self::GeneratedContent => "generated_content",
        }
    }

    pub const fn output_format(self) -> OutputFormat {
        match self {
            Self::CaseStudyDraft | Self::LeadScore | Self::VoiceIntent => OutputFormat::Structured,
            Self::TicketAnalysis | Self::KnowledgeAnswer | Self::GeneratedContent => {
                OutputFormat::FreeText
            }
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketAnalysis {
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeAnswer {
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyDraft {
    #[schemars(regex(pattern = r"^[a-z0-9]+(-[a-z0-9]+)*$"))]
    pub slug: String,
    pub metadata: CaseStudyMetadata,
    pub translations: BTreeMap<String, CaseStudyTranslation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyMetadata {
    #[schemars(length(min = 1))]
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 5))]
    pub rating: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyTranslation {
    pub category: String,
    #[schemars(length(min = 1))]
    pub title: String,
    pub description: String,
    pub challenge: String,
    pub solution: String,
    pub results: Vec<String>,
    pub technologies: Vec<String>,
    pub testimonial: Testimonial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub quote: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LeadScore {
    #[schemars(range(min = 0, max = 100))]
    pub score: u8,
    pub category: LeadCategory,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LeadCategory {
    Hot,
    Warm,
    Cold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VoiceIntent {
    pub intent: VoiceIntentKind,
    pub data: Map<String, Value>,
    #[schemars(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoiceIntentKind {
    AddTask,
    CreateOffer,
    AddClient,
    RemindFollowup,
}

/// JSON Schema for a structured adapter's output; free-text adapters have none.
pub fn output_schema(adapter: AdapterKind) -> Result<Option<Value>, serde_json::Error> {
    let schema = match adapter {
        AdapterKind::CaseStudyDraft => serde_json::to_value(schema_for!(CaseStudyDraft))?,
        AdapterKind::LeadScore => serde_json::to_value(schema_for!(LeadScore))?,
        AdapterKind::VoiceIntent => serde_json::to_value(schema_for!(VoiceIntent))?,
        AdapterKind::TicketAnalysis
        | AdapterKind::KnowledgeAnswer
        | AdapterKind::GeneratedContent => return Ok(None),
    };
    Ok(Some(schema))
}
