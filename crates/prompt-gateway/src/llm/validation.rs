use std::sync::LazyLock;

use jsonschema::JSONSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::contracts::{AdapterKind, CASE_STUDY_LANGUAGES, CaseStudyDraft, output_schema};
use super::errors::GatewayError;
use super::sanitize::SanitizedText;

static CASE_STUDY_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile_validator(AdapterKind::CaseStudyDraft));

static LEAD_SCORE_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile_validator(AdapterKind::LeadScore));

static VOICE_INTENT_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile_validator(AdapterKind::VoiceIntent));

fn compile_validator(adapter: AdapterKind) -> Result<JSONSchema, String> {
    let schema = output_schema(adapter)
        .map_err(|err| format!("{adapter} schema is not serializable: {err}"))?
        .ok_or_else(|| format!("{adapter} has no structured output schema"))?;
    JSONSchema::compile(&schema).map_err(|err| err.to_string())
}

fn validator_for_adapter(adapter: AdapterKind) -> Result<&'static JSONSchema, GatewayError> {
    let validator_result = match adapter {
        AdapterKind::CaseStudyDraft => &*CASE_STUDY_VALIDATOR,
        AdapterKind::LeadScore => &*LEAD_SCORE_VALIDATOR,
        AdapterKind::VoiceIntent => &*VOICE_INTENT_VALIDATOR,
        AdapterKind::TicketAnalysis
        | AdapterKind::KnowledgeAnswer
        | AdapterKind::GeneratedContent => {
            return Err(GatewayError::schema(
                adapter,
                vec!["adapter does not produce structured output".to_string()],
            ));
        }
    };

    validator_result
        .as_ref()
        .map_err(|message| GatewayError::schema(adapter, vec![message.clone()]))
}

/// Parses sanitized provider text into `T`. Invalid JSON is a parse error;
/// anything that does not satisfy the contract schema is a schema error.
pub fn parse_structured<T: DeserializeOwned>(
    adapter: AdapterKind,
    text: &SanitizedText,
) -> Result<T, GatewayError> {
    let payload: Value = serde_json::from_str(text.as_str()).map_err(|err| GatewayError::Parse {
        adapter,
        detail: err.to_string(),
    })?;

    let validator = validator_for_adapter(adapter)?;
    if let Err(validation_errors) = validator.validate(&payload) {
        let violations = validation_errors
            .map(|err| format!("{}: {err}", err.instance_path))
            .collect::<Vec<_>>();
        return Err(GatewayError::schema(adapter, violations));
    }

    serde_json::from_value(payload).map_err(|err| GatewayError::schema(adapter, vec![err.to_string()]))
}

pub fn validate_case_study(draft: &CaseStudyDraft) -> Result<(), GatewayError> {
    let mut violations = Vec::new();

    for code in draft.translations.keys() {
        if !is_language_code(code) {
            violations.push(format!("/translations: '{code}' is not a language code"));
        }
    }
    for required in CASE_STUDY_LANGUAGES {
        if !draft.translations.contains_key(*required) {
            violations.push(format!("/translations: missing '{required}' translation"));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::schema(AdapterKind::CaseStudyDraft, violations))
    }
}

/// `xx` or `xx-YY`.
fn is_language_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    match bytes.len() {
        2 => bytes.iter().all(u8::is_ascii_lowercase),
        5 => {
            bytes[..2].iter().all(u8::is_ascii_lowercase)
                && bytes[2] == b'-'
                && bytes[3..].iter().all(u8::is_ascii_uppercase)
        }
        _ => false,
    }
}
