//! External import payload
//!
//! The foreign export arrives as loosely typed JSON. It is parsed entry by entry into
//! typed shapes before any matching runs; every shape problem becomes a structural error
//! message carrying the offending entry's position.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Declared `[min, max]` of an external answer scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExternalScale {
    pub min: f64,
    pub max: f64,
}

impl ExternalScale {
    /// `None` unless both bounds are finite and `max > min`
    pub fn new(min: f64, max: f64) -> Option<Self> {
        let scale = Self { min, max };
        scale.is_usable().then_some(scale)
    }

    pub fn is_usable(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.max > self.min
    }
}

/// One question of the foreign export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalQuestion {
    #[serde(deserialize_with = "de_identifier")]
    pub external_id: String,
    pub text: String,
    #[serde(default)]
    pub dimension_hint: Option<String>,
    #[serde(default)]
    pub scale: Option<ExternalScale>,
}

/// One answer inside an external assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAnswer {
    #[serde(deserialize_with = "de_identifier")]
    pub external_question_id: String,
    #[serde(default)]
    pub raw_value: Value,
}

/// One completed foreign assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAssessment {
    #[serde(deserialize_with = "de_identifier")]
    pub external_assessment_id: String,
    #[serde(default)]
    pub respondent_meta: Value,
    #[serde(default)]
    pub answers: Vec<ExternalAnswer>,
}

/// Structurally valid import payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPayload {
    pub source: Option<String>,
    pub scale: Option<ExternalScale>,
    pub questions: Vec<ExternalQuestion>,
    pub assessments: Vec<ExternalAssessment>,
}

/// Outcome of boundary parsing
///
/// `assessment_count` is the number of entries in the raw `assessments` array, counted
/// even when some of them are malformed.
#[derive(Debug, Clone, Default)]
pub struct ParsedPayload {
    pub payload: ImportPayload,
    pub assessment_count: usize,
    pub errors: Vec<String>,
}

impl ImportPayload {
    /// Parse raw JSON into typed entries, collecting structural errors
    pub fn parse(value: &Value) -> ParsedPayload {
        let mut parsed = ParsedPayload::default();

        let Some(object) = value.as_object() else {
            parsed
                .errors
                .push("Import payload must be a JSON object".to_string());
            return parsed;
        };

        match object.get("source") {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if !s.trim().is_empty() => {
                parsed.payload.source = Some(s.trim().to_string());
            }
            Some(_) => parsed
                .errors
                .push("source: must be a non-empty string".to_string()),
        }

        match object.get("scale") {
            None | Some(Value::Null) => {}
            Some(raw) => match parse_scale(raw) {
                Ok(scale) => parsed.payload.scale = Some(scale),
                Err(msg) => parsed.errors.push(format!("scale: {}", msg)),
            },
        }

        if let Some(items) = array_field(object, "questions", &mut parsed.errors) {
            for (index, item) in items.iter().enumerate() {
                match serde_json::from_value::<ExternalQuestion>(item.clone()) {
                    Ok(question) => {
                        if question.external_id.trim().is_empty() {
                            parsed
                                .errors
                                .push(format!("questions[{}]: externalId must not be empty", index));
                        } else if matches!(question.scale, Some(s) if !s.is_usable()) {
                            parsed.errors.push(format!(
                                "questions[{}]: scale max must be greater than min",
                                index
                            ));
                        } else {
                            parsed.payload.questions.push(question);
                        }
                    }
                    Err(e) => parsed.errors.push(format!("questions[{}]: {}", index, e)),
                }
            }
        }

        if let Some(items) = array_field(object, "assessments", &mut parsed.errors) {
            parsed.assessment_count = items.len();
            for (index, item) in items.iter().enumerate() {
                match serde_json::from_value::<ExternalAssessment>(item.clone()) {
                    Ok(mut assessment) => {
                        if assessment.respondent_meta.is_null() {
                            assessment.respondent_meta = Value::Object(Default::default());
                        }
                        parsed.payload.assessments.push(assessment);
                    }
                    Err(e) => parsed.errors.push(format!("assessments[{}]: {}", index, e)),
                }
            }
        }

        parsed
    }
}

fn array_field<'a>(
    object: &'a serde_json::Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Vec<Value>> {
    match object.get(key) {
        Some(Value::Array(items)) => Some(items),
        Some(_) => {
            errors.push(format!("{}: must be an array", key));
            None
        }
        None => {
            errors.push(format!("Import payload is missing the `{}` array", key));
            None
        }
    }
}

fn parse_scale(raw: &Value) -> Result<ExternalScale, String> {
    let scale: ExternalScale = serde_json::from_value(raw.clone()).map_err(|e| e.to_string())?;
    if scale.is_usable() {
        Ok(scale)
    } else {
        Err("max must be greater than min".to_string())
    }
}

/// Foreign exports use both string and numeric identifiers
fn de_identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Identifier {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Identifier::deserialize(deserializer)? {
        Identifier::Text(s) => s.trim().to_string(),
        Identifier::Number(n) => n.to_string(),
    })
}
