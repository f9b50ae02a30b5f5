//! Import payload fixtures

use assess_import::models::{ExecuteRequest, ImportRequest};
use serde_json::{json, Value};

use super::db_utils::MODEL_SLUG;

/// Three questions: a paraphrase (E1), an unrelated one (E2) and an exact one (E3)
///
/// Raw values use a payload-wide 0..4 scale. Assessment `i` answers E1 = 4, E2 = 1,
/// E3 = i % 5.
pub fn standard_payload(assessments: usize) -> Value {
    let assessments: Vec<Value> = (0..assessments)
        .map(|i| {
            json!({
                "externalAssessmentId": format!("A{}", i + 1),
                "respondentMeta": {"org": format!("Org {}", i + 1)},
                "answers": [
                    {"externalQuestionId": "E1", "rawValue": 4},
                    {"externalQuestionId": "E2", "rawValue": 1},
                    {"externalQuestionId": "E3", "rawValue": (i % 5) as i64},
                ]
            })
        })
        .collect();

    json!({
        "source": "vendor-x",
        "scale": {"min": 0, "max": 4},
        "questions": [
            {"externalId": "E1", "text": "Do you use AI in your workflow?"},
            {"externalId": "E2", "text": "Banana", "dimensionHint": "fruit"},
            {"externalId": "E3", "text": "How mature is your data governance?", "dimensionHint": "data"},
        ],
        "assessments": assessments,
    })
}

pub fn import_request(import_data: Value) -> ImportRequest {
    ImportRequest {
        import_data,
        model_slug: MODEL_SLUG.to_string(),
        source: None,
    }
}

pub fn execute_request(import_data: Value) -> ExecuteRequest {
    ExecuteRequest {
        import: import_request(import_data),
        filename: "vendor-export.json".to_string(),
        imported_by: Some("analyst@example.com".to_string()),
    }
}
