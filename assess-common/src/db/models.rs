//! Catalog read models shared across services

use serde::{Deserialize, Serialize};

/// Assessment model (a maturity questionnaire)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentModel {
    pub id: String,
    pub slug: String,
    pub name: String,
}

/// Scored answer option of an internal question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalAnswer {
    pub id: String,
    pub question_id: String,
    pub text: String,
    pub score: f64,
    pub order: i64,
}

/// Dimension-scoped question with its ordered answer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalQuestion {
    pub id: String,
    pub model_id: String,
    pub dimension_key: String,
    pub dimension_label: String,
    pub text: String,
    pub order: i64,
    /// Sorted by `order`
    pub answers: Vec<InternalAnswer>,
}

impl InternalQuestion {
    /// Lowest and highest answer score, `None` when the question has no answers
    pub fn score_range(&self) -> Option<(f64, f64)> {
        self.answers.iter().fold(None, |acc, a| match acc {
            None => Some((a.score, a.score)),
            Some((lo, hi)) => Some((lo.min(a.score), hi.max(a.score))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(id: &str, score: f64, order: i64) -> InternalAnswer {
        InternalAnswer {
            id: id.to_string(),
            question_id: "q1".to_string(),
            text: id.to_string(),
            score,
            order,
        }
    }

    #[test]
    fn test_score_range() {
        let mut q = InternalQuestion {
            id: "q1".to_string(),
            model_id: "m1".to_string(),
            dimension_key: "strategy".to_string(),
            dimension_label: "Strategy".to_string(),
            text: "Question".to_string(),
            order: 0,
            answers: vec![answer("a", 300.0, 0), answer("b", 100.0, 1), answer("c", 500.0, 2)],
        };
        assert_eq!(q.score_range(), Some((100.0, 500.0)));

        q.answers.clear();
        assert_eq!(q.score_range(), None);
    }
}
