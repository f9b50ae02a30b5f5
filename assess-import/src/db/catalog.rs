//! Assessment catalog reads
//!
//! Read-only access to a model's questions and answers. The catalog is owned by the
//! model builder; the import engine never writes to it.

use assess_common::db::{AssessmentModel, InternalAnswer, InternalQuestion};
use assess_common::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// Look up a model by its slug
pub async fn load_model_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<AssessmentModel>> {
    let row = sqlx::query("SELECT id, slug, name FROM assessment_models WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| AssessmentModel {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
    }))
}

/// All questions of a model with their answers
///
/// Questions are ordered by dimension order, then question order; answers by their
/// own order. The order is stable so matching ties resolve the same way every call.
pub async fn load_questions(pool: &SqlitePool, model_id: &str) -> Result<Vec<InternalQuestion>> {
    let question_rows = sqlx::query(
        r#"
        SELECT q.id, q.model_id, q.text, q.sort_order, d.key AS dimension_key, d.label AS dimension_label
        FROM questions q
        JOIN dimensions d ON d.id = q.dimension_id
        WHERE q.model_id = ?
        ORDER BY d.sort_order, q.sort_order, q.id
        "#,
    )
    .bind(model_id)
    .fetch_all(pool)
    .await?;

    let answer_rows = sqlx::query(
        r#"
        SELECT a.id, a.question_id, a.text, a.score, a.sort_order
        FROM answers a
        JOIN questions q ON q.id = a.question_id
        WHERE q.model_id = ?
        ORDER BY a.question_id, a.sort_order, a.id
        "#,
    )
    .bind(model_id)
    .fetch_all(pool)
    .await?;

    let mut answers_by_question: HashMap<String, Vec<InternalAnswer>> = HashMap::new();
    for row in answer_rows {
        let answer = InternalAnswer {
            id: row.get("id"),
            question_id: row.get("question_id"),
            text: row.get("text"),
            score: row.get("score"),
            order: row.get("sort_order"),
        };
        answers_by_question
            .entry(answer.question_id.clone())
            .or_default()
            .push(answer);
    }

    let questions = question_rows
        .into_iter()
        .map(|row| {
            let id: String = row.get("id");
            let answers = answers_by_question.remove(&id).unwrap_or_default();
            InternalQuestion {
                id,
                model_id: row.get("model_id"),
                dimension_key: row.get("dimension_key"),
                dimension_label: row.get("dimension_label"),
                text: row.get("text"),
                order: row.get("sort_order"),
                answers,
            }
        })
        .collect();

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_common::db::init_schema;

    async fn setup_test_db() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();

        for sql in [
            "INSERT INTO assessment_models (id, slug, name) VALUES ('m1', 'ai-readiness', 'AI Readiness')",
            "INSERT INTO dimensions (id, model_id, key, label, sort_order) VALUES ('d2', 'm1', 'data', 'Data', 2)",
            "INSERT INTO dimensions (id, model_id, key, label, sort_order) VALUES ('d1', 'm1', 'strategy', 'Strategy', 1)",
            "INSERT INTO questions (id, model_id, dimension_id, text, sort_order) VALUES ('q2', 'm1', 'd2', 'How mature is your data governance?', 0)",
            "INSERT INTO questions (id, model_id, dimension_id, text, sort_order) VALUES ('q1', 'm1', 'd1', 'Do you have an AI strategy?', 0)",
            "INSERT INTO answers (id, question_id, text, score, sort_order) VALUES ('q1-b', 'q1', 'Yes', 5.0, 1)",
            "INSERT INTO answers (id, question_id, text, score, sort_order) VALUES ('q1-a', 'q1', 'No', 1.0, 0)",
        ] {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn test_load_model_by_slug() {
        let pool = setup_test_db().await;

        let model = load_model_by_slug(&pool, "ai-readiness").await.unwrap().unwrap();
        assert_eq!(model.id, "m1");
        assert_eq!(model.name, "AI Readiness");

        assert!(load_model_by_slug(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_questions_ordered_with_answers() {
        let pool = setup_test_db().await;

        let questions = load_questions(&pool, "m1").await.unwrap();
        assert_eq!(questions.len(), 2);

        assert_eq!(questions[0].id, "q1");
        assert_eq!(questions[0].dimension_key, "strategy");
        let answer_ids: Vec<&str> = questions[0].answers.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(answer_ids, vec!["q1-a", "q1-b"]);

        assert_eq!(questions[1].id, "q2");
        assert_eq!(questions[1].dimension_label, "Data");
        assert!(questions[1].answers.is_empty());
    }
}
