use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{Database, DbError, QueryExecutor, Row};

/// Inputs for creating a lesson. Optional fields default to no
/// description/video, zero duration, unpublished.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub course_id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub duration: Option<i64>,
    pub position: i64,
    pub is_published: Option<bool>,
}

/// Partial update for a lesson.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub duration: Option<i64>,
    pub position: Option<i64>,
    pub is_published: Option<bool>,
}

pub async fn find_all(db: &Database, course_id: &str) -> Result<Vec<Row>, DbError> {
    let result = db
        .query(
            "SELECT * FROM lessons WHERE course_id = $1 ORDER BY position ASC",
            &[json!(course_id)],
        )
        .await?;
    Ok(result.rows)
}

pub async fn find_by_id(db: &Database, id: &str) -> Result<Option<Row>, DbError> {
    let result = db
        .query("SELECT * FROM lessons WHERE id = $1", &[json!(id)])
        .await?;
    Ok(result.into_first())
}

pub async fn create(db: &Database, input: &NewLesson) -> Result<Option<Row>, DbError> {
    let result = db
        .query(
            "INSERT INTO lessons (course_id, title, description, video_url, duration, position, is_published) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING *",
            &[
                json!(input.course_id),
                json!(input.title),
                input.description.as_deref().map_or(Value::Null, |v| json!(v)),
                input.video_url.as_deref().map_or(Value::Null, |v| json!(v)),
                json!(input.duration.unwrap_or(0)),
                json!(input.position),
                json!(input.is_published.unwrap_or(false)),
            ],
        )
        .await?;
    Ok(result.into_first())
}

pub async fn update(
    db: &Database,
    id: &str,
    changes: &LessonUpdate,
) -> Result<Option<Row>, DbError> {
    let mut fields: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    let mut idx = 1;

    if let Some(title) = &changes.title {
        fields.push(format!("title = ${}", idx));
        values.push(json!(title));
        idx += 1;
    }
    if let Some(description) = &changes.description {
        fields.push(format!("description = ${}", idx));
        values.push(json!(description));
        idx += 1;
    }
    if let Some(video_url) = &changes.video_url {
        fields.push(format!("video_url = ${}", idx));
        values.push(json!(video_url));
        idx += 1;
    }
    if let Some(duration) = changes.duration {
        fields.push(format!("duration = ${}", idx));
        values.push(json!(duration));
        idx += 1;
    }
    if let Some(position) = changes.position {
        fields.push(format!("position = ${}", idx));
        values.push(json!(position));
        idx += 1;
    }
    if let Some(is_published) = changes.is_published {
        fields.push(format!("is_published = ${}", idx));
        values.push(json!(is_published));
        idx += 1;
    }

    if fields.is_empty() {
        return find_by_id(db, id).await;
    }

    fields.push("updated_at = CURRENT_TIMESTAMP".to_string());
    values.push(json!(id));

    let sql = format!(
        "UPDATE lessons SET {} WHERE id = ${} RETURNING *",
        fields.join(", "),
        idx
    );
    let result = db.query(&sql, &values).await?;
    Ok(result.into_first())
}

pub async fn delete(db: &Database, id: &str) -> Result<bool, DbError> {
    let result = db
        .query("DELETE FROM lessons WHERE id = $1", &[json!(id)])
        .await?;
    Ok(result.row_count > 0)
}

/// Rewrite positions to match the given ID order.
pub async fn reorder(db: &Database, course_id: &str, lesson_ids: &[String]) -> Result<(), DbError> {
    for (position, lesson_id) in lesson_ids.iter().enumerate() {
        db.query(
            "UPDATE lessons SET position = $1, updated_at = CURRENT_TIMESTAMP \
             WHERE id = $2 AND course_id = $3",
            &[json!(position as i64), json!(lesson_id), json!(course_id)],
        )
        .await?;
    }
    Ok(())
}
