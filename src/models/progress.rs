use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::{field_str, Database, DbError, QueryExecutor, Row};

/// Per-lesson progress fields a client may report. `None` fields are left
/// untouched on update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub completed: Option<bool>,
    pub watch_time: Option<i64>,
    pub last_position: Option<i64>,
}

/// Aggregate completion stats for a user within a course.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub percentage: i64,
}

/// Update the (user, lesson) progress row, inserting it on first report.
pub async fn upsert(
    db: &Database,
    user_id: &str,
    course_id: &str,
    lesson_id: &str,
    data: &ProgressUpdate,
) -> Result<Option<Row>, DbError> {
    let existing = db
        .query(
            "SELECT id FROM progress WHERE user_id = $1 AND lesson_id = $2",
            &[json!(user_id), json!(lesson_id)],
        )
        .await?;

    if existing.row_count > 0 {
        let mut fields: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        let mut idx = 1;

        if let Some(completed) = data.completed {
            fields.push(format!("completed = ${}", idx));
            values.push(json!(completed));
            idx += 1;
        }
        if let Some(watch_time) = data.watch_time {
            fields.push(format!("watch_time = ${}", idx));
            values.push(json!(watch_time));
            idx += 1;
        }
        if let Some(last_position) = data.last_position {
            fields.push(format!("last_position = ${}", idx));
            values.push(json!(last_position));
            idx += 1;
        }

        fields.push("last_accessed = CURRENT_TIMESTAMP".to_string());
        if data.completed == Some(true) {
            fields.push("completed_at = CURRENT_TIMESTAMP".to_string());
        }

        values.push(json!(user_id));
        values.push(json!(lesson_id));

        let sql = format!(
            "UPDATE progress SET {} \
             WHERE user_id = ${} AND lesson_id = ${} \
             RETURNING *",
            fields.join(", "),
            idx,
            idx + 1
        );
        let result = db.query(&sql, &values).await?;
        return Ok(result.into_first());
    }

    let completed = data.completed.unwrap_or(false);
    let completed_at = if completed {
        json!(chrono::Utc::now().to_rfc3339())
    } else {
        Value::Null
    };
    let result = db
        .query(
            "INSERT INTO progress (user_id, course_id, lesson_id, completed, watch_time, last_position, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING *",
            &[
                json!(user_id),
                json!(course_id),
                json!(lesson_id),
                json!(completed),
                json!(data.watch_time.unwrap_or(0)),
                json!(data.last_position.unwrap_or(0)),
                completed_at,
            ],
        )
        .await?;
    Ok(result.into_first())
}

/// Detail rows for a user's progress in a course, joined with lesson titles.
pub async fn find_by_user_and_course(
    db: &Database,
    user_id: &str,
    course_id: &str,
) -> Result<Vec<Row>, DbError> {
    let result = db
        .query(
            "SELECT p.*, l.title as lesson_title \
             FROM progress p \
             JOIN lessons l ON p.lesson_id = l.id \
             WHERE p.user_id = $1 AND p.course_id = $2",
            &[json!(user_id), json!(course_id)],
        )
        .await?;
    Ok(result.rows)
}

/// Completion stats. A course with no lessons counts as zero percent.
pub async fn course_progress(
    db: &Database,
    user_id: &str,
    course_id: &str,
) -> Result<CourseProgress, DbError> {
    let total_res = db
        .query(
            "SELECT COUNT(*) as count FROM lessons WHERE course_id = $1",
            &[json!(course_id)],
        )
        .await?;
    let completed_res = db
        .query(
            "SELECT COUNT(*) as count FROM progress \
             WHERE user_id = $1 AND course_id = $2 AND completed = true",
            &[json!(user_id), json!(course_id)],
        )
        .await?;

    let total = count_of(&total_res.rows);
    let completed = count_of(&completed_res.rows);
    let percentage = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as i64
    };

    Ok(CourseProgress {
        total_lessons: total,
        completed_lessons: completed,
        percentage,
    })
}

/// COUNT(*) comes back as int8 or text depending on the backend; absent
/// rows (mock mode) count as zero.
fn count_of(rows: &[Row]) -> i64 {
    let Some(row) = rows.first() else { return 0 };
    match row.get("count") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(_)) => field_str(row, "count")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        _ => 0,
    }
}
