use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::db::{Database, DbError, QueryExecutor, Row};

// Invites live only in the real database. In mock mode these statements
// classify as unrecognized and come back empty, so invite flows are
// effectively disabled there.

const INVITE_TTL_DAYS: i64 = 7;

/// 32 bytes of randomness, hex encoded.
fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub async fn create(
    db: &Database,
    course_id: &str,
    email: &str,
    invited_by: &str,
) -> Result<Option<Row>, DbError> {
    let token = generate_token();
    let expires_at = Utc::now() + Duration::days(INVITE_TTL_DAYS);

    let result = db
        .query(
            "INSERT INTO invites (course_id, email, token, status, invited_by, expires_at) \
             VALUES ($1, $2, $3, 'pending', $4, $5) \
             RETURNING *",
            &[
                json!(course_id),
                json!(email),
                json!(token),
                json!(invited_by),
                json!(expires_at.to_rfc3339()),
            ],
        )
        .await?;
    Ok(result.into_first())
}

pub async fn find_by_token(db: &Database, token: &str) -> Result<Option<Row>, DbError> {
    let result = db
        .query("SELECT * FROM invites WHERE token = $1", &[json!(token)])
        .await?;
    Ok(result.into_first())
}

pub async fn find_by_course(db: &Database, course_id: &str) -> Result<Vec<Row>, DbError> {
    let result = db
        .query(
            "SELECT * FROM invites WHERE course_id = $1 ORDER BY created_at DESC",
            &[json!(course_id)],
        )
        .await?;
    Ok(result.rows)
}

pub async fn accept(db: &Database, id: &str) -> Result<Option<Row>, DbError> {
    let result = db
        .query(
            "UPDATE invites SET status = 'accepted' WHERE id = $1 RETURNING *",
            &[json!(id)],
        )
        .await?;
    Ok(result.into_first())
}
