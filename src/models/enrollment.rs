use serde_json::json;

use crate::db::{Database, DbError, QueryExecutor, Row};

pub async fn create(db: &Database, user_id: &str, course_id: &str) -> Result<Option<Row>, DbError> {
    let result = db
        .query(
            "INSERT INTO enrollments (user_id, course_id) \
             VALUES ($1, $2) \
             RETURNING *",
            &[json!(user_id), json!(course_id)],
        )
        .await?;
    Ok(result.into_first())
}

/// The engine does not enforce (user, course) uniqueness; callers that care
/// check here first.
pub async fn exists(db: &Database, user_id: &str, course_id: &str) -> Result<bool, DbError> {
    let result = db
        .query(
            "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2",
            &[json!(user_id), json!(course_id)],
        )
        .await?;
    Ok(result.row_count > 0)
}

/// Enrollments for a user, each row carrying `course_title` and
/// `thumbnail_url` from the joined course.
pub async fn find_by_user(db: &Database, user_id: &str) -> Result<Vec<Row>, DbError> {
    let result = db
        .query(
            "SELECT e.*, c.title as course_title, c.thumbnail_url \
             FROM enrollments e \
             JOIN courses c ON e.course_id = c.id \
             WHERE e.user_id = $1",
            &[json!(user_id)],
        )
        .await?;
    Ok(result.rows)
}

/// Students of a course, each row carrying `student_name` and
/// `student_email` from the joined user.
pub async fn find_by_course(db: &Database, course_id: &str) -> Result<Vec<Row>, DbError> {
    let result = db
        .query(
            "SELECT e.*, u.full_name as student_name, u.email as student_email \
             FROM enrollments e \
             JOIN users u ON e.user_id = u.id \
             WHERE e.course_id = $1",
            &[json!(course_id)],
        )
        .await?;
    Ok(result.rows)
}
