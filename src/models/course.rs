use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{Database, DbError, QueryExecutor, Row};

/// Partial update for a course. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub price: Option<f64>,
    pub published: Option<bool>,
}

pub async fn find_all(db: &Database, published_only: bool) -> Result<Vec<Row>, DbError> {
    let mut sql = String::from("SELECT * FROM courses");
    if published_only {
        sql.push_str(" WHERE published = true");
    }
    sql.push_str(" ORDER BY created_at DESC");
    let result = db.query(&sql, &[]).await?;
    Ok(result.rows)
}

pub async fn find_by_id(db: &Database, id: &str) -> Result<Option<Row>, DbError> {
    let result = db
        .query("SELECT * FROM courses WHERE id = $1", &[json!(id)])
        .await?;
    Ok(result.into_first())
}

pub async fn find_by_instructor(db: &Database, instructor_id: &str) -> Result<Vec<Row>, DbError> {
    let result = db
        .query(
            "SELECT * FROM courses WHERE instructor_id = $1 ORDER BY created_at DESC",
            &[json!(instructor_id)],
        )
        .await?;
    Ok(result.rows)
}

pub async fn create(
    db: &Database,
    title: &str,
    description: &str,
    instructor_id: &str,
    thumbnail_url: Option<&str>,
    price: f64,
    published: bool,
) -> Result<Option<Row>, DbError> {
    let result = db
        .query(
            "INSERT INTO courses (title, description, instructor_id, thumbnail_url, price, published) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING *",
            &[
                json!(title),
                json!(description),
                json!(instructor_id),
                thumbnail_url.map_or(Value::Null, |u| json!(u)),
                json!(price),
                json!(published),
            ],
        )
        .await?;
    Ok(result.into_first())
}

/// Build the SET list from the fields actually present. Returns the current
/// row unchanged when nothing is set.
pub async fn update(
    db: &Database,
    id: &str,
    changes: &CourseUpdate,
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
    if let Some(thumbnail_url) = &changes.thumbnail_url {
        fields.push(format!("thumbnail_url = ${}", idx));
        values.push(json!(thumbnail_url));
        idx += 1;
    }
    if let Some(price) = changes.price {
        fields.push(format!("price = ${}", idx));
        values.push(json!(price));
        idx += 1;
    }
    if let Some(published) = changes.published {
        fields.push(format!("published = ${}", idx));
        values.push(json!(published));
        idx += 1;
    }

    if fields.is_empty() {
        return find_by_id(db, id).await;
    }

    values.push(json!(id));
    let sql = format!(
        "UPDATE courses SET {} WHERE id = ${} RETURNING *",
        fields.join(", "),
        idx
    );
    let result = db.query(&sql, &values).await?;
    Ok(result.into_first())
}

pub async fn delete(db: &Database, id: &str) -> Result<(), DbError> {
    db.query("DELETE FROM courses WHERE id = $1", &[json!(id)])
        .await?;
    Ok(())
}
