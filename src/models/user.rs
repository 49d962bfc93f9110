use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::{Database, DbError, QueryExecutor, Row};

/// Account role, carried in JWT claims and checked by the authorization
/// helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Instructor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Instructor => "instructor",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full row, password hash included. Login path only.
pub async fn find_by_email(db: &Database, email: &str) -> Result<Option<Row>, DbError> {
    let result = db
        .query("SELECT * FROM users WHERE email = $1", &[json!(email)])
        .await?;
    Ok(result.into_first())
}

/// Safe projection: the statement never selects the password hash, and the
/// mock engine strips it on this pattern as well.
pub async fn find_by_id(db: &Database, id: &str) -> Result<Option<Row>, DbError> {
    let result = db
        .query(
            "SELECT id, email, full_name, role, avatar_url, created_at FROM users WHERE id = $1",
            &[json!(id)],
        )
        .await?;
    Ok(result.into_first())
}

pub async fn create(
    db: &Database,
    email: &str,
    password_hash: &str,
    full_name: &str,
    role: UserRole,
) -> Result<Option<Row>, DbError> {
    let result = db
        .query(
            "INSERT INTO users (email, password_hash, full_name, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, email, full_name, role, created_at",
            &[
                json!(email),
                json!(password_hash),
                json!(full_name),
                json!(role.as_str()),
            ],
        )
        .await?;
    Ok(result.into_first())
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, 10)
}
