//! In-memory stand-in for the PostgreSQL driver.
//!
//! The store accepts the same `query(text, params)` calls the real driver
//! does, classifies each statement by substring inspection of the normalized
//! text, and serves the result from in-process collections. It exists so the
//! application can run with no database at all (demo mode, tests, local
//! development with `MOCK_DB=true`).
//!
//! # What this is not
//!
//! The classifier is not a SQL parser. It recognizes the exact statement
//! phrasings produced by the model layer (`crate::models`) and nothing else.
//! A statement it does not recognize degrades to an empty result set with a
//! warning logged; callers therefore cannot distinguish "no rows" from
//! "pattern not recognized" through the query contract alone. [`classify`]
//! and [`StatementKind`] are public so tests and diagnostics can make that
//! distinction out of band.
//!
//! # Locking
//!
//! All collections and ID counters live behind one `std::sync::Mutex`. A
//! single-threaded event loop would serialize these calls for free; under a
//! multi-threaded tokio runtime the lock is what serializes concurrent
//! mutating calls. No await happens while the lock is held.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{QueryResult, Row};

// Pre-hashed seed passwords.
// student@demo.com / instructor@demo.com: demo123
// admin@demo.com: admin123
pub const DEMO_PASSWORD_HASH: &str =
    "$2b$10$rBV2JudLMx3qQF6.H.g.3.7q8.vYxQqR7N9XuR0R8HsKsL3Ym6FfC";
pub const ADMIN_PASSWORD_HASH: &str =
    "$2b$10$rBV2JudLMx3qQF6.H.g.3.QjK8xY5ZrP.R7N9XuR0R8HsKsL3Ym6a";

#[derive(Debug, Clone, Serialize)]
struct UserRecord {
    id: String,
    email: String,
    password_hash: String,
    full_name: String,
    role: String,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
struct CourseRecord {
    id: String,
    title: String,
    description: String,
    instructor_id: String,
    category: String,
    level: String,
    price: f64,
    published: bool,
    thumbnail_url: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
struct EnrollmentRecord {
    id: String,
    user_id: String,
    course_id: String,
    enrolled_at: DateTime<Utc>,
}

/// Statement kinds the mock engine recognizes.
///
/// Classification is first-match-wins in the declaration order below, which
/// mirrors the dispatch order of the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `FROM USERS ... WHERE EMAIL = $1` — login lookup, full row including
    /// the password hash.
    UserByEmail,
    /// `FROM USERS ... WHERE ID = $1` — profile lookup, password hash
    /// stripped.
    UserById,
    /// `INSERT INTO USERS` — registration.
    InsertUser,
    /// `FROM COURSES` with optional cumulative narrowing clauses.
    CourseSelect,
    /// `FROM ENROLLMENTS` with join-shaped or existence-check sub-cases.
    EnrollmentSelect,
    /// `INSERT INTO ENROLLMENTS`.
    InsertEnrollment,
    /// Anything else. Served as an empty result, never an error.
    Unrecognized,
}

/// Collapse whitespace and upper-case a statement for classification.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_uppercase()
}

/// Map a normalized statement to the operation that will serve it.
///
/// Pure substring containment over [`normalize`]d text. Resilient to
/// formatting, fragile to rewording: a model-layer statement that changes
/// phrasing must be re-checked against this table.
pub fn classify(normalized: &str) -> StatementKind {
    if normalized.contains("FROM USERS") && normalized.contains("WHERE EMAIL = $1") {
        StatementKind::UserByEmail
    } else if normalized.contains("FROM USERS") && normalized.contains("WHERE ID = $1") {
        StatementKind::UserById
    } else if normalized.contains("INSERT INTO USERS") {
        StatementKind::InsertUser
    } else if normalized.contains("FROM COURSES") {
        StatementKind::CourseSelect
    } else if normalized.contains("FROM ENROLLMENTS") {
        StatementKind::EnrollmentSelect
    } else if normalized.contains("INSERT INTO ENROLLMENTS") {
        StatementKind::InsertEnrollment
    } else {
        StatementKind::Unrecognized
    }
}

struct StoreInner {
    users: Vec<UserRecord>,
    courses: Vec<CourseRecord>,
    enrollments: Vec<EnrollmentRecord>,
    /// Next user ID suffix. Seed users occupy 1-3.
    user_seq: u64,
    /// Next enrollment ID suffix. The seed enrollment occupies 1.
    enrollment_seq: u64,
}

/// The in-memory store plus the dispatch logic over it.
///
/// Constructed once by [`super::Database::connect`] and owned by the
/// application state for the process lifetime. Never persisted; restart
/// discards everything but the seed data.
pub struct MockStore {
    inner: Mutex<StoreInner>,
}

impl MockStore {
    pub fn new() -> Self {
        let now = Utc::now();
        let users = vec![
            UserRecord {
                id: "usr-1-student".into(),
                email: "student@demo.com".into(),
                password_hash: DEMO_PASSWORD_HASH.into(),
                full_name: "Demo Student".into(),
                role: "student".into(),
                avatar_url: None,
                created_at: now,
            },
            UserRecord {
                id: "usr-2-instructor".into(),
                email: "instructor@demo.com".into(),
                password_hash: DEMO_PASSWORD_HASH.into(),
                full_name: "Demo Instructor".into(),
                role: "instructor".into(),
                avatar_url: None,
                created_at: now,
            },
            UserRecord {
                id: "usr-3-admin".into(),
                email: "admin@demo.com".into(),
                password_hash: ADMIN_PASSWORD_HASH.into(),
                full_name: "Admin User".into(),
                role: "admin".into(),
                avatar_url: None,
                created_at: now,
            },
        ];

        let courses = vec![
            CourseRecord {
                id: "crs-1".into(),
                title: "Introduction to React".into(),
                description: "Learn the basics of React including components, state, and props."
                    .into(),
                instructor_id: "usr-2-instructor".into(),
                category: "Web Development".into(),
                level: "Beginner".into(),
                price: 0.0,
                published: true,
                thumbnail_url: Some(
                    "https://images.unsplash.com/photo-1633356122544-f134324a6cee?w=800&auto=format&fit=crop&q=60"
                        .into(),
                ),
                created_at: now,
            },
            CourseRecord {
                id: "crs-2".into(),
                title: "Advanced TypeScript".into(),
                description:
                    "Deep dive into TypeScript generics, decorators, and advanced patterns.".into(),
                instructor_id: "usr-2-instructor".into(),
                category: "Web Development".into(),
                level: "Advanced".into(),
                price: 49.99,
                published: true,
                thumbnail_url: Some(
                    "https://images.unsplash.com/photo-1516116216624-53e697fedbea?w=800&auto=format&fit=crop&q=60"
                        .into(),
                ),
                created_at: now,
            },
            CourseRecord {
                id: "crs-3".into(),
                title: "Modern Backend with Node.js".into(),
                description:
                    "Build scalable REST APIs with Express, authentication, and databases.".into(),
                instructor_id: "usr-2-instructor".into(),
                category: "Backend".into(),
                level: "Intermediate".into(),
                price: 29.99,
                published: true,
                thumbnail_url: Some(
                    "https://images.unsplash.com/photo-1627398242454-45a1465c2479?w=800&auto=format&fit=crop&q=60"
                        .into(),
                ),
                created_at: now,
            },
        ];

        let enrollments = vec![EnrollmentRecord {
            id: "enr-1".into(),
            user_id: "usr-1-student".into(),
            course_id: "crs-1".into(),
            enrolled_at: now,
        }];

        MockStore {
            inner: Mutex::new(StoreInner {
                users,
                courses,
                enrollments,
                user_seq: 4,
                enrollment_seq: 2,
            }),
        }
    }

    /// Serve one statement. Unrecognized statements yield an empty result;
    /// this method never fails.
    pub fn execute(&self, text: &str, params: &[Value]) -> QueryResult {
        let normalized = normalize(text);
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match classify(&normalized) {
            StatementKind::UserByEmail => user_by_email(&inner, params),
            StatementKind::UserById => user_by_id(&inner, params),
            StatementKind::InsertUser => insert_user(&mut inner, params),
            StatementKind::CourseSelect => select_courses(&inner, &normalized, params),
            StatementKind::EnrollmentSelect => select_enrollments(&inner, &normalized, params),
            StatementKind::InsertEnrollment => insert_enrollment(&mut inner, params),
            StatementKind::Unrecognized => {
                log::warn!(
                    "mock store: unhandled statement pattern: {}",
                    truncate(&normalized, 80)
                );
                QueryResult::empty()
            }
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        MockStore::new()
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Positional parameter read, deliberately permissive. Absent or non-string
/// parameters degrade to `None`; the insert paths turn that into an empty
/// string instead of failing, which can produce partially-populated
/// records.
fn param_str(params: &[Value], idx: usize) -> Option<&str> {
    params.get(idx).and_then(Value::as_str)
}

fn to_row<T: Serialize>(record: &T) -> Row {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Row::new(),
    }
}

fn user_by_email(inner: &StoreInner, params: &[Value]) -> QueryResult {
    let email = match param_str(params, 0) {
        Some(e) => e.to_lowercase(),
        None => return QueryResult::empty(),
    };
    let user = inner
        .users
        .iter()
        .find(|u| u.email.to_lowercase() == email);
    QueryResult::from_rows(user.map(to_row).into_iter().collect())
}

fn user_by_id(inner: &StoreInner, params: &[Value]) -> QueryResult {
    let id = param_str(params, 0);
    let user = inner.users.iter().find(|u| Some(u.id.as_str()) == id);
    let rows = user
        .map(|u| {
            // Safe projection: never expose the password hash on ID lookups.
            let mut row = to_row(u);
            row.remove("password_hash");
            row
        })
        .into_iter()
        .collect();
    QueryResult::from_rows(rows)
}

fn insert_user(inner: &mut StoreInner, params: &[Value]) -> QueryResult {
    let email = param_str(params, 0).unwrap_or_default().to_string();
    let password_hash = param_str(params, 1).unwrap_or_default().to_string();
    let full_name = param_str(params, 2).unwrap_or_default().to_string();
    let role = param_str(params, 3).unwrap_or_default().to_string();

    let user = UserRecord {
        id: format!("usr-{}-{}", inner.user_seq, role),
        email,
        password_hash,
        full_name,
        role,
        avatar_url: None,
        created_at: Utc::now(),
    };
    inner.user_seq += 1;

    log::info!("mock store: created user {}", user.email);
    let row = to_row(&user);
    inner.users.push(user);
    QueryResult::from_rows(vec![row])
}

fn select_courses(inner: &StoreInner, normalized: &str, params: &[Value]) -> QueryResult {
    let mut courses: Vec<&CourseRecord> = inner.courses.iter().collect();

    // Narrowing clauses apply cumulatively, in the order checked.
    if normalized.contains("WHERE PUBLISHED = TRUE") {
        courses.retain(|c| c.published);
    }
    if normalized.contains("WHERE ID = $1") {
        if let Some(id) = param_str(params, 0).filter(|s| !s.is_empty()) {
            courses.retain(|c| c.id == id);
        }
    }
    if normalized.contains("WHERE INSTRUCTOR_ID = $1") {
        if let Some(instructor_id) = param_str(params, 0).filter(|s| !s.is_empty()) {
            courses.retain(|c| c.instructor_id == instructor_id);
        }
    }

    QueryResult::from_rows(courses.into_iter().map(to_row).collect())
}

fn select_enrollments(inner: &StoreInner, normalized: &str, params: &[Value]) -> QueryResult {
    // Enrollments for a user, carrying the joined course title and thumbnail.
    // Not a real join: one course lookup per enrollment row.
    if normalized.contains("JOIN COURSES")
        && (normalized.contains("WHERE E.USER_ID = $1") || normalized.contains("WHERE USER_ID = $1"))
    {
        let user_id = param_str(params, 0);
        let rows = inner
            .enrollments
            .iter()
            .filter(|e| Some(e.user_id.as_str()) == user_id)
            .map(|e| {
                let course = inner.courses.iter().find(|c| c.id == e.course_id);
                let mut row = to_row(e);
                row.insert(
                    "course_title".into(),
                    course.map_or(Value::Null, |c| Value::String(c.title.clone())),
                );
                row.insert(
                    "thumbnail_url".into(),
                    course
                        .and_then(|c| c.thumbnail_url.clone())
                        .map_or(Value::Null, Value::String),
                );
                row
            })
            .collect();
        return QueryResult::from_rows(rows);
    }

    // Students of a course, carrying the joined name and email.
    if normalized.contains("JOIN USERS")
        && (normalized.contains("WHERE E.COURSE_ID = $1")
            || normalized.contains("WHERE COURSE_ID = $1"))
    {
        let course_id = param_str(params, 0);
        let rows = inner
            .enrollments
            .iter()
            .filter(|e| Some(e.course_id.as_str()) == course_id)
            .map(|e| {
                let user = inner.users.iter().find(|u| u.id == e.user_id);
                let mut row = to_row(e);
                row.insert(
                    "student_name".into(),
                    user.map_or(Value::Null, |u| Value::String(u.full_name.clone())),
                );
                row.insert(
                    "student_email".into(),
                    user.map_or(Value::Null, |u| Value::String(u.email.clone())),
                );
                row
            })
            .collect();
        return QueryResult::from_rows(rows);
    }

    // Existence check on the (user, course) pair.
    if normalized.contains("WHERE USER_ID = $1") && normalized.contains("AND COURSE_ID = $2") {
        let user_id = param_str(params, 0);
        let course_id = param_str(params, 1);
        let rows = inner
            .enrollments
            .iter()
            .filter(|e| {
                Some(e.user_id.as_str()) == user_id && Some(e.course_id.as_str()) == course_id
            })
            .map(to_row)
            .collect();
        return QueryResult::from_rows(rows);
    }

    // No recognized predicate: the whole collection. A safety fallback so a
    // rephrased enrollment query degrades to too-many rows rather than none.
    QueryResult::from_rows(inner.enrollments.iter().map(to_row).collect())
}

fn insert_enrollment(inner: &mut StoreInner, params: &[Value]) -> QueryResult {
    let user_id = param_str(params, 0).unwrap_or_default().to_string();
    let course_id = param_str(params, 1).unwrap_or_default().to_string();

    let enrollment = EnrollmentRecord {
        id: format!("enr-{}", inner.enrollment_seq),
        user_id,
        course_id,
        enrolled_at: Utc::now(),
    };
    inner.enrollment_seq += 1;

    log::info!("mock store: created enrollment for user {}", enrollment.user_id);
    let row = to_row(&enrollment);
    inner.enrollments.push(enrollment);
    QueryResult::from_rows(vec![row])
}
