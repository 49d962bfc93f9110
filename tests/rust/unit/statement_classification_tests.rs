//! Classification tables for the mock engine.
//!
//! Every statement the model layer emits must land on the expected
//! [`StatementKind`]; a rephrased statement that silently falls through to
//! `Unrecognized` would degrade to empty results in mock mode.

use perigee::db::{classify, normalize, StatementKind};
use test_case::test_case;

#[test_case("SELECT * FROM users WHERE email = $1", StatementKind::UserByEmail; "login lookup")]
#[test_case(
    "SELECT id, email, full_name, role, avatar_url, created_at FROM users WHERE id = $1",
    StatementKind::UserById;
    "profile lookup"
)]
#[test_case(
    "INSERT INTO users (email, password_hash, full_name, role) VALUES ($1, $2, $3, $4) RETURNING id, email, full_name, role, created_at",
    StatementKind::InsertUser;
    "registration"
)]
#[test_case("SELECT * FROM courses WHERE published = true ORDER BY created_at DESC", StatementKind::CourseSelect; "published courses")]
#[test_case("SELECT * FROM courses WHERE id = $1", StatementKind::CourseSelect; "course by id")]
#[test_case("SELECT * FROM courses WHERE instructor_id = $1 ORDER BY created_at DESC", StatementKind::CourseSelect; "courses by instructor")]
#[test_case(
    "SELECT e.*, c.title as course_title, c.thumbnail_url FROM enrollments e JOIN courses c ON e.course_id = c.id WHERE e.user_id = $1",
    StatementKind::EnrollmentSelect;
    "enrollments joined with courses"
)]
#[test_case(
    "SELECT e.*, u.full_name as student_name, u.email as student_email FROM enrollments e JOIN users u ON e.user_id = u.id WHERE e.course_id = $1",
    StatementKind::EnrollmentSelect;
    "enrollments joined with users"
)]
#[test_case("SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2", StatementKind::EnrollmentSelect; "existence check")]
#[test_case("INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2) RETURNING *", StatementKind::InsertEnrollment; "enroll")]
#[test_case("SELECT * FROM invites WHERE token = $1", StatementKind::Unrecognized; "invites are not mocked")]
#[test_case("SELECT * FROM lessons WHERE course_id = $1 ORDER BY position ASC", StatementKind::Unrecognized; "lessons are not mocked")]
#[test_case("SELECT COUNT(*) as count FROM progress WHERE user_id = $1 AND course_id = $2 AND completed = true", StatementKind::Unrecognized; "progress is not mocked")]
#[test_case("DELETE FROM courses WHERE id = $1", StatementKind::Unrecognized; "deletes are not mocked")]
fn model_layer_statements_classify(statement: &str, expected: StatementKind) {
    assert_eq!(classify(&normalize(statement)), expected);
}

/// The login pattern wins over the profile pattern when both substrings are
/// present; classification is first-match-wins.
#[test]
fn email_predicate_takes_precedence_over_id() {
    let normalized = normalize("SELECT * FROM users WHERE email = $1 AND id = $1");
    assert_eq!(classify(&normalized), StatementKind::UserByEmail);
}

#[test]
fn classification_survives_messy_formatting() {
    let messy = "select *\n   from users\n\twhere email = $1";
    assert_eq!(classify(&normalize(messy)), StatementKind::UserByEmail);

    let messy = "  INSERT   INTO\nusers (email) VALUES ($1)";
    assert_eq!(classify(&normalize(messy)), StatementKind::InsertUser);
}

#[test]
fn normalize_collapses_and_uppercases() {
    assert_eq!(
        normalize("  select *\t\nfrom   users "),
        "SELECT * FROM USERS"
    );
    assert_eq!(normalize(""), "");
}
