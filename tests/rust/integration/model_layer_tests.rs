//! The model layer against a mock-backed `Database`.
//!
//! These tests exercise the same statement texts production code sends,
//! verifying that the mock engine recognizes each one and that the seed
//! data behaves like the fixtures it is meant to be.

use perigee::db::{field_str, verify_password, Database, QueryExecutor};
use perigee::models::{course, enrollment, invite, lesson, progress, user, UserRole};
use serde_json::{json, Value};

#[tokio::test]
async fn seed_accounts_can_log_in() {
    let db = Database::mock();

    for (email, password) in [
        ("student@demo.com", "demo123"),
        ("instructor@demo.com", "demo123"),
        ("admin@demo.com", "admin123"),
    ] {
        let row = user::find_by_email(&db, email)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("seed account {} missing", email));
        let hash = field_str(&row, "password_hash").expect("login row carries the hash");
        assert!(verify_password(password, hash), "{} should verify", email);
    }
}

#[tokio::test]
async fn register_flow_issues_sequential_ids() {
    let db = Database::mock();

    let first = user::create(&db, "new@demo.com", "h", "New Student", UserRole::Student)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(field_str(&first, "id"), Some("usr-4-student"));

    let second = user::create(&db, "second@demo.com", "h", "Second", UserRole::Instructor)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(field_str(&second, "id"), Some("usr-5-instructor"));

    // The new account is immediately visible to the login path, and the
    // lookup is case-insensitive.
    let found = user::find_by_email(&db, "NEW@DEMO.COM").await.unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn profile_lookup_never_leaks_the_hash() {
    let db = Database::mock();
    let row = user::find_by_id(&db, "usr-1-student").await.unwrap().unwrap();
    assert!(row.get("password_hash").is_none());
    assert_eq!(field_str(&row, "email"), Some("student@demo.com"));
}

#[tokio::test]
async fn course_filters_narrow_correctly() {
    let db = Database::mock();

    let published = course::find_all(&db, true).await.unwrap();
    assert_eq!(published.len(), 3);

    let one = course::find_by_id(&db, "crs-1").await.unwrap().unwrap();
    assert_eq!(field_str(&one, "title"), Some("Introduction to React"));

    let by_instructor = course::find_by_instructor(&db, "usr-2-instructor")
        .await
        .unwrap();
    assert_eq!(by_instructor.len(), 3);
    assert!(by_instructor
        .iter()
        .all(|c| field_str(c, "instructor_id") == Some("usr-2-instructor")));

    let none = course::find_by_instructor(&db, "usr-3-admin").await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn seed_enrollment_scenario() {
    let db = Database::mock();

    let mine = enrollment::find_by_user(&db, "usr-1-student").await.unwrap();
    assert_eq!(mine.len(), 1);
    let row = &mine[0];
    assert_eq!(field_str(row, "id"), Some("enr-1"));
    assert_eq!(field_str(row, "course_id"), Some("crs-1"));
    assert_eq!(field_str(row, "course_title"), Some("Introduction to React"));
}

#[tokio::test]
async fn enrollment_roundtrip_with_both_join_shapes() {
    let db = Database::mock();

    let created = enrollment::create(&db, "usr-1-student", "crs-3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(field_str(&created, "id"), Some("enr-2"));

    let mine = enrollment::find_by_user(&db, "usr-1-student").await.unwrap();
    assert_eq!(mine.len(), 2);

    let students = enrollment::find_by_course(&db, "crs-3").await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(
        field_str(&students[0], "student_email"),
        Some("student@demo.com")
    );
    assert_eq!(field_str(&students[0], "student_name"), Some("Demo Student"));
}

#[tokio::test]
async fn existence_check_guards_duplicates() {
    let db = Database::mock();
    assert!(enrollment::exists(&db, "usr-1-student", "crs-1").await.unwrap());
    assert!(!enrollment::exists(&db, "usr-2-instructor", "crs-1")
        .await
        .unwrap());
}

#[tokio::test]
async fn unmocked_tables_come_back_empty_not_failing() {
    let db = Database::mock();

    assert!(invite::find_by_token(&db, "t").await.unwrap().is_none());
    assert!(invite::find_by_course(&db, "crs-1").await.unwrap().is_empty());
    assert!(lesson::find_all(&db, "crs-1").await.unwrap().is_empty());

    let stats = progress::course_progress(&db, "usr-1-student", "crs-1")
        .await
        .unwrap();
    assert_eq!(stats.total_lessons, 0);
    assert_eq!(stats.percentage, 0);
}

#[tokio::test]
async fn raw_contract_matches_row_count_invariant() {
    let db = Database::mock();
    let result = db
        .query("SELECT * FROM courses WHERE published = true", &[])
        .await
        .unwrap();
    assert_eq!(result.row_count, result.rows.len());

    let empty = db.query("SELECT 1", &[json!(1)]).await.unwrap();
    assert_eq!(empty.row_count, 0);
    assert_eq!(empty.rows, Vec::<perigee::db::Row>::new());
}

#[tokio::test]
async fn returned_rows_are_detached_copies() {
    let db = Database::mock();

    let mut first = db
        .query("SELECT * FROM courses WHERE id = $1", &[json!("crs-1")])
        .await
        .unwrap();
    first.rows[0].insert("title".into(), Value::String("Tampered".into()));

    let second = db
        .query("SELECT * FROM courses WHERE id = $1", &[json!("crs-1")])
        .await
        .unwrap();
    assert_eq!(
        field_str(&second.rows[0], "title"),
        Some("Introduction to React")
    );
}
