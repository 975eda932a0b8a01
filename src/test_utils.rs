//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating catalog and people records with sensible defaults.

use crate::{
    config::school::StudentRules,
    core::{
        catalog::{self, NewTitle, RegisterCopies},
        holder::{self, AssignBook, Confirmation},
        model::{Condition, CopyStatus, Holder},
        people::{self, NewStudent},
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Title input with sensible defaults.
///
/// # Defaults
/// * `subject`: "Subject {`title_id`}"
/// * `title_name`: "{`title_id`} textbook"
/// * `isbn`: None
pub fn sample_title(title_id: &str, price: f64) -> NewTitle {
    NewTitle {
        title_id: title_id.to_string(),
        subject: format!("Subject {title_id}"),
        title_name: format!("{title_id} textbook"),
        isbn: None,
        price,
    }
}

/// Registers a title and the given copy codes, all in storage and in condition "ok".
pub async fn create_test_title_with_copies(
    db: &DatabaseConnection,
    title_id: &str,
    price: f64,
    codes: &[&str],
) -> Result<entities::title::Model> {
    let outcome = catalog::register_title_with_books(
        db,
        RegisterCopies {
            title: sample_title(title_id, price),
            book_codes: codes.iter().map(|c| (*c).to_string()).collect(),
            condition: Condition::Ok,
            status: CopyStatus::Ok,
            put_into_storage: false,
        },
    )
    .await?;
    Ok(outcome.title)
}

/// Creates an active regular-track student without religion or course.
pub async fn create_test_student(
    db: &DatabaseConnection,
    student_id: &str,
    class_id: &str,
) -> Result<entities::student::Model> {
    people::upsert_student(
        db,
        StudentRules::default(),
        NewStudent::new(student_id, class_id),
    )
    .await
}

/// Creates an active teacher.
pub async fn create_test_teacher(
    db: &DatabaseConnection,
    teacher_id: &str,
) -> Result<entities::teacher::Model> {
    people::upsert_teacher(db, teacher_id, true).await
}

/// Assigns a copy to a student without condition change or note.
pub async fn assign_to_student(
    db: &DatabaseConnection,
    book_code: &str,
    student_id: &str,
) -> Result<Confirmation> {
    holder::assign_book(
        db,
        AssignBook::new(book_code, Holder::Student(student_id.to_string())),
    )
    .await
}
