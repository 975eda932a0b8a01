//! Holder registry - who currently holds each physical copy.
//!
//! Every holder change is a compare-and-swap on the copy's `revision`:
//! `UPDATE books SET ..., revision = revision + 1 WHERE book_code = ? AND revision = ?`.
//! If another terminal changed the copy in between, no row matches and the change is
//! rejected with [`Error::Conflict`] instead of silently overwriting it. Each change also
//! appends a row to `assignment_history`.
//!
//! Holders must already exist and be active. Creating a student is a separate, explicit
//! step (see [`crate::core::people::ensure_student_exists`]).

use crate::{
    core::{
        catalog,
        model::{Condition, Holder, clean_note, normalize_code, parse_stored},
        people,
    },
    entities::{AssignmentHistory, Book, assignment_history, book},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// Request to move a copy to a new holder.
#[derive(Debug, Clone)]
pub struct AssignBook {
    /// Scanned or typed book code
    pub book_code: String,
    /// New holder
    pub holder: Holder,
    /// New condition; `None` keeps the current one
    pub condition: Option<Condition>,
    /// Operator note for the history
    pub note: Option<String>,
    /// Revision the operator last saw; `None` skips the check
    pub expected_revision: Option<i64>,
}

impl AssignBook {
    /// An assignment without condition change, note or revision check.
    pub fn new(book_code: impl Into<String>, holder: Holder) -> Self {
        Self {
            book_code: book_code.into(),
            holder,
            condition: None,
            note: None,
            expected_revision: None,
        }
    }

    /// Sets the condition recorded with the assignment.
    #[must_use]
    pub const fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Sets the history note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Requires the copy to still be at `revision`.
    #[must_use]
    pub const fn expecting_revision(mut self, revision: i64) -> Self {
        self.expected_revision = Some(revision);
        self
    }
}

/// Result of a successful holder change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Canonical code of the copy
    pub book_code: String,
    /// Title of the copy
    pub title_id: String,
    /// Holder before the change
    pub previous_holder: Holder,
    /// Holder after the change
    pub holder: Holder,
    /// Condition after the change
    pub condition: Condition,
    /// Revision after the change
    pub revision: i64,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} -> {} [condition {}, rev {}]",
            self.book_code,
            self.title_id,
            self.previous_holder,
            self.holder,
            self.condition,
            self.revision
        )
    }
}

/// The current holder stored on a copy.
pub fn holder_of(copy: &book::Model) -> Result<Holder> {
    Holder::from_columns(&copy.holder_type, copy.holder_id.as_deref())
}

/// Normalizes the holder id and checks that the holder exists and is active.
///
/// # Errors
/// Unknown or inactive students and teachers are a validation error.
pub(crate) async fn resolve_holder<C>(db: &C, holder: &Holder) -> Result<Holder>
where
    C: ConnectionTrait,
{
    match holder {
        Holder::Storage => Ok(Holder::Storage),
        Holder::Student(raw) => {
            let id = normalize_code(raw, "student id")?;
            match people::get_student(db, &id).await? {
                Some(student) if student.active => Ok(Holder::Student(id)),
                Some(_) => Err(Error::validation(format!("student {id} is inactive"))),
                None => Err(Error::validation(format!(
                    "student {id} does not exist; create the student first"
                ))),
            }
        }
        Holder::Teacher(raw) => {
            let id = normalize_code(raw, "teacher id")?;
            match people::get_teacher(db, &id).await? {
                Some(teacher) if teacher.active => Ok(Holder::Teacher(id)),
                Some(_) => Err(Error::validation(format!("teacher {id} is inactive"))),
                None => Err(Error::validation(format!("teacher {id} does not exist"))),
            }
        }
    }
}

/// Moves `copy` to `holder` with a compare-and-swap on its current revision and appends
/// a history row. Must run inside the caller's transaction.
pub(crate) async fn reassign<C>(
    db: &C,
    copy: &book::Model,
    holder: &Holder,
    condition: Option<Condition>,
    note: Option<String>,
) -> Result<book::Model>
where
    C: ConnectionTrait,
{
    let condition = match condition {
        Some(condition) => condition,
        None => parse_stored("books", &copy.condition)?,
    };
    let now = chrono::Utc::now().naive_utc();
    let next_revision = copy.revision + 1;

    let result = Book::update_many()
        .col_expr(book::Column::HolderType, Expr::value(holder.kind()))
        .col_expr(
            book::Column::HolderId,
            Expr::value(holder.id().map(str::to_string)),
        )
        .col_expr(book::Column::Condition, Expr::value(condition.as_str()))
        .col_expr(
            book::Column::Revision,
            Expr::col(book::Column::Revision).add(1),
        )
        .col_expr(book::Column::UpdatedAt, Expr::value(now))
        .filter(book::Column::BookCode.eq(copy.book_code.as_str()))
        .filter(book::Column::Revision.eq(copy.revision))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!(
            "Rejected stale assignment of {} at revision {}",
            copy.book_code, copy.revision
        );
        return Err(Error::Conflict {
            message: format!(
                "book {} was changed by someone else (expected revision {})",
                copy.book_code, copy.revision
            ),
        });
    }

    assignment_history::ActiveModel {
        book_code: Set(copy.book_code.clone()),
        holder_type: Set(holder.kind().to_string()),
        holder_id: Set(holder.id().map(str::to_string)),
        condition: Set(condition.as_str().to_string()),
        note: Set(note),
        revision: Set(next_revision),
        assigned_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    catalog::get_book(db, &copy.book_code)
        .await?
        .ok_or_else(|| Error::not_found("book", copy.book_code.clone()))
}

/// Atomically replaces the current holder of a copy.
///
/// # Errors
/// - [`Error::NotFound`] if the code does not resolve to a copy
/// - [`Error::Validation`] if the holder does not exist or is inactive
/// - [`Error::Conflict`] if `expected_revision` is stale or a concurrent change won
#[instrument(skip(db, request), fields(book_code = %request.book_code, holder = %request.holder))]
pub async fn assign_book(db: &DatabaseConnection, request: AssignBook) -> Result<Confirmation> {
    let txn = db.begin().await?;

    let copy = catalog::require_book(&txn, &request.book_code).await?;
    if let Some(expected) = request
        .expected_revision
        .filter(|&expected| expected != copy.revision)
    {
        return Err(Error::Conflict {
            message: format!(
                "book {} is at revision {}, not {expected}",
                copy.book_code, copy.revision
            ),
        });
    }

    let holder = resolve_holder(&txn, &request.holder).await?;
    let previous_holder = holder_of(&copy)?;
    let updated = reassign(
        &txn,
        &copy,
        &holder,
        request.condition,
        clean_note(request.note),
    )
    .await?;

    txn.commit().await?;

    let confirmation = Confirmation {
        book_code: updated.book_code,
        title_id: updated.title_id,
        previous_holder,
        holder,
        condition: parse_stored("books", &updated.condition)?,
        revision: updated.revision,
    };
    info!("Assigned {confirmation}");
    Ok(confirmation)
}

/// Puts a copy back into storage.
pub async fn return_to_storage(
    db: &DatabaseConnection,
    book_code: &str,
    note: Option<String>,
) -> Result<Confirmation> {
    let mut request = AssignBook::new(book_code, Holder::Storage);
    request.note = note;
    assign_book(db, request).await
}

/// All copies currently held by `holder`, ordered by code.
pub async fn list_by_holder(db: &DatabaseConnection, holder: &Holder) -> Result<Vec<book::Model>> {
    let mut query = Book::find().filter(book::Column::HolderType.eq(holder.kind()));
    query = match holder.id() {
        Some(raw) => {
            let id = normalize_code(raw, "holder id")?;
            query.filter(book::Column::HolderId.eq(id))
        }
        None => query.filter(book::Column::HolderId.is_null()),
    };

    let copies = query.order_by_asc(book::Column::BookCode).all(db).await?;
    debug!("{} holds {} copies", holder, copies.len());
    Ok(copies)
}

/// The holder history of a copy, oldest first.
pub async fn assignment_history(
    db: &DatabaseConnection,
    book_code: &str,
) -> Result<Vec<assignment_history::Model>> {
    let code = normalize_code(book_code, "book code")?;
    AssignmentHistory::find()
        .filter(assignment_history::Column::BookCode.eq(code))
        .order_by_asc(assignment_history::Column::Revision)
        .order_by_asc(assignment_history::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_assign_then_list_by_holder() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1", "B2"]).await?;
        create_test_student(&db, "S1", "7b").await?;

        let confirmation = assign_to_student(&db, "B1", "S1").await?;
        assert_eq!(confirmation.previous_holder, Holder::Storage);
        assert_eq!(confirmation.holder, Holder::Student("S1".to_string()));
        assert_eq!(confirmation.revision, 1);

        let held = list_by_holder(&db, &Holder::Student("S1".to_string())).await?;
        let codes: Vec<_> = held.iter().map(|b| b.book_code.as_str()).collect();
        assert_eq!(codes, vec!["B1"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_reassign_leaves_single_holder() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1"]).await?;
        create_test_student(&db, "A", "7b").await?;
        create_test_student(&db, "B", "7b").await?;

        assign_to_student(&db, "B1", "A").await?;
        assign_to_student(&db, "B1", "B").await?;

        let a = list_by_holder(&db, &Holder::Student("A".to_string())).await?;
        let b = list_by_holder(&db, &Holder::Student("B".to_string())).await?;
        assert!(a.is_empty());
        assert_eq!(b.len(), 1);

        let history = assignment_history(&db, "B1").await?;
        let revisions: Vec<_> = history.iter().map(|h| h.revision).collect();
        assert_eq!(revisions, vec![0, 1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_assign_updates_condition_and_normalizes_scan() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1"]).await?;
        create_test_student(&db, "S1", "7b").await?;

        let confirmation = assign_book(
            &db,
            AssignBook::new(" B1\n", Holder::Student(" S1 ".to_string()))
                .with_condition(Condition::Damaged)
                .with_note("cover torn"),
        )
        .await?;
        assert_eq!(confirmation.book_code, "B1");
        assert_eq!(confirmation.condition, Condition::Damaged);

        let history = assignment_history(&db, "B1").await?;
        assert_eq!(history.last().unwrap().note.as_deref(), Some("cover torn"));
        Ok(())
    }

    #[tokio::test]
    async fn test_assign_unknown_book_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "S1", "7b").await?;

        let result = assign_to_student(&db, "NOPE", "S1").await;
        assert!(matches!(result, Err(Error::NotFound { entity: "book", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_assign_unknown_or_inactive_holder_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1"]).await?;

        let result = assign_to_student(&db, "B1", "GHOST").await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        // No student was created as a side effect
        assert!(people::get_student(&db, "GHOST").await?.is_none());

        create_test_student(&db, "S1", "7b").await?;
        people::set_student_active(&db, "S1", false).await?;
        let result = assign_to_student(&db, "B1", "S1").await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = assign_book(
            &db,
            AssignBook::new("B1", Holder::Teacher("T404".to_string())),
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        // The copy never left storage
        let copy = catalog::require_book(&db, "B1").await?;
        assert_eq!(copy.holder_type, "storage");
        assert_eq!(copy.revision, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_expected_revision_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1"]).await?;
        create_test_student(&db, "A", "7b").await?;
        create_test_student(&db, "B", "7b").await?;

        // Two terminals both saw revision 0
        assign_book(
            &db,
            AssignBook::new("B1", Holder::Student("A".to_string())).expecting_revision(0),
        )
        .await?;
        let result = assign_book(
            &db,
            AssignBook::new("B1", Holder::Student("B".to_string())).expecting_revision(0),
        )
        .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let copy = catalog::require_book(&db, "B1").await?;
        assert_eq!(holder_of(&copy)?, Holder::Student("A".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_reassign_with_outdated_snapshot_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1"]).await?;

        let snapshot = catalog::require_book(&db, "B1").await?;
        reassign(&db, &snapshot, &Holder::Storage, None, None).await?;
        let result = reassign(&db, &snapshot, &Holder::Storage, None, None).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_return_to_storage_and_teacher_holder() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1"]).await?;
        create_test_teacher(&db, "T1").await?;

        assign_book(&db, AssignBook::new("B1", Holder::Teacher("T1".to_string()))).await?;
        let held = list_by_holder(&db, &Holder::Teacher("T1".to_string())).await?;
        assert_eq!(held.len(), 1);

        let confirmation = return_to_storage(&db, "B1", Some("end of term".to_string())).await?;
        assert_eq!(confirmation.previous_holder, Holder::Teacher("T1".to_string()));
        assert_eq!(list_by_holder(&db, &Holder::Storage).await?.len(), 1);
        Ok(())
    }
}
