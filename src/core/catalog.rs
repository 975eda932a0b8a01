//! Catalog business logic - titles and the registration of their physical copies.
//!
//! A title is registered together with the codes of its copies. New copies start in
//! storage with revision 0 and get an initial history row, so every copy has exactly
//! one holder from the moment it exists. The module also computes the per-title
//! location summary (students / teachers / storage).

use crate::{
    config::school::TitleSeed,
    core::{
        holder,
        model::{Condition, CopyStatus, Holder, normalize_code, round_cents, validate_amount},
    },
    entities::{Book, Title, assignment_history, book, title},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, instrument};

/// Input for creating or updating a title.
#[derive(Debug, Clone)]
pub struct NewTitle {
    /// Identifier chosen by the administrator
    pub title_id: String,
    /// School subject
    pub subject: String,
    /// Display name
    pub title_name: String,
    /// ISBN, if known
    pub isbn: Option<String>,
    /// Replacement price
    pub price: f64,
}

/// Request to register a title together with a batch of copy codes.
#[derive(Debug, Clone)]
pub struct RegisterCopies {
    /// Title data (created or updated)
    pub title: NewTitle,
    /// Codes of the physical copies
    pub book_codes: Vec<String>,
    /// Condition of newly created copies
    pub condition: Condition,
    /// Status of newly created copies
    pub status: CopyStatus,
    /// Also move already registered copies from this batch back to storage
    pub put_into_storage: bool,
}

/// What a registration changed.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    /// The title after the upsert
    pub title: title::Model,
    /// Codes that were created as new copies
    pub created: Vec<String>,
    /// Codes that already existed under this title
    pub existing: Vec<String>,
    /// Existing codes that were moved back to storage
    pub returned_to_storage: Vec<String>,
}

/// Copy counts of one title by holder kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleLocationRow {
    /// Title identifier
    pub title_id: String,
    /// Subject
    pub subject: String,
    /// Display name
    pub title_name: String,
    /// ISBN
    pub isbn: Option<String>,
    /// Replacement price
    pub price: f64,
    /// Copies held by students
    pub cnt_students: usize,
    /// Copies held by teachers
    pub cnt_teachers: usize,
    /// Copies in storage
    pub cnt_storage: usize,
    /// All copies
    pub cnt_total: usize,
}

fn validate_title(new: NewTitle) -> Result<NewTitle> {
    let title_id = normalize_code(&new.title_id, "title id")?;
    if new.title_name.trim().is_empty() {
        return Err(Error::validation("title name cannot be empty"));
    }
    if new.subject.trim().is_empty() {
        return Err(Error::validation("subject cannot be empty"));
    }
    let price = validate_amount(new.price)?;
    Ok(NewTitle {
        title_id,
        subject: new.subject.trim().to_string(),
        title_name: new.title_name.trim().to_string(),
        isbn: new
            .isbn
            .map(|isbn| isbn.trim().to_string())
            .filter(|isbn| !isbn.is_empty()),
        price,
    })
}

/// Looks up a title by id.
pub async fn get_title<C>(db: &C, title_id: &str) -> Result<Option<title::Model>>
where
    C: ConnectionTrait,
{
    Title::find_by_id(title_id.trim().to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks up a title by id, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_title<C>(db: &C, title_id: &str) -> Result<title::Model>
where
    C: ConnectionTrait,
{
    get_title(db, title_id)
        .await?
        .ok_or_else(|| Error::not_found("title", title_id.trim()))
}

/// Creates a title or overwrites the editable fields of an existing one.
///
/// # Errors
/// Returns a validation error for empty id, name or subject and
/// [`Error::InvalidAmount`] for a negative or non-finite price.
pub async fn upsert_title<C>(db: &C, new: NewTitle) -> Result<title::Model>
where
    C: ConnectionTrait,
{
    let new = validate_title(new)?;
    let now = chrono::Utc::now().naive_utc();

    if let Some(existing) = Title::find_by_id(new.title_id.clone()).one(db).await? {
        let mut model: title::ActiveModel = existing.into();
        model.subject = Set(new.subject);
        model.title_name = Set(new.title_name);
        model.isbn = Set(new.isbn);
        model.price = Set(new.price);
        model.updated_at = Set(now);
        return model.update(db).await.map_err(Into::into);
    }

    title::ActiveModel {
        title_id: Set(new.title_id),
        subject: Set(new.subject),
        title_name: Set(new.title_name),
        isbn: Set(new.isbn),
        price: Set(new.price),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Looks up a copy by its canonical code.
pub async fn get_book<C>(db: &C, book_code: &str) -> Result<Option<book::Model>>
where
    C: ConnectionTrait,
{
    Book::find_by_id(book_code.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Resolves a scanned code to an existing copy.
///
/// # Errors
/// Returns a validation error for an empty scan and [`Error::NotFound`] for an
/// unknown code.
pub async fn require_book<C>(db: &C, scan: &str) -> Result<book::Model>
where
    C: ConnectionTrait,
{
    let code = normalize_code(scan, "book code")?;
    get_book(db, &code)
        .await?
        .ok_or_else(|| Error::not_found("book", code))
}

/// All copies of a title, ordered by code.
pub async fn books_for_title(db: &DatabaseConnection, title_id: &str) -> Result<Vec<book::Model>> {
    Book::find()
        .filter(book::Column::TitleId.eq(title_id.trim()))
        .order_by_asc(book::Column::BookCode)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn create_copy<C>(
    db: &C,
    code: &str,
    title_id: &str,
    condition: Condition,
    status: CopyStatus,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now().naive_utc();
    book::ActiveModel {
        book_code: Set(code.to_string()),
        title_id: Set(title_id.to_string()),
        status: Set(status.as_str().to_string()),
        condition: Set(condition.as_str().to_string()),
        holder_type: Set(Holder::Storage.kind().to_string()),
        holder_id: Set(None),
        revision: Set(0),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    assignment_history::ActiveModel {
        book_code: Set(code.to_string()),
        holder_type: Set(Holder::Storage.kind().to_string()),
        holder_id: Set(None),
        condition: Set(condition.as_str().to_string()),
        note: Set(Some("registered".to_string())),
        revision: Set(0),
        assigned_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Registers a title with a batch of copy codes in one transaction.
///
/// Unknown codes become new copies in storage. Codes already registered under the
/// same title are reported as existing and, with `put_into_storage`, moved back to
/// storage. Duplicate codes in the batch are ignored.
///
/// # Errors
/// Fails with a validation error if a code belongs to a different title; nothing is
/// written in that case.
#[instrument(skip(db, request), fields(title_id = %request.title.title_id))]
pub async fn register_title_with_books(
    db: &DatabaseConnection,
    request: RegisterCopies,
) -> Result<RegistrationOutcome> {
    let mut seen = HashSet::new();
    let mut codes = Vec::new();
    for raw in &request.book_codes {
        let code = normalize_code(raw, "book code")?;
        if seen.insert(code.clone()) {
            codes.push(code);
        }
    }

    let txn = db.begin().await?;
    let title = upsert_title(&txn, request.title).await?;

    let mut created = Vec::new();
    let mut existing = Vec::new();
    let mut returned_to_storage = Vec::new();

    for code in codes {
        match get_book(&txn, &code).await? {
            Some(copy) if copy.title_id != title.title_id => {
                return Err(Error::validation(format!(
                    "book code {code} is already registered for title {}",
                    copy.title_id
                )));
            }
            Some(copy) => {
                let in_storage = copy.holder_type == Holder::Storage.kind();
                if request.put_into_storage && !in_storage {
                    holder::reassign(
                        &txn,
                        &copy,
                        &Holder::Storage,
                        None,
                        Some("returned to storage on registration".to_string()),
                    )
                    .await?;
                    returned_to_storage.push(code.clone());
                }
                existing.push(code);
            }
            None => {
                create_copy(&txn, &code, &title.title_id, request.condition, request.status)
                    .await?;
                created.push(code);
            }
        }
    }

    txn.commit().await?;
    info!(
        "Registered title {} ({} new copies, {} existing)",
        title.title_id,
        created.len(),
        existing.len()
    );

    Ok(RegistrationOutcome {
        title,
        created,
        existing,
        returned_to_storage,
    })
}

/// Case-insensitive search over title id, name, subject and ISBN.
///
/// An empty query returns the first titles of the catalog. At most 50 titles are
/// returned, ordered by subject and name.
pub async fn search_titles(db: &DatabaseConnection, query: &str) -> Result<Vec<title::Model>> {
    const LIMIT: usize = 50;
    let needle = query.trim().to_lowercase();

    let titles = Title::find()
        .order_by_asc(title::Column::Subject)
        .order_by_asc(title::Column::TitleName)
        .all(db)
        .await?;

    Ok(titles
        .into_iter()
        .filter(|t| {
            needle.is_empty()
                || t.title_id.to_lowercase().contains(&needle)
                || t.title_name.to_lowercase().contains(&needle)
                || t.subject.to_lowercase().contains(&needle)
                || t.isbn
                    .as_deref()
                    .is_some_and(|isbn| isbn.to_lowercase().contains(&needle))
        })
        .take(LIMIT)
        .collect())
}

/// Counts the copies of every title by holder kind, ordered by subject and name.
pub async fn title_location_summary(db: &DatabaseConnection) -> Result<Vec<TitleLocationRow>> {
    let titles = Title::find()
        .order_by_asc(title::Column::Subject)
        .order_by_asc(title::Column::TitleName)
        .all(db)
        .await?;
    let books = Book::find().all(db).await?;

    // (students, teachers, storage) per title
    let mut counts: BTreeMap<String, (usize, usize, usize)> = BTreeMap::new();
    for copy in books {
        let entry = counts.entry(copy.title_id).or_default();
        match copy.holder_type.as_str() {
            "student" => entry.0 += 1,
            "teacher" => entry.1 += 1,
            "storage" => entry.2 += 1,
            other => {
                return Err(Error::MalformedRecord {
                    table: "books",
                    message: format!("unknown holder_type '{other}' on {}", copy.book_code),
                });
            }
        }
    }

    Ok(titles
        .into_iter()
        .map(|t| {
            let (cnt_students, cnt_teachers, cnt_storage) =
                counts.get(&t.title_id).copied().unwrap_or_default();
            TitleLocationRow {
                cnt_total: cnt_students + cnt_teachers + cnt_storage,
                title_id: t.title_id,
                subject: t.subject,
                title_name: t.title_name,
                isbn: t.isbn,
                price: round_cents(t.price),
                cnt_students,
                cnt_teachers,
                cnt_storage,
            }
        })
        .collect())
}

/// Registers the titles listed in config.toml that do not exist yet.
///
/// Existing titles are left untouched so edits made by administrators survive restarts.
pub async fn seed_titles(db: &DatabaseConnection, seeds: &[TitleSeed]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        if get_title(db, &seed.title_id).await?.is_some() {
            continue;
        }
        upsert_title(
            db,
            NewTitle {
                title_id: seed.title_id.clone(),
                subject: seed.subject.clone(),
                title_name: seed.title_name.clone(),
                isbn: seed.isbn.clone(),
                price: seed.price,
            },
        )
        .await?;
        created += 1;
    }
    if created > 0 {
        info!("Seeded {created} titles from configuration");
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_upsert_title_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut bad = sample_title("BIO_7", 20.0);
        bad.title_name = "  ".to_string();
        assert!(matches!(
            upsert_title(&db, bad).await,
            Err(Error::Validation { .. })
        ));

        let result = upsert_title(&db, sample_title("BIO_7", -1.0)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: -1.0 })));

        let result = upsert_title(&db, sample_title("", 1.0)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_title_updates_existing() -> Result<()> {
        let db = setup_test_db().await?;
        upsert_title(&db, sample_title("BIO_7", 20.0)).await?;
        let updated = upsert_title(&db, sample_title("BIO_7", 22.499)).await?;

        assert_eq!(updated.price, 22.5);
        assert_eq!(Title::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_creates_copies_in_storage() -> Result<()> {
        let db = setup_test_db().await?;

        let outcome = register_title_with_books(
            &db,
            RegisterCopies {
                title: sample_title("BIO_7", 24.95),
                book_codes: vec!["B1".into(), " B2 ".into(), "B1".into()],
                condition: Condition::Ok,
                status: CopyStatus::Ok,
                put_into_storage: false,
            },
        )
        .await?;

        assert_eq!(outcome.created, vec!["B1", "B2"]);
        assert!(outcome.existing.is_empty());

        let copies = books_for_title(&db, "BIO_7").await?;
        assert_eq!(copies.len(), 2);
        assert!(copies.iter().all(|c| c.holder_type == "storage"));
        assert!(copies.iter().all(|c| c.revision == 0));

        let history = holder::assignment_history(&db, "B1").await?;
        assert_eq!(history.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_reports_existing_and_returns_to_storage() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1", "B2"]).await?;
        create_test_student(&db, "S1", "7b").await?;
        assign_to_student(&db, "B1", "S1").await?;

        let outcome = register_title_with_books(
            &db,
            RegisterCopies {
                title: sample_title("BIO_7", 20.0),
                book_codes: vec!["B1".into(), "B2".into(), "B3".into()],
                condition: Condition::Used,
                status: CopyStatus::Ok,
                put_into_storage: true,
            },
        )
        .await?;

        assert_eq!(outcome.created, vec!["B3"]);
        assert_eq!(outcome.existing, vec!["B1", "B2"]);
        assert_eq!(outcome.returned_to_storage, vec!["B1"]);

        let b1 = get_book(&db, "B1").await?.unwrap();
        assert_eq!(b1.holder_type, "storage");
        Ok(())
    }

    #[tokio::test]
    async fn test_register_rejects_code_of_other_title() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1"]).await?;

        let result = register_title_with_books(
            &db,
            RegisterCopies {
                title: sample_title("MATH_7", 18.0),
                book_codes: vec!["M1".into(), "B1".into()],
                condition: Condition::Ok,
                status: CopyStatus::Ok,
                put_into_storage: false,
            },
        )
        .await;

        assert!(matches!(result, Err(Error::Validation { .. })));
        // Nothing from the failed batch was written
        assert!(get_title(&db, "MATH_7").await?.is_none());
        assert!(get_book(&db, "M1").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_require_book_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = require_book(&db, "NOPE").await;
        assert!(matches!(result, Err(Error::NotFound { entity: "book", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_search_titles() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &[]).await?;
        create_test_title_with_copies(&db, "MATH_7", 18.0, &[]).await?;

        let found = search_titles(&db, "bio").await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title_id, "BIO_7");

        assert_eq!(search_titles(&db, "").await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_title_location_summary_counts_by_holder() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1", "B2", "B3", "B4"]).await?;
        create_test_student(&db, "S1", "7b").await?;
        create_test_teacher(&db, "T1").await?;
        assign_to_student(&db, "B1", "S1").await?;
        assign_to_student(&db, "B2", "S1").await?;
        holder::assign_book(
            &db,
            holder::AssignBook::new("B3", Holder::Teacher("T1".to_string())),
        )
        .await?;

        let summary = title_location_summary(&db).await?;
        assert_eq!(summary.len(), 1);
        let row = &summary[0];
        assert_eq!(row.cnt_students, 2);
        assert_eq!(row.cnt_teachers, 1);
        assert_eq!(row.cnt_storage, 1);
        assert_eq!(row.cnt_total, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_titles_skips_existing() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 30.0, &[]).await?;

        let seeds = vec![
            TitleSeed {
                title_id: "BIO_7".to_string(),
                subject: "Biologie".to_string(),
                title_name: "Natura 7".to_string(),
                isbn: None,
                price: 1.0,
            },
            TitleSeed {
                title_id: "DE_7".to_string(),
                subject: "Deutsch".to_string(),
                title_name: "Deutschbuch 7".to_string(),
                isbn: Some("978-3-06-062687-7".to_string()),
                price: 21.5,
            },
        ];

        assert_eq!(seed_titles(&db, &seeds).await?, 1);
        assert_eq!(require_title(&db, "BIO_7").await?.price, 30.0);
        Ok(())
    }
}
