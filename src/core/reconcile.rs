//! Reconciliation of required titles (Soll) against copies actually held (Ist).
//!
//! For a class, `cnt_should` counts the active students whose rules require a title
//! and `cnt_is` counts the copies of that title held by those students. Missing and
//! extra are computed independently, so both can never be positive for one row.

use crate::{
    core::{
        catalog,
        holder::{self, AssignBook, Confirmation},
        model::{Holder, normalize_class_id, normalize_code},
        people, rules,
    },
    entities::{Book, Title, book, student, title},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, prelude::*};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, instrument};

/// Soll/Ist counts for one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationRow {
    /// Title identifier
    pub title_id: String,
    /// Subject, for display
    pub subject: String,
    /// Title name, for display
    pub title_name: String,
    /// Required copies
    pub cnt_should: usize,
    /// Copies held
    pub cnt_is: usize,
    /// `max(0, should - is)`
    pub cnt_missing: usize,
    /// `max(0, is - should)`
    pub cnt_extra: usize,
}

/// Column sums over a set of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconciliationTotals {
    /// Sum of required copies
    pub cnt_should: usize,
    /// Sum of held copies
    pub cnt_is: usize,
    /// Sum of missing copies
    pub cnt_missing: usize,
    /// Sum of extra copies
    pub cnt_extra: usize,
}

/// Sums the counts of all rows.
#[must_use]
pub fn totals(rows: &[ReconciliationRow]) -> ReconciliationTotals {
    rows.iter()
        .fold(ReconciliationTotals::default(), |acc, row| ReconciliationTotals {
            cnt_should: acc.cnt_should + row.cnt_should,
            cnt_is: acc.cnt_is + row.cnt_is,
            cnt_missing: acc.cnt_missing + row.cnt_missing,
            cnt_extra: acc.cnt_extra + row.cnt_extra,
        })
}

/// Copies of any title held by the given students.
async fn copies_held_by<C>(db: &C, student_ids: &[String]) -> Result<Vec<book::Model>>
where
    C: ConnectionTrait,
{
    if student_ids.is_empty() {
        return Ok(Vec::new());
    }
    Book::find()
        .filter(book::Column::HolderType.eq("student"))
        .filter(book::Column::HolderId.is_in(student_ids.iter().cloned()))
        .order_by_asc(book::Column::BookCode)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Builds rows for the union of required and held titles, ordered by subject and id.
///
/// `fallback_subjects` supplies a subject for titles missing from the catalog.
async fn build_rows<C>(
    db: &C,
    should: &BTreeMap<String, usize>,
    is: &BTreeMap<String, usize>,
    fallback_subjects: &BTreeMap<String, String>,
) -> Result<Vec<ReconciliationRow>>
where
    C: ConnectionTrait,
{
    let title_ids: BTreeSet<&String> = should.keys().chain(is.keys()).collect();
    if title_ids.is_empty() {
        return Ok(Vec::new());
    }

    let titles: BTreeMap<String, title::Model> = Title::find()
        .filter(title::Column::TitleId.is_in(title_ids.iter().map(|id| (*id).clone())))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.title_id.clone(), t))
        .collect();

    let mut rows: Vec<ReconciliationRow> = title_ids
        .into_iter()
        .map(|title_id| {
            let cnt_should = should.get(title_id).copied().unwrap_or(0);
            let cnt_is = is.get(title_id).copied().unwrap_or(0);
            let (subject, title_name) = match titles.get(title_id) {
                Some(t) => (t.subject.clone(), t.title_name.clone()),
                None => (
                    fallback_subjects.get(title_id).cloned().unwrap_or_default(),
                    title_id.clone(),
                ),
            };
            ReconciliationRow {
                title_id: title_id.clone(),
                subject,
                title_name,
                cnt_should,
                cnt_is,
                cnt_missing: cnt_should.saturating_sub(cnt_is),
                cnt_extra: cnt_is.saturating_sub(cnt_should),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.subject
            .cmp(&b.subject)
            .then_with(|| a.title_id.cmp(&b.title_id))
    });
    Ok(rows)
}

fn count_titles<'a>(copies: impl IntoIterator<Item = &'a book::Model>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for copy in copies {
        *counts.entry(copy.title_id.clone()).or_insert(0) += 1;
    }
    counts
}

/// Soll/Ist per title for the active students of a class.
#[instrument(skip(db))]
pub async fn class_reconciliation(
    db: &DatabaseConnection,
    class_id: &str,
) -> Result<Vec<ReconciliationRow>> {
    let class_id = people::require_class(db, class_id).await?;
    let roster = people::students_in_class(db, &class_id, true).await?;
    let class_rules = rules::rules_for_class(db, &class_id).await?;

    let mut should: BTreeMap<String, usize> = class_rules
        .iter()
        .map(|rule| (rule.title_id.clone(), 0))
        .collect();
    for student in &roster {
        for title_id in rules::effective_titles(&class_rules, student) {
            *should.entry(title_id).or_insert(0) += 1;
        }
    }

    let ids: Vec<String> = roster.iter().map(|s| s.student_id.clone()).collect();
    let held = copies_held_by(db, &ids).await?;
    let is = count_titles(&held);

    let fallback: BTreeMap<String, String> = class_rules
        .into_iter()
        .map(|rule| (rule.title_id, rule.subject))
        .collect();

    debug!(
        "Reconciling class {class_id}: {} students, {} copies held",
        roster.len(),
        held.len()
    );
    build_rows(db, &should, &is, &fallback).await
}

/// Soll/Ist per title for one student. `cnt_should` is 0 or 1.
#[instrument(skip(db))]
pub async fn student_reconciliation(
    db: &DatabaseConnection,
    student_id: &str,
) -> Result<Vec<ReconciliationRow>> {
    let student = people::require_student(db, student_id).await?;
    let class_rules = rules::rules_for_class(db, &student.class_id).await?;

    let should: BTreeMap<String, usize> = rules::effective_titles(&class_rules, &student)
        .into_iter()
        .map(|title_id| (title_id, 1))
        .collect();
    let held = copies_held_by(db, std::slice::from_ref(&student.student_id)).await?;
    let is = count_titles(&held);

    let fallback: BTreeMap<String, String> = class_rules
        .into_iter()
        .map(|rule| (rule.title_id, rule.subject))
        .collect();
    build_rows(db, &should, &is, &fallback).await
}

/// Ids of students of the roster holding at least one copy of the title.
async fn holders_of_title<C>(
    db: &C,
    roster: &[student::Model],
    title_id: &str,
) -> Result<HashSet<String>>
where
    C: ConnectionTrait,
{
    let ids: Vec<String> = roster.iter().map(|s| s.student_id.clone()).collect();
    Ok(copies_held_by(db, &ids)
        .await?
        .into_iter()
        .filter(|copy| copy.title_id == title_id)
        .filter_map(|copy| copy.holder_id)
        .collect())
}

async fn require_title_id<C>(db: &C, title_id: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    let title_id = normalize_code(title_id, "title id")?;
    Ok(catalog::require_title(db, &title_id).await?.title_id)
}

/// Active students of the class who require the title but hold no copy of it,
/// in ascending order.
///
/// # Errors
/// [`Error::NotFound`] for an unknown class or title. Title ids are case sensitive.
pub async fn missing_students_for_title(
    db: &DatabaseConnection,
    class_id: &str,
    title_id: &str,
) -> Result<Vec<String>> {
    let class_id = people::require_class(db, class_id).await?;
    let title_id = require_title_id(db, title_id).await?;
    let roster = people::students_in_class(db, &class_id, true).await?;
    let class_rules = rules::rules_for_class(db, &class_id).await?;
    let holders = holders_of_title(db, &roster, &title_id).await?;

    Ok(roster
        .into_iter()
        .filter(|s| rules::effective_titles(&class_rules, s).contains(&title_id))
        .filter(|s| !holders.contains(&s.student_id))
        .map(|s| s.student_id)
        .collect())
}

/// First active student of the class (ascending id) who holds no copy of the title.
///
/// # Errors
/// [`Error::NotFound`] for an unknown class or title, and when the roster is empty
/// or every student holds a copy.
pub async fn find_first_missing_student_id(
    db: &DatabaseConnection,
    class_id: &str,
    title_id: &str,
) -> Result<String> {
    let class_id = people::require_class(db, class_id).await?;
    let title_id = require_title_id(db, title_id).await?;
    let roster = people::students_in_class(db, &class_id, true).await?;
    let holders = holders_of_title(db, &roster, &title_id).await?;

    roster
        .into_iter()
        .map(|s| s.student_id)
        .find(|id| !holders.contains(id))
        .ok_or_else(|| {
            Error::not_found("student without copy", format!("{class_id}/{title_id}"))
        })
}

/// Assigns the scanned copy to the first student of the class still missing its title.
///
/// # Errors
/// A validation error if the copy belongs to another title, plus everything
/// [`find_first_missing_student_id`] and [`holder::assign_book`] return.
#[instrument(skip(db))]
pub async fn assign_next_missing(
    db: &DatabaseConnection,
    class_id: &str,
    title_id: &str,
    book_code: &str,
) -> Result<Confirmation> {
    let copy = catalog::require_book(db, book_code).await?;
    let title_id = normalize_code(title_id, "title id")?;
    if copy.title_id != title_id {
        return Err(Error::validation(format!(
            "book {} is a copy of {}, not {title_id}",
            copy.book_code, copy.title_id
        )));
    }

    let student_id = find_first_missing_student_id(db, class_id, &title_id).await?;
    let class_id = normalize_class_id(class_id)?;
    holder::assign_book(
        db,
        AssignBook::new(copy.book_code, Holder::Student(student_id))
            .with_note(format!("next missing in class {class_id}"))
            .expecting_revision(copy.revision),
    )
    .await
}
