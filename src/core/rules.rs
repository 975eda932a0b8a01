//! Required-title rules per class and their matching against students.
//!
//! A rule names a title a class needs, optionally narrowed by GU track, religion and
//! course. Rules are data; reconciliation evaluates them through [`effective_titles`].

use crate::{
    core::{
        catalog,
        model::{Religion, clean_note, normalize_class_id, normalize_code},
    },
    entities::{RequiredTitle, required_title, student},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{BTreeSet, HashSet};
use tracing::{info, instrument};

/// Input for a new rule.
#[derive(Debug, Clone)]
pub struct NewRule {
    /// Class the rule belongs to
    pub class_id: String,
    /// Required title
    pub title_id: String,
    /// Subject override; defaults to the title's subject
    pub subject: Option<String>,
    /// GU matcher
    pub applies_to_gu: Option<bool>,
    /// Religion matcher
    pub religion: Option<Religion>,
    /// Course matcher
    pub course: Option<String>,
}

impl NewRule {
    /// A rule that applies to every student of the class.
    pub fn new(class_id: impl Into<String>, title_id: impl Into<String>) -> Self {
        Self {
            class_id: class_id.into(),
            title_id: title_id.into(),
            subject: None,
            applies_to_gu: None,
            religion: None,
            course: None,
        }
    }
}

/// How [`copy_rules`] treats rules already present in the target class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMode {
    /// Skip rules whose title and matchers already exist in the target
    #[default]
    Merge,
    /// Insert every source rule, duplicates included
    Append,
}

/// Result of [`copy_rules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Rules written to the target class
    pub inserted: usize,
    /// Rules skipped because an identical one existed
    pub skipped: usize,
}

fn course_matches(rule_course: &str, student_course: Option<&str>) -> bool {
    student_course.is_some_and(|c| c.trim().eq_ignore_ascii_case(rule_course.trim()))
}

/// Whether every non-null matcher of the rule equals the student's attribute.
#[must_use]
pub fn rule_matches(rule: &required_title::Model, student: &student::Model) -> bool {
    if rule.applies_to_gu.is_some_and(|gu| gu != student.is_gu) {
        return false;
    }
    if rule
        .religion
        .as_deref()
        .is_some_and(|religion| student.religion.as_deref() != Some(religion))
    {
        return false;
    }
    rule.course
        .as_deref()
        .is_none_or(|course| course_matches(course, student.course.as_deref()))
}

/// Set of title ids the student must hold. Duplicate rules collapse.
pub fn effective_titles<'a, I>(rules: I, student: &student::Model) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a required_title::Model>,
{
    rules
        .into_iter()
        .filter(|rule| rule_matches(rule, student))
        .map(|rule| rule.title_id.clone())
        .collect()
}

/// Rules of a class ordered by subject and title.
pub async fn rules_for_class<C>(db: &C, class_id: &str) -> Result<Vec<required_title::Model>>
where
    C: ConnectionTrait,
{
    let class_id = normalize_class_id(class_id)?;
    RequiredTitle::find()
        .filter(required_title::Column::ClassId.eq(class_id))
        .order_by_asc(required_title::Column::Subject)
        .order_by_asc(required_title::Column::TitleId)
        .order_by_asc(required_title::Column::ReqId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a rule. The title must exist.
#[instrument(skip(db, rule), fields(class_id = %rule.class_id, title_id = %rule.title_id))]
pub async fn add_rule(db: &DatabaseConnection, rule: NewRule) -> Result<required_title::Model> {
    let class_id = normalize_class_id(&rule.class_id)?;
    let title_id = normalize_code(&rule.title_id, "title id")?;
    let title = catalog::require_title(db, &title_id).await?;
    let subject = clean_note(rule.subject).unwrap_or(title.subject);

    let model = required_title::ActiveModel {
        class_id: Set(class_id),
        title_id: Set(title.title_id),
        subject: Set(subject),
        applies_to_gu: Set(rule.applies_to_gu),
        religion: Set(rule.religion.map(|r| r.as_str().to_string())),
        course: Set(clean_note(rule.course)),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Added rule {} for class {}", model.req_id, model.class_id);
    Ok(model)
}

/// Deletes a rule by id and returns it.
pub async fn remove_rule(db: &DatabaseConnection, req_id: i64) -> Result<required_title::Model> {
    let rule = RequiredTitle::find_by_id(req_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("rule", req_id.to_string()))?;
    RequiredTitle::delete_by_id(req_id).exec(db).await?;
    info!("Removed rule {} from class {}", rule.req_id, rule.class_id);
    Ok(rule)
}

type RuleKey = (String, Option<bool>, Option<String>, Option<String>);

fn rule_key(rule: &required_title::Model) -> RuleKey {
    (
        rule.title_id.clone(),
        rule.applies_to_gu,
        rule.religion.clone(),
        rule.course.as_ref().map(|c| c.trim().to_lowercase()),
    )
}

/// Copies the rules of one class to another in one transaction.
#[instrument(skip(db))]
pub async fn copy_rules(
    db: &DatabaseConnection,
    from_class: &str,
    to_class: &str,
    mode: CopyMode,
) -> Result<CopyOutcome> {
    let from = normalize_class_id(from_class)?;
    let to = normalize_class_id(to_class)?;
    if from == to {
        return Err(Error::validation(format!(
            "cannot copy rules of class {from} onto itself"
        )));
    }

    let txn = db.begin().await?;
    let source = rules_for_class(&txn, &from).await?;
    if source.is_empty() {
        return Err(Error::not_found("rules for class", from));
    }

    let mut existing: HashSet<RuleKey> = match mode {
        CopyMode::Merge => rules_for_class(&txn, &to)
            .await?
            .iter()
            .map(rule_key)
            .collect(),
        CopyMode::Append => HashSet::new(),
    };

    let now = chrono::Utc::now().naive_utc();
    let mut outcome = CopyOutcome {
        inserted: 0,
        skipped: 0,
    };
    for rule in source {
        if mode == CopyMode::Merge && !existing.insert(rule_key(&rule)) {
            outcome.skipped += 1;
            continue;
        }
        required_title::ActiveModel {
            class_id: Set(to.clone()),
            title_id: Set(rule.title_id),
            subject: Set(rule.subject),
            applies_to_gu: Set(rule.applies_to_gu),
            religion: Set(rule.religion),
            course: Set(rule.course),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        outcome.inserted += 1;
    }
    txn.commit().await?;

    info!(
        "Copied rules {from} -> {to}: {} inserted, {} skipped",
        outcome.inserted, outcome.skipped
    );
    Ok(outcome)
}

/// Phrase the operator must type to clear a class's rules.
#[must_use]
pub fn clear_confirmation_phrase(class_id: &str) -> String {
    format!("DELETE {}", class_id.trim().to_lowercase())
}

/// Deletes all rules of a class. Returns the number of deleted rules.
#[instrument(skip(db))]
pub async fn clear_rules(db: &DatabaseConnection, class_id: &str, confirmation: &str) -> Result<u64> {
    let class_id = normalize_class_id(class_id)?;
    let expected = clear_confirmation_phrase(&class_id);
    if !confirmation.trim().eq_ignore_ascii_case(&expected) {
        return Err(Error::ConfirmationRequired { expected });
    }

    let result = RequiredTitle::delete_many()
        .filter(required_title::Column::ClassId.eq(&class_id))
        .exec(db)
        .await?;
    info!("Cleared {} rules of class {class_id}", result.rows_affected);
    Ok(result.rows_affected)
}
