//! End-of-year class promotion.
//!
//! Every active student of a class with a configured successor moves to that
//! successor. The plan is computed from one snapshot of the student table and
//! applied per student id, so chained mappings (`5a -> 6a`, `6a -> 7a`) move each
//! student exactly once. The commit date is stored in the `system_state` table.

use crate::{
    config::school::PromotionConfig,
    core::model::normalize_class_id,
    entities::{Student, SystemState, student, system_state},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::collections::BTreeMap;
use tracing::{info, instrument};

const LAST_PROMOTION_KEY: &str = "last_class_promotion";

/// Decides which class follows a given class.
pub trait PromotionPolicy: Send + Sync {
    /// Successor of a normalized class id, or `None` to leave the class untouched.
    fn successor(&self, class_id: &str) -> Option<String>;
}

/// Promotion policy backed by an explicit old -> new table.
#[derive(Debug, Clone, Default)]
pub struct SuccessorTable {
    successors: BTreeMap<String, String>,
}

impl SuccessorTable {
    /// Builds the table from `[promotion.successors]`, normalizing both sides.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if an entry has an empty class id.
    pub fn from_config(config: &PromotionConfig) -> Result<Self> {
        let mut successors = BTreeMap::new();
        for (old, new) in &config.successors {
            let (Ok(old_id), Ok(new_id)) = (normalize_class_id(old), normalize_class_id(new)) else {
                return Err(Error::Config {
                    message: format!("invalid promotion entry '{old}' = '{new}'"),
                });
            };
            successors.insert(old_id, new_id);
        }
        Ok(Self { successors })
    }

    /// Number of configured mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.successors.len()
    }

    /// Whether no mapping is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }
}

impl PromotionPolicy for SuccessorTable {
    fn successor(&self, class_id: &str) -> Option<String> {
        self.successors.get(class_id).cloned()
    }
}

/// One class move of a promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionRow {
    /// Class before promotion
    pub old_class_id: String,
    /// Class after promotion
    pub new_class_id: String,
    /// Active students moved
    pub student_count: usize,
}

/// Result of [`promote_classes`].
#[derive(Debug, Clone)]
pub struct PromotionReport {
    /// The applied (or previewed) moves, ordered by old class
    pub rows: Vec<PromotionRow>,
    /// `false` for a dry run
    pub committed: bool,
}

struct PlannedMove {
    row: PromotionRow,
    student_ids: Vec<String>,
}

async fn snapshot_plan<C, P>(db: &C, policy: &P) -> Result<Vec<PlannedMove>>
where
    C: ConnectionTrait,
    P: PromotionPolicy + ?Sized,
{
    let students = Student::find()
        .filter(student::Column::Active.eq(true))
        .order_by_asc(student::Column::ClassId)
        .order_by_asc(student::Column::StudentId)
        .all(db)
        .await?;

    let mut by_class: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for s in students {
        by_class.entry(s.class_id).or_default().push(s.student_id);
    }

    let mut plan = Vec::new();
    for (old_class_id, student_ids) in by_class {
        let Some(new_class_id) = policy.successor(&old_class_id) else {
            continue;
        };
        if new_class_id == old_class_id {
            continue;
        }
        plan.push(PlannedMove {
            row: PromotionRow {
                old_class_id,
                new_class_id,
                student_count: student_ids.len(),
            },
            student_ids,
        });
    }
    Ok(plan)
}

/// Computes the promotion without changing anything.
pub async fn plan_promotion<P>(db: &DatabaseConnection, policy: &P) -> Result<Vec<PromotionRow>>
where
    P: PromotionPolicy + ?Sized,
{
    Ok(snapshot_plan(db, policy)
        .await?
        .into_iter()
        .map(|planned| planned.row)
        .collect())
}

/// Previews (`dry_run`) or commits a class promotion.
///
/// Committing requires `confirmation` to equal `expected_phrase`. The committed
/// moves are exactly the ones a preview at the same moment would report.
///
/// # Errors
/// [`Error::ConfirmationRequired`] when committing without the phrase.
#[instrument(skip(db, policy, confirmation))]
pub async fn promote_classes<P>(
    db: &DatabaseConnection,
    policy: &P,
    dry_run: bool,
    confirmation: Option<&str>,
    expected_phrase: &str,
) -> Result<PromotionReport>
where
    P: PromotionPolicy + ?Sized,
{
    if dry_run {
        return Ok(PromotionReport {
            rows: plan_promotion(db, policy).await?,
            committed: false,
        });
    }

    if confirmation.map(str::trim) != Some(expected_phrase) {
        return Err(Error::ConfirmationRequired {
            expected: expected_phrase.to_string(),
        });
    }

    let txn = db.begin().await?;
    let plan = snapshot_plan(&txn, policy).await?;
    let now = Utc::now().naive_utc();

    for planned in &plan {
        Student::update_many()
            .col_expr(
                student::Column::ClassId,
                Expr::value(planned.row.new_class_id.clone()),
            )
            .col_expr(student::Column::UpdatedAt, Expr::value(now))
            .filter(student::Column::StudentId.is_in(planned.student_ids.iter().cloned()))
            .exec(&txn)
            .await?;
    }
    set_last_promotion_date(&txn, now.date()).await?;
    txn.commit().await?;

    let moved: usize = plan.iter().map(|p| p.row.student_count).sum();
    info!("Promoted {moved} students across {} classes", plan.len());
    Ok(PromotionReport {
        rows: plan.into_iter().map(|planned| planned.row).collect(),
        committed: true,
    })
}

/// Date of the last committed promotion, if any.
pub async fn last_promotion(db: &DatabaseConnection) -> Result<Option<NaiveDate>> {
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_PROMOTION_KEY))
        .one(db)
        .await?;

    state
        .map(|s| {
            NaiveDate::parse_from_str(&s.value, "%Y-%m-%d").map_err(|e| Error::MalformedRecord {
                table: "system_state",
                message: format!("{LAST_PROMOTION_KEY}: {e}"),
            })
        })
        .transpose()
}

async fn set_last_promotion_date<C>(db: &C, date: NaiveDate) -> Result<()>
where
    C: ConnectionTrait,
{
    let value = date.format("%Y-%m-%d").to_string();
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_PROMOTION_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut model: system_state::ActiveModel = state.into();
        model.value = Set(value);
        model.updated_at = Set(now);
        model.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(LAST_PROMOTION_KEY.to_string()),
            value: Set(value),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::people, test_utils::*};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn table(pairs: &[(&str, &str)]) -> SuccessorTable {
        let config = PromotionConfig {
            successors: pairs
                .iter()
                .map(|(old, new)| ((*old).to_string(), (*new).to_string()))
                .collect(),
            ..PromotionConfig::default()
        };
        SuccessorTable::from_config(&config).unwrap()
    }

    async fn class_of(db: &DatabaseConnection, student_id: &str) -> Result<String> {
        Ok(people::require_student(db, student_id).await?.class_id)
    }

    #[test]
    fn test_successor_table_normalizes() {
        let policy = table(&[(" 5A ", "6A"), ("6a", "7a")]);
        assert_eq!(policy.len(), 2);
        assert_eq!(policy.successor("5a").as_deref(), Some("6a"));
        assert_eq!(policy.successor("9z"), None);

        let bad = PromotionConfig {
            successors: BTreeMap::from([("5a".to_string(), " ".to_string())]),
            ..PromotionConfig::default()
        };
        assert!(matches!(
            SuccessorTable::from_config(&bad),
            Err(Error::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_commit_requires_phrase() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let policy = table(&[("5a", "6a")]);

        let result = promote_classes(&db, &policy, false, None, "PROMOTE").await;
        assert!(matches!(result, Err(Error::ConfirmationRequired { .. })));

        let result = promote_classes(&db, &policy, false, Some("promote"), "PROMOTE").await;
        assert!(matches!(result, Err(Error::ConfirmationRequired { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_dry_run_then_commit_matches_preview() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "S1", "5a").await?;
        create_test_student(&db, "S2", "5a").await?;
        create_test_student(&db, "S3", "8c").await?;
        let policy = table(&[("5a", "6a")]);

        let preview = promote_classes(&db, &policy, true, None, "PROMOTE").await?;
        assert!(!preview.committed);
        assert_eq!(
            preview.rows,
            vec![PromotionRow {
                old_class_id: "5a".to_string(),
                new_class_id: "6a".to_string(),
                student_count: 2,
            }]
        );
        assert_eq!(class_of(&db, "S1").await?, "5a");
        assert!(last_promotion(&db).await?.is_none());

        let committed = promote_classes(&db, &policy, false, Some(" PROMOTE "), "PROMOTE").await?;
        assert!(committed.committed);
        assert_eq!(committed.rows, preview.rows);
        assert_eq!(class_of(&db, "S1").await?, "6a");
        assert_eq!(class_of(&db, "S2").await?, "6a");
        assert_eq!(class_of(&db, "S3").await?, "8c");
        assert_eq!(last_promotion(&db).await?, Some(Utc::now().date_naive()));
        Ok(())
    }

    #[tokio::test]
    async fn test_chained_mapping_moves_once() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "S5", "5a").await?;
        create_test_student(&db, "S6", "6a").await?;
        let policy = table(&[("5a", "6a"), ("6a", "7a")]);

        let report = promote_classes(&db, &policy, false, Some("PROMOTE"), "PROMOTE").await?;
        assert_eq!(report.rows.len(), 2);
        assert_eq!(class_of(&db, "S5").await?, "6a");
        assert_eq!(class_of(&db, "S6").await?, "7a");
        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_students_stay() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "S1", "5a").await?;
        create_test_student(&db, "S2", "5a").await?;
        people::set_student_active(&db, "S2", false).await?;
        let policy = table(&[("5a", "6a")]);

        let report = promote_classes(&db, &policy, false, Some("PROMOTE"), "PROMOTE").await?;
        assert_eq!(report.rows[0].student_count, 1);
        assert_eq!(class_of(&db, "S1").await?, "6a");
        assert_eq!(class_of(&db, "S2").await?, "5a");
        Ok(())
    }
}
