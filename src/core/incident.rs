//! Incident ledger - lost, damaged and missing books charged to a student.
//!
//! Incidents are append-only and never move a copy: returning or reassigning the
//! book is a separate step in the holder registry. The charged amount is resolved
//! from the title price or the configured damage fees unless the operator gives one.

use crate::{
    config::school::FeeConfig,
    core::{
        catalog,
        model::{IssueType, PaymentMode, clean_note, normalize_code, round_cents, validate_amount},
        people,
    },
    entities::{Incident, incident, title},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use std::fmt;
use tracing::{info, instrument};

/// Fixed-fee damage category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageTier {
    /// Small damage (default fee 5.00)
    Minor,
    /// Larger damage (default fee 10.00)
    Major,
}

/// How the amount of an incident is determined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Charge {
    /// The title's replacement price
    FullReplacement,
    /// A configured fixed fee
    Tier(DamageTier),
    /// An amount given by the operator
    Custom(f64),
    /// Nothing is charged
    Waived,
}

impl Charge {
    /// Stored value of `condition_detail`.
    #[must_use]
    pub const fn detail(self) -> &'static str {
        match self {
            Self::FullReplacement => "replace_full",
            Self::Tier(DamageTier::Minor) => "damage_minor",
            Self::Tier(DamageTier::Major) => "damage_major",
            Self::Custom(_) => "damage_custom",
            Self::Waived => "waived",
        }
    }
}

/// Stored `condition_detail` when no amount could be resolved.
pub const UNSPECIFIED_DETAIL: &str = "unspecified";

/// One line of an incident report.
#[derive(Debug, Clone)]
pub struct IncidentLine {
    /// Scanned book code, if the copy is at hand
    pub scan: Option<String>,
    /// What happened
    pub issue_type: IssueType,
    /// Explicit charge; `None` applies the default for the issue type
    pub charge: Option<Charge>,
    /// Operator note
    pub note: Option<String>,
}

impl IncidentLine {
    /// A line for a scanned copy with the default charge.
    pub fn for_book(scan: impl Into<String>, issue_type: IssueType) -> Self {
        Self {
            scan: Some(scan.into()),
            issue_type,
            charge: None,
            note: None,
        }
    }
}

/// All incidents recorded by one [`report_incidents`] call.
#[derive(Debug, Clone)]
pub struct IncidentReceipt {
    /// Student the incidents are charged to
    pub student_id: String,
    /// Created records in input order
    pub incidents: Vec<incident::Model>,
    /// Sum of all determined amounts
    pub total: f64,
}

impl fmt::Display for IncidentReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Receipt for student {}", self.student_id)?;
        for record in &self.incidents {
            let amount = record
                .amount
                .map_or_else(|| "open".to_string(), |a| format!("{a:.2}"));
            writeln!(
                f,
                "- {} {} ({}): {amount}",
                record.issue_type,
                record.book_code.as_deref().unwrap_or("unknown copy"),
                record.condition_detail
            )?;
        }
        write!(f, "Total: {:.2}", self.total)
    }
}

/// Resolves the amount and `condition_detail` for an incident.
///
/// Without an explicit charge, lost and missing copies default to full replacement
/// and damage stays open. Full replacement without a known title also stays open.
pub fn resolve_amount(
    issue_type: IssueType,
    charge: Option<Charge>,
    title: Option<&title::Model>,
    fees: &FeeConfig,
) -> Result<(Option<f64>, &'static str)> {
    let charge = match (charge, issue_type) {
        (Some(charge), _) => charge,
        (None, IssueType::Lost | IssueType::Missing) => Charge::FullReplacement,
        (None, IssueType::Damaged) => return Ok((None, UNSPECIFIED_DETAIL)),
    };

    let amount = match charge {
        Charge::FullReplacement => match title {
            Some(title) => Some(round_cents(title.price)),
            None => return Ok((None, UNSPECIFIED_DETAIL)),
        },
        Charge::Tier(DamageTier::Minor) => Some(validate_amount(fees.minor_damage)?),
        Charge::Tier(DamageTier::Major) => Some(validate_amount(fees.major_damage)?),
        Charge::Custom(amount) => Some(validate_amount(amount)?),
        Charge::Waived => Some(0.0),
    };
    Ok((amount, charge.detail()))
}

async fn insert_incident<C>(
    db: &C,
    fees: &FeeConfig,
    student_id: &str,
    line: IncidentLine,
    payment_mode: PaymentMode,
) -> Result<incident::Model>
where
    C: ConnectionTrait,
{
    let copy = match line.scan.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(scan) => Some(catalog::require_book(db, scan).await?),
        None => None,
    };
    let title = match &copy {
        Some(copy) => catalog::get_title(db, &copy.title_id).await?,
        None => None,
    };
    let (amount, detail) = resolve_amount(line.issue_type, line.charge, title.as_ref(), fees)?;

    incident::ActiveModel {
        student_id: Set(student_id.to_string()),
        book_code: Set(copy.as_ref().map(|c| c.book_code.clone())),
        title_id: Set(copy.map(|c| c.title_id)),
        issue_type: Set(line.issue_type.as_str().to_string()),
        condition_detail: Set(detail.to_string()),
        amount: Set(amount),
        payment_mode: Set(payment_mode.as_str().to_string()),
        note: Set(clean_note(line.note)),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Records one incident for a student.
///
/// # Errors
/// [`Error::NotFound`] for an unknown student or an unresolvable scan,
/// [`Error::InvalidAmount`] for a negative or non-finite custom amount.
#[instrument(skip(db, fees, line))]
pub async fn report_issue(
    db: &DatabaseConnection,
    fees: &FeeConfig,
    student_id: &str,
    line: IncidentLine,
    payment_mode: PaymentMode,
) -> Result<incident::Model> {
    let student = people::require_student(db, student_id).await?;
    let record = insert_incident(db, fees, &student.student_id, line, payment_mode).await?;
    info!(
        "Recorded {} incident {} for student {}",
        record.issue_type, record.id, record.student_id
    );
    Ok(record)
}

/// Records several incidents for one student in one transaction.
///
/// Any failing line rolls back the whole batch.
#[instrument(skip(db, fees, lines), fields(lines = lines.len()))]
pub async fn report_incidents(
    db: &DatabaseConnection,
    fees: &FeeConfig,
    student_id: &str,
    lines: Vec<IncidentLine>,
    payment_mode: PaymentMode,
) -> Result<IncidentReceipt> {
    if lines.is_empty() {
        return Err(Error::validation("an incident report needs at least one line"));
    }

    let txn = db.begin().await?;
    let student = people::require_student(&txn, student_id).await?;
    let mut incidents = Vec::with_capacity(lines.len());
    for line in lines {
        incidents.push(insert_incident(&txn, fees, &student.student_id, line, payment_mode).await?);
    }
    txn.commit().await?;

    let total = round_cents(incidents.iter().filter_map(|i| i.amount).sum());
    info!(
        "Recorded {} incidents for student {} totalling {total:.2}",
        incidents.len(),
        student.student_id
    );
    Ok(IncidentReceipt {
        student_id: student.student_id,
        incidents,
        total,
    })
}

/// All incidents of a student, oldest first.
pub async fn incidents_for_student(
    db: &DatabaseConnection,
    student_id: &str,
) -> Result<Vec<incident::Model>> {
    let student_id = normalize_code(student_id, "student id")?;
    Incident::find()
        .filter(incident::Column::StudentId.eq(student_id))
        .order_by_asc(incident::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The most recent incidents, newest first.
pub async fn recent_incidents(db: &DatabaseConnection, limit: u64) -> Result<Vec<incident::Model>> {
    Incident::find()
        .order_by_desc(incident::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::{holder, model::Holder},
        test_utils::*,
    };

    #[tokio::test]
    async fn test_lost_defaults_to_title_price() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 24.95, &["B1"]).await?;
        create_test_student(&db, "S1", "7b").await?;

        let record = report_issue(
            &db,
            &FeeConfig::default(),
            "S1",
            IncidentLine::for_book(" B1 ", IssueType::Lost),
            PaymentMode::Cash,
        )
        .await?;

        assert_eq!(record.amount, Some(24.95));
        assert_eq!(record.condition_detail, "replace_full");
        assert_eq!(record.title_id.as_deref(), Some("BIO_7"));
        assert_eq!(record.book_code.as_deref(), Some("B1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_damage_tiers_use_configured_fees() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 24.95, &["B1", "B2"]).await?;
        create_test_student(&db, "S1", "7b").await?;
        let fees = FeeConfig::default();

        let mut minor = IncidentLine::for_book("B1", IssueType::Damaged);
        minor.charge = Some(Charge::Tier(DamageTier::Minor));
        let record = report_issue(&db, &fees, "S1", minor, PaymentMode::Unknown).await?;
        assert_eq!(record.amount, Some(5.0));
        assert_eq!(record.condition_detail, "damage_minor");

        let custom_fees = FeeConfig {
            minor_damage: 5.0,
            major_damage: 12.5,
        };
        let mut major = IncidentLine::for_book("B2", IssueType::Damaged);
        major.charge = Some(Charge::Tier(DamageTier::Major));
        let record = report_issue(&db, &custom_fees, "S1", major, PaymentMode::Transfer).await?;
        assert_eq!(record.amount, Some(12.5));
        Ok(())
    }

    #[test]
    fn test_resolve_amount_defaults() {
        let fees = FeeConfig::default();
        assert_eq!(
            resolve_amount(IssueType::Damaged, None, None, &fees).unwrap(),
            (None, "unspecified")
        );
        assert_eq!(
            resolve_amount(IssueType::Missing, None, None, &fees).unwrap(),
            (None, "unspecified")
        );
        assert_eq!(
            resolve_amount(IssueType::Damaged, Some(Charge::Waived), None, &fees).unwrap(),
            (Some(0.0), "waived")
        );
        assert_eq!(
            resolve_amount(IssueType::Damaged, Some(Charge::Custom(7.499)), None, &fees).unwrap(),
            (Some(7.5), "damage_custom")
        );
        assert!(matches!(
            resolve_amount(IssueType::Damaged, Some(Charge::Custom(-2.0)), None, &fees),
            Err(Error::InvalidAmount { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_student_or_scan() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "S1", "7b").await?;
        let fees = FeeConfig::default();

        let result = report_issue(
            &db,
            &fees,
            "NOPE",
            IncidentLine::for_book("B1", IssueType::Lost),
            PaymentMode::Cash,
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound { entity: "student", .. })));

        let result = report_issue(
            &db,
            &fees,
            "S1",
            IncidentLine::for_book("B404", IssueType::Lost),
            PaymentMode::Cash,
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound { entity: "book", .. })));

        // Without a scan the incident is recorded with no copy
        let line = IncidentLine {
            scan: None,
            issue_type: IssueType::Damaged,
            charge: Some(Charge::Custom(3.0)),
            note: Some("found without label".to_string()),
        };
        let record = report_issue(&db, &fees, "S1", line, PaymentMode::Cash).await?;
        assert!(record.book_code.is_none());
        assert_eq!(record.amount, Some(3.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_incident_does_not_change_holder() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1"]).await?;
        create_test_student(&db, "S1", "7b").await?;
        assign_to_student(&db, "B1", "S1").await?;

        report_issue(
            &db,
            &FeeConfig::default(),
            "S1",
            IncidentLine::for_book("B1", IssueType::Lost),
            PaymentMode::Cash,
        )
        .await?;

        let held = holder::list_by_holder(&db, &Holder::Student("S1".to_string())).await?;
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].revision, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_batch_receipt_and_rollback() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_title_with_copies(&db, "BIO_7", 20.0, &["B1", "B2"]).await?;
        create_test_student(&db, "S1", "7b").await?;
        let fees = FeeConfig::default();

        let mut damaged = IncidentLine::for_book("B2", IssueType::Damaged);
        damaged.charge = Some(Charge::Tier(DamageTier::Major));
        let receipt = report_incidents(
            &db,
            &fees,
            "S1",
            vec![IncidentLine::for_book("B1", IssueType::Lost), damaged],
            PaymentMode::Cash,
        )
        .await?;
        assert_eq!(receipt.incidents.len(), 2);
        assert_eq!(receipt.total, 30.0);
        assert!(receipt.to_string().ends_with("Total: 30.00"));

        let failing = report_incidents(
            &db,
            &fees,
            "S1",
            vec![
                IncidentLine::for_book("B1", IssueType::Lost),
                IncidentLine::for_book("B404", IssueType::Lost),
            ],
            PaymentMode::Cash,
        )
        .await;
        assert!(matches!(failing, Err(Error::NotFound { .. })));
        assert_eq!(incidents_for_student(&db, "S1").await?.len(), 2);
        assert_eq!(incidents_for_student(&db, " S 1 ").await?.len(), 2);

        let recent = recent_incidents(&db, 1).await?;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].condition_detail, "damage_major");
        Ok(())
    }
}
