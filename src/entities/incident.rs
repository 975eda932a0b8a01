//! Incident entity - Append-only record of a lost or damaged book.
//!
//! Incidents are never updated after creation. Recording an incident does not change
//! who holds the copy.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Incident database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incidents")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student the incident is charged to
    pub student_id: String,
    /// Affected copy, `None` when the copy could not be identified
    pub book_code: Option<String>,
    /// Title of the affected copy, kept for reporting
    pub title_id: Option<String>,
    /// `"lost"`, `"damaged"` or `"missing"`
    pub issue_type: String,
    /// How the amount was derived (e.g. `"replace_full"`, `"damage_minor"`)
    pub condition_detail: String,
    /// Amount charged, `None` when not yet determined
    pub amount: Option<f64>,
    /// `"cash"`, `"transfer"` or `"unknown"`
    pub payment_mode: String,
    /// Operator note
    pub note: Option<String>,
    /// When the incident was recorded
    pub created_at: DateTime,
}

/// `Incident` has no declared relations; `book_code` and `student_id` are kept as recorded
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
