//! Student entity - A borrower identified only by an opaque code.
//!
//! No personal names are stored. `class_id` is kept normalized (trimmed, lower-case).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Opaque student code (usually scanned from an id card)
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: String,
    /// Normalized class id (e.g. `"7b"`)
    pub class_id: String,
    /// General-education (GU) track flag
    pub is_gu: bool,
    /// Religion class: `"EV"`, `"RK"`, `"PP"` or `None`
    pub religion: Option<String>,
    /// Elective course, only meaningful in upper grades
    pub course: Option<String>,
    /// Inactive students are excluded from rosters
    pub active: bool,
    /// When the student was created
    pub created_at: DateTime,
    /// When the student was last modified
    pub updated_at: DateTime,
}

/// `Student` has no declared relations; holders are referenced by `books.holder_id`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
