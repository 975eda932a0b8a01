//! Assignment history entity - Append-only log of holder changes.
//!
//! One row is written for every holder change of a book copy, including the initial
//! placement into storage when the copy is registered.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Assignment history database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignment_history")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Copy whose holder changed
    pub book_code: String,
    /// Holder kind after the change
    pub holder_type: String,
    /// Holder id after the change, `None` for storage
    pub holder_id: Option<String>,
    /// Condition recorded with the change
    pub condition: String,
    /// Operator note
    pub note: Option<String>,
    /// Revision of the copy after the change
    pub revision: i64,
    /// When the change happened
    pub assigned_at: DateTime,
}

/// Defines relationships between history rows and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each history row belongs to one copy
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookCode",
        to = "super::book::Column::BookCode"
    )]
    Book,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
