//! Book entity - One physical copy of a title and its current holder.
//!
//! The current holder lives on the row itself (`holder_type` + `holder_id`), so a copy
//! can never have two holders at once. `revision` increases by one on every holder
//! change and is used as a compare-and-swap token by concurrent terminals.
//! Copies are never deleted; past holders are kept in `assignment_history`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Book copy database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    /// Canonical code printed on the copy's barcode label
    #[sea_orm(primary_key, auto_increment = false)]
    pub book_code: String,
    /// Title this copy belongs to
    pub title_id: String,
    /// Lending status: `"ok"` or `"active"`
    pub status: String,
    /// Physical condition: `"ok"`, `"used"` or `"damaged"`
    pub condition: String,
    /// Kind of current holder: `"student"`, `"teacher"` or `"storage"`
    pub holder_type: String,
    /// Student or teacher id of the current holder, `None` for storage
    pub holder_id: Option<String>,
    /// Monotonic revision, bumped on every holder change
    pub revision: i64,
    /// When the copy was last changed
    pub updated_at: DateTime,
}

/// Defines relationships between Book and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each copy belongs to one title
    #[sea_orm(
        belongs_to = "super::title::Entity",
        from = "Column::TitleId",
        to = "super::title::Column::TitleId"
    )]
    Title,
    /// One copy has many history rows
    #[sea_orm(has_many = "super::assignment_history::Entity")]
    History,
}

impl Related<super::title::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Title.def()
    }
}

impl Related<super::assignment_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
