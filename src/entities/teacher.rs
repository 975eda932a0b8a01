//! Teacher entity - A staff member who can hold book copies.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Teacher database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "teachers")]
pub struct Model {
    /// Teacher code
    #[sea_orm(primary_key, auto_increment = false)]
    pub teacher_id: String,
    /// Inactive teachers cannot receive books
    pub active: bool,
    /// When the teacher was created
    pub created_at: DateTime,
}

/// `Teacher` has no declared relations; holders are referenced by `books.holder_id`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
