//! Required title entity - A rule stating which students of a class need a title.
//!
//! Each of the three matchers is optional; `None` means "applies to everyone".
//! A rule applies to a student iff every non-null matcher equals the student's value.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Required-title rule database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "required_titles")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub req_id: i64,
    /// Normalized class id the rule belongs to
    pub class_id: String,
    /// Title that is required
    pub title_id: String,
    /// Subject, copied from the title when the rule is created
    pub subject: String,
    /// `Some(true)` = GU only, `Some(false)` = regular track only, `None` = all
    pub applies_to_gu: Option<bool>,
    /// Religion matcher, `None` = all
    pub religion: Option<String>,
    /// Course matcher, `None` = all
    pub course: Option<String>,
    /// When the rule was created
    pub created_at: DateTime,
}

/// Defines relationships between rules and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each rule names one title
    #[sea_orm(
        belongs_to = "super::title::Entity",
        from = "Column::TitleId",
        to = "super::title::Column::TitleId"
    )]
    Title,
}

impl Related<super::title::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Title.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
