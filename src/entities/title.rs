//! Title entity - Reference data for a textbook title.
//!
//! A title is what a class requires (e.g. "Biologie 7"); the physical copies of a
//! title live in the `books` table. Titles are edited only by administrators.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Title database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "titles")]
pub struct Model {
    /// Administrator-chosen identifier (e.g. `"BIO_7"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub title_id: String,
    /// School subject the title belongs to
    pub subject: String,
    /// Display name
    pub title_name: String,
    /// ISBN, if known
    pub isbn: Option<String>,
    /// Replacement price, rounded to cents
    pub price: f64,
    /// When the title was first registered
    pub created_at: DateTime,
    /// When the title was last edited
    pub updated_at: DateTime,
}

/// Defines relationships between Title and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One title has many physical copies
    #[sea_orm(has_many = "super::book::Entity")]
    Books,
    /// One title is named by many required-title rules
    #[sea_orm(has_many = "super::required_title::Entity")]
    RequiredTitles,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Books.def()
    }
}

impl Related<super::required_title::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequiredTitles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
