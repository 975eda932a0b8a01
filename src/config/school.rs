//! School settings loaded from config.toml
//!
//! Fees for damage tiers, the class promotion table, the student course rule and an
//! optional seed catalog of titles. Every section is optional; a missing file section
//! falls back to the defaults below.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Default confirmation phrase for committing a class promotion
pub const DEFAULT_PROMOTION_PHRASE: &str = "PROMOTE";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SchoolConfig {
    /// Fixed fees for damage tiers
    #[serde(default)]
    pub fees: FeeConfig,
    /// End-of-year promotion settings
    #[serde(default)]
    pub promotion: PromotionConfig,
    /// Student record rules
    #[serde(default)]
    pub students: StudentRules,
    /// Titles to register on startup if missing
    #[serde(default)]
    pub titles: Vec<TitleSeed>,
}

/// Fixed fees charged for partial damage
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct FeeConfig {
    /// Fee for minor damage
    #[serde(default = "default_minor_fee")]
    pub minor_damage: f64,
    /// Fee for major damage
    #[serde(default = "default_major_fee")]
    pub major_damage: f64,
}

const fn default_minor_fee() -> f64 {
    5.0
}

const fn default_major_fee() -> f64 {
    10.0
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            minor_damage: default_minor_fee(),
            major_damage: default_major_fee(),
        }
    }
}

/// Class promotion settings
#[derive(Debug, Deserialize, Clone)]
pub struct PromotionConfig {
    /// Phrase the operator must type to commit a promotion
    #[serde(default = "default_phrase")]
    pub confirmation_phrase: String,
    /// Old class id -> successor class id
    #[serde(default)]
    pub successors: BTreeMap<String, String>,
}

fn default_phrase() -> String {
    DEFAULT_PROMOTION_PHRASE.to_string()
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            confirmation_phrase: default_phrase(),
            successors: BTreeMap::new(),
        }
    }
}

/// Rules applied when creating or editing students
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct StudentRules {
    /// Lowest grade in which an elective course may be set; `None` disables the check
    #[serde(default)]
    pub course_min_grade: Option<u32>,
}

/// A title registered on startup when it does not exist yet
#[derive(Debug, Deserialize, Clone)]
pub struct TitleSeed {
    /// Title identifier
    pub title_id: String,
    /// Subject
    pub subject: String,
    /// Display name
    pub title_name: String,
    /// ISBN
    #[serde(default)]
    pub isbn: Option<String>,
    /// Replacement price
    pub price: f64,
}

/// Loads the school configuration from a TOML file.
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SchoolConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading school configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {path_ref:?}: {e}"),
    })
}

/// Loads the configuration named by `SCHOOLBOOK_CONFIG` (default `./config.toml`).
///
/// A missing file is not an error: the defaults are used and a warning is logged.
pub fn load_default_config() -> Result<SchoolConfig> {
    let path = std::env::var("SCHOOLBOOK_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        tracing::warn!("No configuration file at {path}, using defaults");
        return Ok(SchoolConfig::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [fees]
            minor_damage = 4.5
            major_damage = 12.0

            [promotion]
            confirmation_phrase = "HOCHSETZEN"

            [promotion.successors]
            "5a" = "6a"
            "6a" = "7a"

            [students]
            course_min_grade = 10

            [[titles]]
            title_id = "BIO_7"
            subject = "Biologie"
            title_name = "Natura 7"
            price = 24.95
        "#;

        let config: SchoolConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.fees.minor_damage, 4.5);
        assert_eq!(config.fees.major_damage, 12.0);
        assert_eq!(config.promotion.confirmation_phrase, "HOCHSETZEN");
        assert_eq!(config.promotion.successors.get("5a").unwrap(), "6a");
        assert_eq!(config.students.course_min_grade, Some(10));
        assert_eq!(config.titles.len(), 1);
        assert!(config.titles[0].isbn.is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: SchoolConfig = toml::from_str("").unwrap();
        assert_eq!(config.fees, FeeConfig::default());
        assert_eq!(config.fees.minor_damage, 5.0);
        assert_eq!(config.promotion.confirmation_phrase, DEFAULT_PROMOTION_PHRASE);
        assert!(config.promotion.successors.is_empty());
        assert!(config.students.course_min_grade.is_none());
    }
}
