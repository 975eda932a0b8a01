//! Domain vocabulary shared by the core modules.
//!
//! Entities store these values as plain strings; this module owns the typed
//! versions, their string forms, and the normalization rules for class ids,
//! scanned codes and money amounts.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a string-backed enum with `as_str`, `Display` and `FromStr`.
///
/// Extra spellings accepted by `FromStr` can be listed after `|`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored string form.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_lowercase().as_str() {
                    $($text $(| $alias)* => Ok(Self::$variant),)+
                    other => Err(Error::validation(format!(
                        "unknown {} '{other}'", $label
                    ))),
                }
            }
        }
    };
}

string_enum! {
    /// Physical condition of a copy.
    Condition, "condition" {
        /// Like new
        Ok => "ok",
        /// Visibly used
        Used => "used" | "benutzt",
        /// Damaged
        Damaged => "damaged" | "kaputt",
    }
}

string_enum! {
    /// Lending status of a copy.
    CopyStatus, "status" {
        /// Available for lending
        Ok => "ok",
        /// In circulation
        Active => "active",
    }
}

string_enum! {
    /// Kind of incident.
    IssueType, "issue type" {
        /// Copy is lost
        Lost => "lost",
        /// Copy is damaged
        Damaged => "damaged",
        /// Copy was not returned
        Missing => "missing",
    }
}

string_enum! {
    /// How an incident amount is (to be) paid.
    PaymentMode, "payment mode" {
        /// Paid in cash
        Cash => "cash",
        /// Bank transfer or invoice
        Transfer => "transfer" | "invoice",
        /// Not paid or not known
        Unknown => "unknown" | "none",
    }
}

/// Religion class of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Religion {
    /// Protestant
    #[serde(rename = "EV")]
    Ev,
    /// Catholic
    #[serde(rename = "RK")]
    Rk,
    /// Ethics (Praktische Philosophie)
    #[serde(rename = "PP")]
    Pp,
}

impl Religion {
    /// The stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ev => "EV",
            Self::Rk => "RK",
            Self::Pp => "PP",
        }
    }
}

impl fmt::Display for Religion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Religion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "EV" => Ok(Self::Ev),
            "RK" => Ok(Self::Rk),
            "PP" => Ok(Self::Pp),
            other => Err(Error::validation(format!(
                "unknown religion '{other}' (expected EV, RK or PP)"
            ))),
        }
    }
}

/// The current possessor of a copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Holder {
    /// A student, by student id
    Student(String),
    /// A teacher, by teacher id
    Teacher(String),
    /// The school's book storage
    Storage,
}

impl Holder {
    /// Stored value of `holder_type`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Student(_) => "student",
            Self::Teacher(_) => "teacher",
            Self::Storage => "storage",
        }
    }

    /// Stored value of `holder_id`.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Student(id) | Self::Teacher(id) => Some(id.as_str()),
            Self::Storage => None,
        }
    }

    /// Rebuilds a holder from its stored columns.
    pub fn from_columns(kind: &str, id: Option<&str>) -> Result<Self> {
        match (kind, id) {
            ("student", Some(id)) => Ok(Self::Student(id.to_string())),
            ("teacher", Some(id)) => Ok(Self::Teacher(id.to_string())),
            ("storage", None) => Ok(Self::Storage),
            _ => Err(Error::MalformedRecord {
                table: "books",
                message: format!("holder_type '{kind}' with holder_id {id:?}"),
            }),
        }
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student(id) => write!(f, "student {id}"),
            Self::Teacher(id) => write!(f, "teacher {id}"),
            Self::Storage => f.write_str("storage"),
        }
    }
}

/// Parses a value read back from the database, reporting failures as malformed data.
pub fn parse_stored<T>(table: &'static str, value: &str) -> Result<T>
where
    T: FromStr<Err = Error>,
{
    value.parse().map_err(|e: Error| Error::MalformedRecord {
        table,
        message: e.to_string(),
    })
}

/// Normalizes a class id: trimmed and lower-cased, so `" 5A "` and `"5a"` match.
pub fn normalize_class_id(raw: &str) -> Result<String> {
    let class_id = raw.trim().to_lowercase();
    if class_id.is_empty() {
        return Err(Error::validation("class id cannot be empty"));
    }
    Ok(class_id)
}

/// Normalizes a scanned or typed code (book, student, teacher, title).
///
/// Scanners sometimes emit stray whitespace, so all whitespace is removed.
pub fn normalize_code(raw: &str, what: &str) -> Result<String> {
    let code: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if code.is_empty() {
        return Err(Error::validation(format!("{what} cannot be empty")));
    }
    Ok(code)
}

/// Trims an optional free-text field, mapping blank input to `None`.
#[must_use]
pub fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// The grade encoded in the leading digits of a class id (`"10b"` -> 10).
#[must_use]
pub fn grade_of(class_id: &str) -> Option<u32> {
    let digits: String = class_id
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Rounds an amount to cents.
#[must_use]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Validates a money amount (finite, non-negative) and rounds it to cents.
pub fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(round_cents(amount))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_class_id_normalization() {
        assert_eq!(normalize_class_id("5a").unwrap(), "5a");
        assert_eq!(normalize_class_id("5A").unwrap(), "5a");
        assert_eq!(normalize_class_id(" 5a ").unwrap(), "5a");
        assert!(matches!(
            normalize_class_id("   "),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_code_normalization_strips_whitespace() {
        assert_eq!(normalize_code(" B-0001\n", "book code").unwrap(), "B-0001");
        assert_eq!(normalize_code("B 0001", "book code").unwrap(), "B0001");
        assert!(normalize_code("", "book code").is_err());
    }

    #[test]
    fn test_holder_columns() {
        let holder = Holder::Student("S0001".to_string());
        assert_eq!(holder.kind(), "student");
        assert_eq!(holder.id(), Some("S0001"));
        assert_eq!(
            Holder::from_columns("student", Some("S0001")).unwrap(),
            holder
        );
        assert_eq!(Holder::from_columns("storage", None).unwrap(), Holder::Storage);
        assert!(matches!(
            Holder::from_columns("storage", Some("x")),
            Err(Error::MalformedRecord { .. })
        ));
        assert!(Holder::from_columns("locker", None).is_err());
    }

    #[test]
    fn test_enum_aliases() {
        assert_eq!("invoice".parse::<PaymentMode>().unwrap(), PaymentMode::Transfer);
        assert_eq!("none".parse::<PaymentMode>().unwrap(), PaymentMode::Unknown);
        assert_eq!("KAPUTT".parse::<Condition>().unwrap(), Condition::Damaged);
        assert_eq!("rk".parse::<Religion>().unwrap(), Religion::Rk);
        assert!("stolen".parse::<IssueType>().is_err());
    }

    #[test]
    fn test_grade_of() {
        assert_eq!(grade_of("5a"), Some(5));
        assert_eq!(grade_of("10b"), Some(10));
        assert_eq!(grade_of("ef"), None);
    }

    #[test]
    fn test_amount_validation() {
        assert_eq!(validate_amount(12.345).unwrap(), 12.35);
        assert_eq!(validate_amount(0.0).unwrap(), 0.0);
        assert!(matches!(
            validate_amount(-1.0),
            Err(Error::InvalidAmount { amount: -1.0 })
        ));
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
    }
}
