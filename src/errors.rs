//! Unified error type for the lending system.
//!
//! Every core operation returns [`Result`]. Errors are terminal for the action that
//! triggered them and carry a message meant to be shown to the operator as-is.

use thiserror::Error;

/// All errors produced by the library and the bot layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced book, student, teacher, title, rule or class does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up (e.g. `"book"`)
        entity: &'static str,
        /// The identifier that did not resolve
        id: String,
    },

    /// Malformed or missing input.
    #[error("Invalid input: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// A money amount that is negative, NaN or infinite.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A concurrent modification was detected (stale revision).
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable reason
        message: String,
    },

    /// An irreversible operation was attempted without the typed confirmation phrase.
    #[error("Confirmation required: type exactly '{expected}'")]
    ConfirmationRequired {
        /// The phrase the operator has to type
        expected: String,
    },

    /// A stored value could not be interpreted.
    #[error("Malformed record in {table}: {message}")]
    MalformedRecord {
        /// Table holding the bad value
        table: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable reason
        message: String,
    },

    /// The backing store failed; the message is surfaced verbatim.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable is missing.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Formatting a reply failed.
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise framework error.
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
