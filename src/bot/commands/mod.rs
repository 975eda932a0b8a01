//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Copy assignment, storage and lookup commands
pub mod book;

/// General utility commands
pub mod general;

/// Incident reporting commands
pub mod incident;

/// Student and teacher commands
pub mod people;

/// Class promotion commands
pub mod promote;

/// Reconciliation commands
pub mod reconcile;

/// Required-title rule commands
pub mod rules;

/// Title catalog commands
pub mod title;

// Export commands
pub use book::*;
pub use general::*;
pub use incident::*;
pub use people::*;
pub use promote::*;
pub use reconcile::*;
pub use rules::*;
pub use title::*;
