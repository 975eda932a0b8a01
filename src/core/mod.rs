//! Core business logic - framework-agnostic operations on the lending database.
//!
//! Every function takes a `SeaORM` connection and returns [`crate::errors::Result`];
//! the bot layer only parses input and formats replies.

/// Titles, copy registration and the location summary
pub mod catalog;
/// Current holder of each copy and the assignment history
pub mod holder;
/// Lost and damaged book charges
pub mod incident;
/// Shared domain types and normalization helpers
pub mod model;
/// Students and teachers
pub mod people;
/// End-of-year class promotion
pub mod promotion;
/// Soll/Ist reconciliation per class and student
pub mod reconcile;
/// Required-title rules per class
pub mod rules;
