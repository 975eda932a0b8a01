/// Database configuration and connection management
pub mod database;

/// School settings (fees, promotion table, seed catalog) loaded from config.toml
pub mod school;
