//! CLI command handlers.

pub mod build;
pub mod doctor;
pub mod show;
