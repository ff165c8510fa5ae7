//! Ingests yearly executive-directive spreadsheets with disagreeing layouts
//! and reconciles them into one schema-stable, queryable table.

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod process;
pub mod query;
pub mod store;
