//! Core use-case services.
//!
//! # Responsibility
//! - Own the unit of work (transaction) for each boundary operation.
//! - Keep the CLI and other front ends decoupled from storage details.

pub mod index_service;
pub mod query_service;
