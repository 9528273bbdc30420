//! `orgguard-core`: identifiers and domain errors shared by the authorization crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{CorrelationId, OrgId, UserId};
