//! Collaborator implementations for `orgguard-auth`.
//!
//! - `store`: membership and ABAC policy stores (in-memory, Postgres, caching)
//! - `audit`: audit sinks (outbox channel, tracing, in-memory)

pub mod audit;
pub mod store;

pub use audit::{AuditOutbox, InMemoryAuditSink, OutboxAuditSink, TracingAuditSink};
pub use store::{CachingPolicyStore, InMemoryAbacPolicyStore, InMemoryMembershipStore};

#[cfg(feature = "postgres")]
pub use store::{PostgresAbacPolicyStore, PostgresMembershipStore};
