//! Membership and policy store implementations.

pub mod caching;
pub mod in_memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use caching::CachingPolicyStore;
pub use in_memory::{InMemoryAbacPolicyStore, InMemoryMembershipStore};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresAbacPolicyStore, PostgresMembershipStore};
