//! `orgguard-auth`: organization authorization engine (RBAC + ABAC + tenant constraints).
//!
//! This crate is intentionally decoupled from HTTP and storage: memberships,
//! policy sets and audit delivery are reached through the traits in [`store`].

pub mod audit;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod guard;
pub mod membership;
pub mod normalizer;
pub mod permissions;
pub mod policy;
pub mod resolution;
pub mod roles;
pub mod store;
pub mod tenant;

pub use audit::{AuditEvent, AuditOutcome};
pub use config::{AbacDefault, AuthzConfig};
pub use context::{AuthorizationContext, AuthorizationInput, Subject};
pub use engine::{AuthorizationEngine, check_rbac};
pub use error::{AuthzError, AuthzErrorKind, StoreError};
pub use evaluator::{AbacDecision, AbacEvaluator};
pub use guard::OrgAccessGuard;
pub use membership::{Membership, MembershipStatus};
pub use normalizer::{AbacPolicyNormalizer, DroppedPolicy, NormalizationReport};
pub use permissions::PermissionMap;
pub use policy::{
    AbacPolicy, Condition, Effect, NormalizedPolicy, Operand, Operator, Predicate, PredicateSpec, Side,
};
pub use resolution::PermissionResolutionService;
pub use roles::{RoleKey, RoleScope, RoleTemplates};
pub use store::{AbacPolicyStore, AuditSink, MembershipStore};
pub use tenant::{
    Classification, Residency, TenantAttributes, TenantConstraintGuard, TenantExpectation,
};
