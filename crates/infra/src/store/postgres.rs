//! Postgres-backed membership and policy stores.
//!
//! Tables are described by [`SCHEMA`].
//!
//! Policy sets are stored raw, one JSONB array per organization, and are
//! normalized on every evaluation.

use std::sync::Arc;

use sqlx::{PgPool, Row};
use tracing::instrument;

use orgguard_auth::{
    AbacPolicy, AbacPolicyStore, Classification, Membership, MembershipStatus, MembershipStore, PermissionMap,
    Residency, RoleScope, StoreError,
};
use orgguard_core::{OrgId, UserId};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS org_memberships (
    org_id               UUID NOT NULL,
    user_id              UUID NOT NULL,
    role_key             TEXT NOT NULL,
    role_name            TEXT,
    role_scope           TEXT,
    status               TEXT NOT NULL DEFAULT 'ACTIVE',
    org_classification   TEXT NOT NULL,
    org_residency        TEXT NOT NULL,
    permission_overrides JSONB,
    PRIMARY KEY (org_id, user_id)
);

CREATE TABLE IF NOT EXISTS org_abac_policies (
    org_id     UUID PRIMARY KEY,
    policies   JSONB NOT NULL DEFAULT '[]'::jsonb,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

/// Membership reads against `org_memberships`.
#[derive(Debug, Clone)]
pub struct PostgresMembershipStore {
    pool: Arc<PgPool>,
}

impl PostgresMembershipStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create the tables used by both stores if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MembershipStore for PostgresMembershipStore {
    #[instrument(skip(self), fields(org_id = %org_id, user_id = %user_id), err)]
    async fn find_membership(
        &self,
        org_id: OrgId,
        user_id: UserId,
    ) -> Result<Option<Membership>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                role_key,
                role_name,
                role_scope,
                status,
                org_classification,
                org_residency,
                permission_overrides
            FROM org_memberships
            WHERE org_id = $1 AND user_id = $2
            "#,
        )
        .bind(org_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_membership", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role_key: String = get(&row, "role_key")?;
        let role_name: Option<String> = get(&row, "role_name")?;
        let role_scope: Option<String> = get(&row, "role_scope")?;
        let status: String = get(&row, "status")?;
        let classification: String = get(&row, "org_classification")?;
        let residency: String = get(&row, "org_residency")?;
        let overrides: Option<serde_json::Value> = get(&row, "permission_overrides")?;

        let classification: Classification = classification.parse().map_err(corrupt("org_classification"))?;
        let status: MembershipStatus = status.parse().map_err(corrupt("status"))?;

        let mut membership =
            Membership::new(org_id, user_id, role_key, classification, Residency::new(residency)).with_status(status);
        membership.role_name = role_name;
        membership.role_scope = role_scope
            .map(|scope| scope.parse::<RoleScope>())
            .transpose()
            .map_err(corrupt("role_scope"))?;
        membership.permission_overrides = overrides
            .map(serde_json::from_value::<PermissionMap>)
            .transpose()
            .map_err(corrupt("permission_overrides"))?;

        Ok(Some(membership))
    }
}

/// Per-organization policy sets in `org_abac_policies`.
#[derive(Debug, Clone)]
pub struct PostgresAbacPolicyStore {
    pool: Arc<PgPool>,
}

impl PostgresAbacPolicyStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AbacPolicyStore for PostgresAbacPolicyStore {
    #[instrument(skip(self), fields(org_id = %org_id), err)]
    async fn get_policies_for_org(&self, org_id: OrgId) -> Result<Vec<AbacPolicy>, StoreError> {
        let row = sqlx::query("SELECT policies FROM org_abac_policies WHERE org_id = $1")
            .bind(org_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_policies_for_org", e))?;

        let Some(row) = row else {
            return Ok(Vec::new());
        };

        let policies: serde_json::Value = get(&row, "policies")?;
        serde_json::from_value(policies).map_err(corrupt("policies"))
    }

    #[instrument(skip(self, policies), fields(org_id = %org_id, policy_count = policies.len()), err)]
    async fn set_policies_for_org(
        &self,
        org_id: OrgId,
        policies: Vec<AbacPolicy>,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_value(&policies).map_err(corrupt("policies"))?;

        sqlx::query(
            r#"
            INSERT INTO org_abac_policies (org_id, policies, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (org_id)
            DO UPDATE SET policies = EXCLUDED.policies, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(org_id.as_uuid())
        .bind(payload)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_policies_for_org", e))?;

        Ok(())
    }
}

fn get<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Corrupt(format!("column {column}: {e}")))
}

fn corrupt<E: core::fmt::Display>(column: &'static str) -> impl Fn(E) -> StoreError {
    move |e| StoreError::Corrupt(format!("column {column}: {e}"))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Unavailable(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::Unavailable(format!("connection pool closed in {}", operation)),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("decode error in {}: {}", operation, err))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}
