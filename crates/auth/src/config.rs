//! Engine configuration.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable selecting the zero-match ABAC outcome.
pub const ABAC_DEFAULT_ENV: &str = "ORGGUARD_ABAC_DEFAULT";
/// Environment variable toggling audit-event emission.
pub const AUDIT_ENABLED_ENV: &str = "ORGGUARD_AUDIT_ENABLED";

/// Outcome of ABAC evaluation when no policy matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AbacDefault {
    /// ABAC is an optional restriction layer on top of RBAC.
    Allow,
    /// Zero-trust: anything not explicitly allowed is denied.
    #[default]
    Deny,
}

impl AbacDefault {
    pub fn allows(self) -> bool {
        self == AbacDefault::Allow
    }
}

impl FromStr for AbacDefault {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(AbacDefault::Allow),
            "deny" => Ok(AbacDefault::Deny),
            other => Err(format!("expected 'allow' or 'deny', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzConfig {
    pub abac_default: AbacDefault,
    pub audit_enabled: bool,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            abac_default: AbacDefault::Deny,
            audit_enabled: true,
        }
    }
}

impl AuthzConfig {
    /// Read overrides from the process environment, keeping defaults for
    /// unset or unparseable values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ABAC_DEFAULT_ENV) {
            match raw.parse() {
                Ok(value) => config.abac_default = value,
                Err(err) => tracing::warn!(
                    %err,
                    default = ?config.abac_default,
                    "invalid {}; keeping default",
                    ABAC_DEFAULT_ENV
                ),
            }
        }

        if let Some(raw) = lookup(AUDIT_ENABLED_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.audit_enabled = true,
                "0" | "false" | "no" | "off" => config.audit_enabled = false,
                other => tracing::warn!(value = other, "invalid {}; keeping default", AUDIT_ENABLED_ENV),
            }
        }

        config
    }

    pub fn with_abac_default(mut self, abac_default: AbacDefault) -> Self {
        self.abac_default = abac_default;
        self
    }

    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit_enabled = enabled;
        self
    }
}
