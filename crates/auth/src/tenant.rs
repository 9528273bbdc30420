//! Tenant data-classification and data-residency constraints.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use orgguard_core::DomainError;

use crate::AuthzError;

/// Sensitivity label of an organization's data. Declaration order is rank order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Official,
    OfficialSensitive,
    Secret,
    TopSecret,
}

impl Classification {
    pub fn rank(&self) -> u8 {
        match self {
            Classification::Official => 0,
            Classification::OfficialSensitive => 1,
            Classification::Secret => 2,
            Classification::TopSecret => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Official => "OFFICIAL",
            Classification::OfficialSensitive => "OFFICIAL_SENSITIVE",
            Classification::Secret => "SECRET",
            Classification::TopSecret => "TOP_SECRET",
        }
    }
}

impl FromStr for Classification {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "OFFICIAL" => Ok(Classification::Official),
            "OFFICIAL_SENSITIVE" => Ok(Classification::OfficialSensitive),
            "SECRET" => Ok(Classification::Secret),
            "TOP_SECRET" => Ok(Classification::TopSecret),
            other => Err(DomainError::validation(format!("unknown classification '{other}'"))),
        }
    }
}

impl core::fmt::Display for Classification {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic/regulatory zone an organization's data must stay within.
///
/// Compared by exact equality only; there is no regional matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Residency(String);

impl Residency {
    pub fn new(zone: impl Into<String>) -> Self {
        Self(zone.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Residency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a request requires of the tenant it runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantExpectation {
    pub classification: Option<Classification>,
    pub residency: Option<Residency>,
}

/// What the authenticated context actually carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantAttributes {
    pub classification: Classification,
    pub residency: Residency,
}

/// Asserts classification sufficiency and residency equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantConstraintGuard;

impl TenantConstraintGuard {
    pub fn new() -> Self {
        Self
    }

    /// Fails on the first violated constraint; classification is checked first.
    pub fn assert_constraints(
        &self,
        expected: &TenantExpectation,
        actual: &TenantAttributes,
    ) -> Result<(), AuthzError> {
        if let Some(required) = expected.classification {
            if actual.classification.rank() < required.rank() {
                return Err(AuthzError::ClassificationInsufficient {
                    required,
                    actual: actual.classification,
                });
            }
        }

        if let Some(residency) = &expected.residency {
            if *residency != actual.residency {
                return Err(AuthzError::ResidencyMismatch {
                    expected: residency.clone(),
                    actual: actual.residency.clone(),
                });
            }
        }

        Ok(())
    }
}
