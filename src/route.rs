//! Routes - structured, tenant-aware message addresses.
//!
//! A `Route` names a message by scope, area and name instead of a raw
//! transport subject. The subject is derived on demand:
//!
//! ```text
//! global.{area}.{name}
//! internal.{area}.{name}
//! org.{organization_id | *}.{area}.{name}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Token that matches any single subject segment.
pub const WILDCARD: &str = "*";

/// Message visibility tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// System-wide.
    Global,
    /// Process or cluster internal.
    Internal,
    /// Tenant scoped.
    Org,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Internal => "internal",
            Scope::Org => "org",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when a route cannot be turned into a usable address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("route area must not be empty")]
    EmptyArea,
    #[error("route name must not be empty")]
    EmptyName,
    /// Area or name contains a subject wildcard token.
    #[error("route segment contains a wildcard token: {0}")]
    WildcardToken(String),
    /// Publishing on an org route needs a concrete organization.
    #[error("org route {0} has no organization id; only subscriptions may target every tenant")]
    MissingOrganization(String),
}

/// Structured address of a message.
///
/// Fields are private so that `organization_id` can only be set on
/// org-scoped routes. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    scope: Scope,
    area: String,
    name: String,
    organization_id: Option<Uuid>,
}

impl Route {
    /// A system-wide route.
    pub fn global(area: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: Scope::Global,
            area: area.into(),
            name: name.into(),
            organization_id: None,
        }
    }

    /// A process/cluster-internal route.
    pub fn internal(area: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: Scope::Internal,
            area: area.into(),
            name: name.into(),
            organization_id: None,
        }
    }

    /// A tenant-scoped route. `None` addresses every tenant when subscribing.
    pub fn org(area: impl Into<String>, name: impl Into<String>, organization_id: Option<Uuid>) -> Self {
        Self {
            scope: Scope::Org,
            area: area.into(),
            name: name.into(),
            organization_id,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn organization_id(&self) -> Option<Uuid> {
        self.organization_id
    }

    /// Same route, bound to a concrete organization.
    ///
    /// Has no effect on non-org routes.
    pub fn for_organization(mut self, organization_id: Uuid) -> Self {
        if self.scope == Scope::Org {
            self.organization_id = Some(organization_id);
        }
        self
    }

    /// True when the derived subject matches more than one tenant.
    pub fn is_wildcard(&self) -> bool {
        self.scope == Scope::Org && self.organization_id.is_none()
    }

    /// Derive the transport subject.
    ///
    /// Pure and total: no escaping or normalization is applied.
    pub fn subject(&self) -> String {
        match self.scope {
            Scope::Org => {
                let organization = self
                    .organization_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| WILDCARD.to_string());
                format!("{}.{}.{}.{}", self.scope, organization, self.area, self.name)
            }
            _ => format!("{}.{}.{}", self.scope, self.area, self.name),
        }
    }

    /// Check the caller-supplied segments.
    pub fn validate(&self) -> Result<(), AddressError> {
        if self.area.is_empty() {
            return Err(AddressError::EmptyArea);
        }
        if self.name.is_empty() {
            return Err(AddressError::EmptyName);
        }
        for segment in [&self.area, &self.name] {
            if segment.split('.').any(|token| token == WILDCARD || token == ">") {
                return Err(AddressError::WildcardToken(segment.clone()));
            }
        }
        Ok(())
    }

    /// Validate for publish/request: the subject must name exactly one tenant.
    pub fn publish_subject(&self) -> Result<String, AddressError> {
        self.validate()?;
        if self.is_wildcard() {
            return Err(AddressError::MissingOrganization(self.subject()));
        }
        Ok(self.subject())
    }

    /// Validate for subscribe: a wildcard organization is allowed.
    pub fn subscribe_subject(&self) -> Result<String, AddressError> {
        self.validate()?;
        Ok(self.subject())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.subject())
    }
}
