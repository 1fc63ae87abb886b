//! Tenant value type and resolver.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tessera_shared::types::TenantId;

use crate::tenant::error::TenantError;

/// A resolved, non-nil tenant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Uuid", into = "Uuid")]
pub struct Tenant(TenantId);

impl Tenant {
    /// Wraps a tenant id, rejecting the nil UUID.
    pub fn new(id: Uuid) -> Result<Self, TenantError> {
        if id.is_nil() {
            return Err(TenantError::NilTenant);
        }
        Ok(Self(TenantId::from_uuid(id)))
    }

    /// Returns the typed tenant id.
    #[must_use]
    pub const fn id(self) -> TenantId {
        self.0
    }

    /// Returns the raw UUID, for query predicates.
    #[must_use]
    pub const fn uuid(self) -> Uuid {
        self.0.into_inner()
    }

    /// Fails with `Mismatch` unless `other` is this tenant.
    pub fn ensure_same(self, other: Uuid) -> Result<(), TenantError> {
        if self.uuid() == other {
            Ok(())
        } else {
            Err(TenantError::Mismatch {
                expected: self.uuid(),
                found: other,
            })
        }
    }
}

impl TryFrom<Uuid> for Tenant {
    type Error = TenantError;

    fn try_from(value: Uuid) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Tenant> for Uuid {
    fn from(value: Tenant) -> Self {
        value.uuid()
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the tenant of a unit of work came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantSource {
    /// The authenticated actor's tenant.
    Actor,
    /// A tenant named explicitly by the caller.
    Explicit,
    /// The configured public tenant, requested explicitly.
    Public,
}

impl TenantSource {
    /// Returns the string representation of the source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Explicit => "explicit",
            Self::Public => "public",
        }
    }
}

/// The tenant of one unit of work together with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    tenant: Tenant,
    source: TenantSource,
}

impl TenantContext {
    /// Returns the resolved tenant.
    #[must_use]
    pub const fn tenant(&self) -> Tenant {
        self.tenant
    }

    /// Returns how the tenant was resolved.
    #[must_use]
    pub const fn source(&self) -> TenantSource {
        self.source
    }
}

/// Resolves the tenant for a unit of work exactly once.
#[derive(Debug, Clone, Default)]
pub struct TenantResolver {
    public_tenant: Option<Tenant>,
}

impl TenantResolver {
    /// Creates a resolver with an optional public tenant.
    ///
    /// A nil public tenant is rejected here so it can never be handed out.
    pub fn new(public_tenant: Option<Uuid>) -> Result<Self, TenantError> {
        let public_tenant = public_tenant.map(Tenant::new).transpose()?;
        Ok(Self { public_tenant })
    }

    /// Resolves the tenant from the authenticated actor and an explicit request.
    ///
    /// The public tenant is never consulted here; anonymous flows must call
    /// [`TenantResolver::resolve_public`].
    pub fn resolve(
        &self,
        actor_tenant: Option<Uuid>,
        explicit_tenant: Option<Uuid>,
    ) -> Result<TenantContext, TenantError> {
        match (actor_tenant, explicit_tenant) {
            (Some(actor), Some(explicit)) if actor != explicit => {
                Err(TenantError::Ambiguous { actor, explicit })
            }
            (Some(actor), _) => Ok(TenantContext {
                tenant: Tenant::new(actor)?,
                source: TenantSource::Actor,
            }),
            (None, Some(explicit)) => Ok(TenantContext {
                tenant: Tenant::new(explicit)?,
                source: TenantSource::Explicit,
            }),
            (None, None) => Err(TenantError::NoTenant),
        }
    }

    /// Returns the configured public tenant for an anonymous flow.
    pub fn resolve_public(&self) -> Result<TenantContext, TenantError> {
        self.public_tenant
            .map(|tenant| TenantContext {
                tenant,
                source: TenantSource::Public,
            })
            .ok_or(TenantError::NoTenant)
    }

    /// Returns true if a public tenant is configured.
    #[must_use]
    pub const fn has_public_tenant(&self) -> bool {
        self.public_tenant.is_some()
    }
}
