//! Share link domain types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use tessera_shared::types::ShareTokenId;

use crate::lifecycle::{BudgetStatus, DocumentKind, DocumentStatus};
use crate::share::error::ShareError;

/// A capability granted by a share link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read the document.
    View,
    /// Download the rendered document.
    Download,
    /// Accept the document.
    Approve,
    /// Decline the document.
    Reject,
    /// Pay through the external gateway.
    Pay,
}

impl Permission {
    /// Returns the string representation of the permission.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Download => "download",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Pay => "pay",
        }
    }

    /// Parses a permission name.
    pub fn parse(value: &str) -> Result<Self, ShareError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "download" => Ok(Self::Download),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "pay" => Ok(Self::Pay),
            _ => Err(ShareError::UnknownPermission(value.to_string())),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-empty, ordered set of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Builds a set, rejecting an empty one.
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Result<Self, ShareError> {
        let set: BTreeSet<_> = permissions.into_iter().collect();
        if set.is_empty() {
            return Err(ShareError::EmptyPermissions);
        }
        Ok(Self(set))
    }

    /// Parses permission names.
    pub fn parse<I, S>(names: I) -> Result<Self, ShareError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let permissions = names
            .into_iter()
            .map(|n| Permission::parse(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(permissions)
    }

    /// Read-only access.
    #[must_use]
    pub fn view_only() -> Self {
        Self(BTreeSet::from([Permission::View]))
    }

    /// Returns true if `permission` is granted.
    #[must_use]
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Fails with `PermissionDenied` unless `permission` is granted.
    pub fn require(&self, permission: Permission) -> Result<(), ShareError> {
        if self.contains(permission) {
            Ok(())
        } else {
            Err(ShareError::PermissionDenied(permission))
        }
    }

    /// Iterates the permissions in order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// JSON array of names, as stored.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.iter()
                .map(|p| serde_json::Value::String(p.as_str().to_string()))
                .collect(),
        )
    }

    /// Reads the stored JSON array.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ShareError> {
        let names = value
            .as_array()
            .ok_or(ShareError::EmptyPermissions)?
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| ShareError::UnknownPermission(v.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::parse(names)
    }
}

impl TryFrom<Vec<Permission>> for PermissionSet {
    type Error = ShareError;

    fn try_from(value: Vec<Permission>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(value: PermissionSet) -> Self {
        value.0.into_iter().collect()
    }
}

/// Requested lifetime of a share link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareTtl {
    /// The configured default.
    #[default]
    Default,
    /// A number of days.
    Days(u32),
    /// No expiry; only when allowed by configuration.
    NoExpiry,
}

/// Refers to a share either by record id or by its secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRef {
    /// Record id.
    Id(ShareTokenId),
    /// Raw bearer secret.
    Secret(String),
}

/// A recipient's decision on a shared document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareDecision {
    /// Accept.
    Approve,
    /// Decline.
    Reject,
}

impl ShareDecision {
    /// Permission the link must grant.
    #[must_use]
    pub const fn required_permission(&self) -> Permission {
        match self {
            Self::Approve => Permission::Approve,
            Self::Reject => Permission::Reject,
        }
    }

    /// Target status of the decision for a document kind.
    pub const fn target_status(&self, kind: DocumentKind) -> Result<DocumentStatus, ShareError> {
        match (kind, self) {
            (DocumentKind::Budget, Self::Approve) => Ok(DocumentStatus::Budget(BudgetStatus::Approved)),
            (DocumentKind::Budget, Self::Reject) => Ok(DocumentStatus::Budget(BudgetStatus::Rejected)),
            (DocumentKind::Invoice | DocumentKind::Service, _) => {
                Err(ShareError::DecisionNotSupported(kind))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_rejected() {
        assert_eq!(
            PermissionSet::new(Vec::new()),
            Err(ShareError::EmptyPermissions)
        );
        assert!(serde_json::from_str::<PermissionSet>("[]").is_err());
    }

    #[test]
    fn test_parse_dedupes_and_orders() {
        let set = PermissionSet::parse(["download", "VIEW", "view"]).unwrap();
        let names: Vec<_> = set.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, ["view", "download"]);
    }

    #[test]
    fn test_unknown_permission() {
        assert_eq!(
            PermissionSet::parse(["edit"]),
            Err(ShareError::UnknownPermission("edit".into()))
        );
    }

    #[test]
    fn test_json_round_trip() {
        let set = PermissionSet::parse(["approve", "view"]).unwrap();
        let json = set.to_json();
        assert_eq!(json, serde_json::json!(["view", "approve"]));
        assert_eq!(PermissionSet::from_json(&json).unwrap(), set);
    }

    #[test]
    fn test_require() {
        let set = PermissionSet::view_only();
        assert!(set.require(Permission::View).is_ok());
        assert_eq!(
            set.require(Permission::Approve),
            Err(ShareError::PermissionDenied(Permission::Approve))
        );
    }

    #[test]
    fn test_decision_targets() {
        assert_eq!(
            ShareDecision::Approve.target_status(DocumentKind::Budget),
            Ok(DocumentStatus::Budget(BudgetStatus::Approved))
        );
        assert_eq!(
            ShareDecision::Reject.target_status(DocumentKind::Budget),
            Ok(DocumentStatus::Budget(BudgetStatus::Rejected))
        );
        assert!(ShareDecision::Approve
            .target_status(DocumentKind::Invoice)
            .is_err());
    }
}
