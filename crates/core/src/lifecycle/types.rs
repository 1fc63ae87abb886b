//! Lifecycle domain types shared by every document kind.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tessera_shared::types::{ShareTokenId, UserId};

use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::status::{
    BudgetStatus, InvoiceStatus, LifecycleStatus, ServiceStatus, StatusMeta,
};

/// Kind of business document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Customer quote awaiting approval.
    Budget,
    /// Bill sent to a customer.
    Invoice,
    /// Field service order.
    Service,
}

impl DocumentKind {
    /// Every kind.
    pub const ALL: [Self; 3] = [Self::Budget, Self::Invoice, Self::Service];

    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Invoice => "invoice",
            Self::Service => "service",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(value: &str) -> Result<Self, LifecycleError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "budget" => Ok(Self::Budget),
            "invoice" => Ok(Self::Invoice),
            "service" => Ok(Self::Service),
            _ => Err(LifecycleError::UnknownKind(value.to_string())),
        }
    }

    /// Prefix used for sequential codes when the caller does not pick one.
    #[must_use]
    pub const fn default_prefix(&self) -> &'static str {
        match self {
            Self::Budget => "ORC",
            Self::Invoice => "FAT",
            Self::Service => "SRV",
        }
    }

    /// Status assigned on creation and on duplication.
    #[must_use]
    pub const fn initial_status(&self) -> DocumentStatus {
        match self {
            Self::Budget => DocumentStatus::Budget(BudgetStatus::INITIAL),
            Self::Invoice => DocumentStatus::Invoice(InvoiceStatus::INITIAL),
            Self::Service => DocumentStatus::Service(ServiceStatus::INITIAL),
        }
    }

    /// Every status of this kind, in declaration order.
    #[must_use]
    pub fn statuses(&self) -> Vec<DocumentStatus> {
        match self {
            Self::Budget => BudgetStatus::ALL.iter().map(|s| DocumentStatus::Budget(*s)).collect(),
            Self::Invoice => InvoiceStatus::ALL
                .iter()
                .map(|s| DocumentStatus::Invoice(*s))
                .collect(),
            Self::Service => ServiceStatus::ALL
                .iter()
                .map(|s| DocumentStatus::Service(*s))
                .collect(),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status tagged with its document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Budget status.
    Budget(BudgetStatus),
    /// Invoice status.
    Invoice(InvoiceStatus),
    /// Service status.
    Service(ServiceStatus),
}

impl DocumentStatus {
    /// Parses a stored status string for a document of `kind`.
    pub fn parse(kind: DocumentKind, value: &str) -> Result<Self, LifecycleError> {
        let parsed = match kind {
            DocumentKind::Budget => BudgetStatus::parse(value).map(Self::Budget),
            DocumentKind::Invoice => InvoiceStatus::parse(value).map(Self::Invoice),
            DocumentKind::Service => ServiceStatus::parse(value).map(Self::Service),
        };
        parsed.ok_or_else(|| LifecycleError::UnknownStatus {
            kind,
            status: value.to_string(),
        })
    }

    /// Returns the kind this status belongs to.
    #[must_use]
    pub const fn kind(&self) -> DocumentKind {
        match self {
            Self::Budget(_) => DocumentKind::Budget,
            Self::Invoice(_) => DocumentKind::Invoice,
            Self::Service(_) => DocumentKind::Service,
        }
    }

    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Budget(s) => s.as_str(),
            Self::Invoice(s) => s.as_str(),
            Self::Service(s) => s.as_str(),
        }
    }

    /// Display metadata.
    #[must_use]
    pub fn meta(&self) -> StatusMeta {
        match *self {
            Self::Budget(s) => s.meta(),
            Self::Invoice(s) => s.meta(),
            Self::Service(s) => s.meta(),
        }
    }

    /// True while the document still awaits work or a decision.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match *self {
            Self::Budget(s) => s.is_active(),
            Self::Invoice(s) => s.is_active(),
            Self::Service(s) => s.is_active(),
        }
    }

    /// True once the outcome is settled.
    #[must_use]
    pub fn is_final(&self) -> bool {
        match *self {
            Self::Budget(s) => s.is_final(),
            Self::Invoice(s) => s.is_final(),
            Self::Service(s) => s.is_final(),
        }
    }

    /// True if business fields may still be edited.
    #[must_use]
    pub fn can_edit(&self) -> bool {
        match *self {
            Self::Budget(s) => s.can_edit(),
            Self::Invoice(s) => s.can_edit(),
            Self::Service(s) => s.can_edit(),
        }
    }

    /// Statuses reachable directly from this one.
    #[must_use]
    pub fn allowed_targets(&self) -> Vec<Self> {
        match *self {
            Self::Budget(s) => s.next().iter().map(|n| Self::Budget(*n)).collect(),
            Self::Invoice(s) => s.next().iter().map(|n| Self::Invoice(*n)).collect(),
            Self::Service(s) => s.next().iter().map(|n| Self::Service(*n)).collect(),
        }
    }

    /// Returns true if `target` is of the same kind and directly reachable.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        match (*self, target) {
            (Self::Budget(a), Self::Budget(b)) => a.can_transition_to(b),
            (Self::Invoice(a), Self::Invoice(b)) => a.can_transition_to(b),
            (Self::Service(a), Self::Service(b)) => a.can_transition_to(b),
            _ => false,
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// An authenticated user.
    User(UserId),
    /// An anonymous recipient holding a share link.
    Share(ShareTokenId),
    /// Background maintenance.
    System,
}

impl Actor {
    /// Stored actor type.
    #[must_use]
    pub const fn actor_type(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Share(_) => "share",
            Self::System => "system",
        }
    }

    /// Stored actor id, absent for the system actor.
    #[must_use]
    pub fn actor_id(&self) -> Option<Uuid> {
        match self {
            Self::User(id) => Some(id.into_inner()),
            Self::Share(id) => Some(id.into_inner()),
            Self::System => None,
        }
    }

    /// Rebuilds an actor from its stored columns.
    #[must_use]
    pub fn from_parts(actor_type: &str, actor_id: Option<Uuid>) -> Option<Self> {
        match (actor_type, actor_id) {
            ("user", Some(id)) => Some(Self::User(UserId::from_uuid(id))),
            ("share", Some(id)) => Some(Self::Share(ShareTokenId::from_uuid(id))),
            ("system", None) => Some(Self::System),
            _ => None,
        }
    }
}

/// A validated status change, ready to be persisted as one history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Status before the change.
    pub from: DocumentStatus,
    /// Status after the change.
    pub to: DocumentStatus,
    /// Who made the change.
    pub actor: Actor,
    /// Optional free-text reason.
    pub comment: Option<String>,
    /// When the change was validated.
    pub at: DateTime<Utc>,
}
