//! Closed status sets per document kind.
//!
//! Transition tables are plain `match` expressions returning static
//! slices. [`crate::lifecycle::LifecycleService::validate_tables`] checks
//! them once at startup.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lifecycle::types::DocumentKind;

/// Display metadata attached to every status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusMeta {
    /// Human-readable label.
    pub label: &'static str,
    /// Hex color used by front-ends.
    pub color: &'static str,
    /// Icon name used by front-ends.
    pub icon: &'static str,
    /// Sort order in listings (lower first).
    pub order: u8,
}

/// Behaviour shared by every per-kind status enum.
pub trait LifecycleStatus: Copy + Eq + fmt::Debug + fmt::Display + Sized + 'static {
    /// The document kind this status set belongs to.
    const KIND: DocumentKind;
    /// Every status of the kind, in declaration order.
    const ALL: &'static [Self];
    /// Status assigned on creation and on duplication.
    const INITIAL: Self;

    /// Returns the stored representation.
    fn as_str(self) -> &'static str;

    /// Statuses reachable directly from this one.
    fn next(self) -> &'static [Self];

    /// Display metadata.
    fn meta(self) -> StatusMeta;

    /// True while the document still awaits work or a decision.
    fn is_active(self) -> bool;

    /// True once the document's outcome is settled.
    fn is_final(self) -> bool;

    /// True if business fields may still be edited.
    fn can_edit(self) -> bool;

    /// Parses a stored status, ignoring case and surrounding whitespace.
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|s| s.as_str() == value)
    }

    /// Returns true if `target` is directly reachable.
    fn can_transition_to(self, target: Self) -> bool {
        self.next().contains(&target)
    }
}

/// Budget status.
///
/// Rejected, cancelled and expired budgets may be reopened as drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Being prepared.
    Draft,
    /// Sent to the customer, awaiting a decision.
    Pending,
    /// Accepted by the customer.
    Approved,
    /// Declined by the customer.
    Rejected,
    /// Withdrawn.
    Cancelled,
    /// Work delivered.
    Completed,
    /// Validity window elapsed without a decision.
    Expired,
}

impl LifecycleStatus for BudgetStatus {
    const KIND: DocumentKind = DocumentKind::Budget;
    const ALL: &'static [Self] = &[
        Self::Draft,
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Cancelled,
        Self::Completed,
        Self::Expired,
    ];
    const INITIAL: Self = Self::Draft;

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }

    fn next(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Pending, Self::Cancelled],
            Self::Pending => &[Self::Approved, Self::Rejected, Self::Cancelled, Self::Expired],
            Self::Approved => &[Self::Completed, Self::Cancelled],
            Self::Rejected | Self::Cancelled | Self::Expired => &[Self::Draft],
            Self::Completed => &[],
        }
    }

    fn meta(self) -> StatusMeta {
        let (label, color, icon, order) = match self {
            Self::Draft => ("Draft", "#6C757D", "edit", 2),
            Self::Pending => ("Pending", "#FFC107", "clock", 1),
            Self::Approved => ("Approved", "#28A745", "check-circle", 3),
            Self::Rejected => ("Rejected", "#DC3545", "times-circle", 5),
            Self::Cancelled => ("Cancelled", "#6C757D", "ban", 6),
            Self::Completed => ("Completed", "#007BFF", "check-double", 4),
            Self::Expired => ("Expired", "#FFA500", "calendar-times", 7),
        };
        StatusMeta {
            label,
            color,
            icon,
            order,
        }
    }

    fn is_active(self) -> bool {
        matches!(self, Self::Draft | Self::Pending)
    }

    fn is_final(self) -> bool {
        !self.is_active()
    }

    fn can_edit(self) -> bool {
        matches!(self, Self::Draft)
    }
}

/// Invoice status. Invoices are born pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Awaiting payment.
    Pending,
    /// Settled.
    Paid,
    /// Voided.
    Cancelled,
    /// Past due date, still unpaid.
    Overdue,
}

impl LifecycleStatus for InvoiceStatus {
    const KIND: DocumentKind = DocumentKind::Invoice;
    const ALL: &'static [Self] = &[Self::Pending, Self::Paid, Self::Cancelled, Self::Overdue];
    const INITIAL: Self = Self::Pending;

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Overdue => "overdue",
        }
    }

    fn next(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Paid, Self::Cancelled, Self::Overdue],
            Self::Overdue => &[Self::Paid, Self::Cancelled],
            Self::Paid | Self::Cancelled => &[],
        }
    }

    fn meta(self) -> StatusMeta {
        let (label, color, icon, order) = match self {
            Self::Pending => ("Pending", "#ffc107", "bi-hourglass-split", 2),
            Self::Paid => ("Paid", "#198754", "bi-check-circle-fill", 3),
            Self::Cancelled => ("Cancelled", "#dc3545", "bi-x-circle-fill", 4),
            Self::Overdue => ("Overdue", "#6f42c1", "bi-calendar-x-fill", 1),
        };
        StatusMeta {
            label,
            color,
            icon,
            order,
        }
    }

    fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Overdue)
    }

    fn is_final(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    fn can_edit(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Field service status.
///
/// `NotPerformed` is recorded by external reconciliation only; no
/// transition leads to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Being prepared, freely editable.
    Draft,
    /// Awaiting scheduling.
    Pending,
    /// Scheduling in progress.
    Scheduling,
    /// Date agreed.
    Scheduled,
    /// Materials and crew being prepared.
    Preparing,
    /// Work under way.
    InProgress,
    /// Paused.
    OnHold,
    /// Fully delivered.
    Completed,
    /// Partially delivered.
    Partial,
    /// Withdrawn.
    Cancelled,
    /// Never carried out.
    NotPerformed,
    /// Lapsed before scheduling.
    Expired,
}

impl LifecycleStatus for ServiceStatus {
    const KIND: DocumentKind = DocumentKind::Service;
    const ALL: &'static [Self] = &[
        Self::Draft,
        Self::Pending,
        Self::Scheduling,
        Self::Scheduled,
        Self::Preparing,
        Self::InProgress,
        Self::OnHold,
        Self::Completed,
        Self::Partial,
        Self::Cancelled,
        Self::NotPerformed,
        Self::Expired,
    ];
    const INITIAL: Self = Self::Draft;

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Scheduling => "scheduling",
            Self::Scheduled => "scheduled",
            Self::Preparing => "preparing",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Cancelled => "cancelled",
            Self::NotPerformed => "not_performed",
            Self::Expired => "expired",
        }
    }

    fn next(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Pending, Self::Cancelled],
            Self::Pending => &[Self::Scheduling, Self::Cancelled, Self::Expired],
            Self::Scheduling => &[Self::Scheduled, Self::Cancelled, Self::Pending],
            Self::Scheduled => &[Self::Preparing, Self::Cancelled, Self::OnHold],
            Self::Preparing => &[Self::InProgress, Self::Cancelled, Self::OnHold],
            Self::InProgress => &[
                Self::Completed,
                Self::Partial,
                Self::OnHold,
                Self::Cancelled,
            ],
            Self::OnHold => &[
                Self::Scheduled,
                Self::Preparing,
                Self::InProgress,
                Self::Cancelled,
            ],
            Self::Completed
            | Self::Partial
            | Self::Cancelled
            | Self::NotPerformed
            | Self::Expired => &[],
        }
    }

    fn meta(self) -> StatusMeta {
        let (label, color, icon, order) = match self {
            Self::Draft => ("Draft", "#6c757d", "bi-pencil-square", 1),
            Self::Pending => ("Pending", "#ffc107", "bi-clock", 2),
            Self::Scheduling => ("Scheduling", "#007bff", "bi-calendar-check", 3),
            Self::Scheduled => ("Scheduled", "#007bff", "bi-calendar-plus", 4),
            Self::Preparing => ("Preparing", "#ffc107", "bi-tools", 5),
            Self::InProgress => ("In progress", "#007bff", "bi-gear", 6),
            Self::OnHold => ("On hold", "#6c757d", "bi-pause-circle", 7),
            Self::Completed => ("Completed", "#28a745", "bi-check-circle", 8),
            Self::Partial => ("Partially completed", "#28a745", "bi-check-circle-fill", 9),
            Self::Cancelled => ("Cancelled", "#dc3545", "bi-x-circle", 10),
            Self::NotPerformed => ("Not performed", "#dc3545", "bi-slash-circle", 11),
            Self::Expired => ("Expired", "#dc3545", "bi-calendar-x", 12),
        };
        StatusMeta {
            label,
            color,
            icon,
            order,
        }
    }

    fn is_active(self) -> bool {
        !self.is_final()
    }

    fn is_final(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Partial | Self::Cancelled | Self::NotPerformed | Self::Expired
        )
    }

    fn can_edit(self) -> bool {
        matches!(self, Self::Draft)
    }
}

macro_rules! display_as_str {
    ($($name:ident),+) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

display_as_str!(BudgetStatus, InvoiceStatus, ServiceStatus);
