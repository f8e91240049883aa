//! The order lifecycle transition table.
//!
//! Every component that needs to know what a sub-status does to an order
//! goes through [`transition`]. Adding a sub-status means adding a row to
//! [`TRANSITIONS`].

use super::{OrderStatus, SubStatus};

/// Sub-status → status mapping.
pub const TRANSITIONS: [(SubStatus, OrderStatus); 5] = [
    (SubStatus::PaymentPaid, OrderStatus::Processing),
    (SubStatus::PaymentFailed, OrderStatus::Failed),
    (SubStatus::KitchenPreparationFailed, OrderStatus::Refunding),
    (SubStatus::Refunded, OrderStatus::Failed),
    (SubStatus::Delivered, OrderStatus::Done),
];

/// Result of feeding a sub-status to an order in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order moves to the given status.
    Advance(OrderStatus),

    /// The order is already in the status this sub-status leads to.
    Unchanged,

    /// The sub-status must not be applied.
    Rejected(Rejection),
}

/// Why a sub-status was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The sub-status has no row in the transition table.
    Unmapped(SubStatus),

    /// The order already reached a terminal status.
    Terminal { from: OrderStatus, to: OrderStatus },

    /// The sub-status leads somewhere the order can no longer reach
    /// (stale or reordered event).
    Regression { from: OrderStatus, to: OrderStatus },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Unmapped(sub_status) => write!(f, "no transition for {sub_status}"),
            Rejection::Terminal { from, to } => {
                write!(f, "cannot leave terminal status {from} for {to}")
            }
            Rejection::Regression { from, to } => write!(f, "cannot move from {from} to {to}"),
        }
    }
}

/// Looks up the status a sub-status leads to.
pub fn target_status(sub_status: SubStatus) -> Option<OrderStatus> {
    TRANSITIONS
        .iter()
        .find(|(candidate, _)| *candidate == sub_status)
        .map(|(_, status)| *status)
}

/// Computes what `incoming` does to an order currently in `current`.
///
/// Applying the same sub-status twice yields [`Transition::Unchanged`] the
/// second time. Moves that would not advance the lifecycle are rejected.
pub fn transition(current: OrderStatus, incoming: SubStatus) -> Transition {
    let Some(target) = target_status(incoming) else {
        return Transition::Rejected(Rejection::Unmapped(incoming));
    };

    if target == current {
        return Transition::Unchanged;
    }

    if current.is_terminal() {
        return Transition::Rejected(Rejection::Terminal {
            from: current,
            to: target,
        });
    }

    if !current.can_advance_to(target) {
        return Transition::Rejected(Rejection::Regression {
            from: current,
            to: target,
        });
    }

    Transition::Advance(target)
}
