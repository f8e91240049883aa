//! Order aggregate, lifecycle vocabulary and transition table.

mod aggregate;
mod events;
mod state;
mod transition;

pub use aggregate::{NewOrder, Order};
pub use events::{OrderEvent, StatusFact};
pub use state::{OrderStatus, SubStatus};
pub use transition::{Rejection, TRANSITIONS, Transition, target_status, transition};
