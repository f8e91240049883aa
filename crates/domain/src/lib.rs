//! Domain layer for the order choreography.
//!
//! This crate does no I/O. The clock is read only to stamp an order
//! created by [`Order::create`]; everything else takes `now` from the caller.
//! It provides:
//! - The [`Order`] projection shared (as independent copies) by every service
//! - The [`OrderStatus`] / [`SubStatus`] vocabularies
//! - The [`transition`] table, the single source of lifecycle rules
//! - The [`OrderEvent`] wire envelope and validated [`StatusFact`]s

pub mod error;
pub mod order;

pub use error::DomainError;
pub use order::{
    NewOrder, Order, OrderEvent, OrderStatus, Rejection, StatusFact, SubStatus, TRANSITIONS,
    Transition, target_status, transition,
};
