//! Messaging layer for the order choreography.
//!
//! Services never call each other: they publish lifecycle envelopes to
//! topics and react to what they observe. This crate provides:
//! - [`EventBus`] trait with at-least-once, redeliverable [`Subscription`]s
//! - [`InMemoryEventBus`] for tests and single-process deployments
//! - [`OrderPublisher`] which owns the fixed order topics and publish deadlines

pub mod bus;
pub mod error;
pub mod memory;
pub mod publisher;
pub mod topics;

pub use bus::{EventBus, Message, Redelivery, Subscription};
pub use error::BusError;
pub use memory::InMemoryEventBus;
pub use publisher::OrderPublisher;
