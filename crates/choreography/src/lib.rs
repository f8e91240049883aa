//! Choreographed order lifecycle.
//!
//! Two services keep independent projections of every order and coordinate
//! only through events:
//! - [`OrderService`] creates orders, consumes sub-status facts and asks for
//!   refunds when the kitchen fails
//! - [`KitchenService`] seeds its copy from order announcements and reports
//!   preparation outcomes
//!
//! Both apply facts through [`apply_with_retry`], which combines the domain
//! transition table with optimistic concurrency. [`run_consumer`] drives
//! either service from a bus subscription.

pub mod apply;
pub mod error;
pub mod kitchen_service;
pub mod order_service;
pub mod retry;
pub mod worker;

pub use apply::{ApplyOutcome, apply_with_retry};
pub use error::{ChoreographyError, Result};
pub use kitchen_service::{KitchenOutcome, KitchenService, SeedOutcome};
pub use order_service::{ConsumeOutcome, OrderService};
pub use retry::RetryPolicy;
pub use worker::{MessageHandler, WorkerConfig, run_consumer};
