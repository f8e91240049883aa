//! Shared types used by every service in the order choreography.

pub mod types;

pub use types::{OrderId, Version};
