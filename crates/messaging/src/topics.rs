//! Topic names of the order domain.

/// Announcements from the order-owning service: "order created" and
/// "refund requested".
pub const ORDER_EVENTS: &str = "order-events";

/// Sub-status facts raised by the kitchen and payment participants.
pub const ORDER_STATUS_EVENTS: &str = "order-status-events";
