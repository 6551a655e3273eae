//! crates/pintarai_core/src/order.rs
//!
//! The order-id codec shared by checkout and the payment webhook.
//!
//! An order id has the shape `PINTARAI-<userId>-<packageId>-<nonce>`:
//! exactly four hyphen-delimited segments, first segment fixed. User and
//! package ids therefore must not contain hyphens themselves.

/// Fixed first segment of every order id issued by this application.
pub const ORDER_MARKER: &str = "PINTARAI";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum OrderIdError {
    #[error("order id must have exactly 4 segments, got {0}")]
    SegmentCount(usize),
    #[error("order id marker mismatch: expected '{ORDER_MARKER}', got '{0}'")]
    Marker(String),
}

/// The identifying parts encoded in an order id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRef {
    pub user_id: String,
    pub package_id: String,
    pub nonce: String,
}

/// Builds the order id for a checkout. The nonce disambiguates repeated
/// purchases of the same package by the same user.
pub fn build_order_id(user_id: &str, package_id: &str, nonce: i64) -> String {
    format!("{ORDER_MARKER}-{user_id}-{package_id}-{nonce}")
}

/// Parses an inbound order id, rejecting anything that was not issued by
/// this application.
pub fn parse_order_id(order_id: &str) -> Result<OrderRef, OrderIdError> {
    let parts: Vec<&str> = order_id.split('-').collect();
    if parts.len() != 4 {
        return Err(OrderIdError::SegmentCount(parts.len()));
    }
    if parts[0] != ORDER_MARKER {
        return Err(OrderIdError::Marker(parts[0].to_string()));
    }
    Ok(OrderRef {
        user_id: parts[1].to_string(),
        package_id: parts[2].to_string(),
        nonce: parts[3].to_string(),
    })
}
