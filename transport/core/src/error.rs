//! Transport engine error types.
//!
//! Protocol-level violations (malformed packets, sequence violations,
//! unsupported message types) are not represented here: the transport
//! is best-effort and fail-closed, so those packets are dropped
//! silently and only logged. These types cover the operations that do
//! surface a result to the caller: registration and transmission.

use thiserror::Error;

use mctp_wire::{Eid, WireError};

/// Transmit-path errors surfaced by a [`crate::Binding`].
#[derive(Error, Debug)]
pub enum TxError {
    /// The binding's transmit latch is disabled; retry policy belongs
    /// to the caller
    #[error("binding not ready")]
    NotReady,

    /// The binding's transmit path failed
    #[error("transmit failed: {0}")]
    Failed(String),
}

/// Errors from registration and message transmission.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A terminating bus needs an assignable endpoint ID
    #[error("reserved endpoint id {0:#04x}")]
    ReservedEid(u8),

    /// No terminating bus exists to carry traffic toward an endpoint
    #[error("no route to endpoint {0}")]
    NoRoute(Eid),

    /// Messages carry at least a type byte
    #[error("empty message")]
    EmptyMessage,

    /// Wire-format failure while building packets
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Binding transmit failure
    #[error(transparent)]
    Tx(#[from] TxError),
}
