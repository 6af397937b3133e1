//! Wire-format error types.

use thiserror::Error;

/// Wire-format errors
#[derive(Error, Debug)]
pub enum WireError {
    /// Buffer shorter than the transport header
    #[error("truncated packet")]
    Truncated,

    /// On-wire size would exceed the binding packet limit
    #[error("packet size {need} exceeds binding limit {limit}")]
    Oversize {
        /// Bytes the packet would occupy on the wire
        need: usize,
        /// The binding's maximum on-wire packet size
        limit: usize,
    },

    /// Reserved endpoint ID used where an assignable one is required
    #[error("reserved endpoint id {0:#04x}")]
    ReservedEid(u8),

    /// Head reservation too small for the requested prefix
    #[error("insufficient headroom")]
    Headroom,

    /// Unknown control command code
    #[error("unknown control command {0:#04x}")]
    Command(u8),
}
