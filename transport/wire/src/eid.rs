//! Endpoint addressing.
//!
//! An MCTP endpoint ID is an 8-bit logical address. Two values are
//! reserved by the protocol: `0x00` (the null address, used before an
//! endpoint has been assigned one) and `0xFF` (broadcast).

use std::fmt;

/// The null endpoint ID.
pub const NULL_EID: Eid = Eid(0x00);

/// The broadcast endpoint ID.
pub const BROADCAST_EID: Eid = Eid(0xFF);

/// MCTP endpoint ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Eid(pub u8);

impl Eid {
    /// Check whether this is the null address.
    pub fn is_null(self) -> bool {
        self == NULL_EID
    }

    /// Check whether this is the broadcast address.
    pub fn is_broadcast(self) -> bool {
        self == BROADCAST_EID
    }

    /// Check whether this EID may be assigned to a bus (neither
    /// reserved value).
    pub fn is_assignable(self) -> bool {
        !self.is_null() && !self.is_broadcast()
    }
}

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u8> for Eid {
    fn from(value: u8) -> Self {
        Eid(value)
    }
}
