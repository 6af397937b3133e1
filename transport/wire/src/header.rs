//! Transport header processing.
//!
//! This module defines the 3-byte MCTP transport header that carries
//! addressing and the multi-packet framing state: Start-of-Message and
//! End-of-Message bits, a 3-bit packet tag, and a 2-bit sequence
//! number. The tag-owner bit is carried as opaque pass-through
//! metadata and never interpreted by the engine.

use bitflags::bitflags;

use crate::eid::Eid;
use crate::error::WireError;

/// Transport header size in bytes
pub const HEADER_SIZE: usize = 3;

/// Sequence numbers wrap modulo this value (2-bit field)
pub const SEQ_MODULUS: u8 = 4;

/// Maximum packet tag value (3-bit field)
pub const TAG_MAX: u8 = 7;

/// Shift of the packet tag within the flags byte
const TAG_SHIFT: u8 = 3;
/// Mask of the packet tag field within the flags byte
const TAG_FIELD: u8 = 0b0011_1000;
/// Shift of the sequence number within the flags byte
const SEQ_SHIFT: u8 = 1;
/// Mask of the sequence number field within the flags byte
const SEQ_FIELD: u8 = 0b0000_0110;

bitflags! {
    /// Single-bit framing flags of the flags/seq/tag byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        /// Start of message
        const SOM = 1 << 7;
        /// End of message
        const EOM = 1 << 6;
        /// Tag owner (opaque pass-through)
        const TAG_OWNER = 1 << 0;
    }
}

/// Advance a 2-bit sequence number.
#[inline]
pub fn next_seq(seq: u8) -> u8 {
    (seq + 1) % SEQ_MODULUS
}

/// Decoded transport header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Destination endpoint
    pub dest: Eid,
    /// Source endpoint
    pub src: Eid,
    /// Start-of-Message bit
    pub som: bool,
    /// End-of-Message bit
    pub eom: bool,
    /// 3-bit packet tag
    pub tag: u8,
    /// 2-bit sequence number
    pub seq: u8,
    /// Tag-owner bit (pass-through, unspecified semantics)
    pub tag_owner: bool,
}

impl PacketHeader {
    /// Create a header with all framing bits clear.
    pub fn new(dest: Eid, src: Eid) -> Self {
        Self {
            dest,
            src,
            som: false,
            eom: false,
            tag: 0,
            seq: 0,
            tag_owner: false,
        }
    }

    /// Set the SOM/EOM framing bits.
    pub fn with_framing(mut self, som: bool, eom: bool) -> Self {
        self.som = som;
        self.eom = eom;
        self
    }

    /// Set the packet tag (masked to 3 bits).
    pub fn with_tag(mut self, tag: u8) -> Self {
        self.tag = tag & TAG_MAX;
        self
    }

    /// Set the sequence number (masked to 2 bits).
    pub fn with_seq(mut self, seq: u8) -> Self {
        self.seq = seq % SEQ_MODULUS;
        self
    }

    /// Set the tag-owner bit.
    pub fn with_tag_owner(mut self, owner: bool) -> Self {
        self.tag_owner = owner;
        self
    }

    /// Encode the header to its 3-byte wire representation.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode the header into the front of an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is shorter than [`HEADER_SIZE`].
    pub fn encode_into(&self, buf: &mut [u8]) {
        let mut fst = Flags::empty();
        if self.som {
            fst |= Flags::SOM;
        }
        if self.eom {
            fst |= Flags::EOM;
        }
        if self.tag_owner {
            fst |= Flags::TAG_OWNER;
        }
        buf[0] = self.dest.0;
        buf[1] = self.src.0;
        buf[2] = fst.bits() | ((self.tag & TAG_MAX) << TAG_SHIFT) | ((self.seq << SEQ_SHIFT) & SEQ_FIELD);
    }

    /// Decode a header from the front of a buffer.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::Truncated);
        }

        let fst = buf[2];
        let flags = Flags::from_bits_truncate(fst);

        Ok(Self {
            dest: Eid(buf[0]),
            src: Eid(buf[1]),
            som: flags.contains(Flags::SOM),
            eom: flags.contains(Flags::EOM),
            tag: (fst & TAG_FIELD) >> TAG_SHIFT,
            seq: (fst & SEQ_FIELD) >> SEQ_SHIFT,
            tag_owner: flags.contains(Flags::TAG_OWNER),
        })
    }

    /// Check whether this packet is a complete single-packet message.
    #[inline]
    pub fn is_single_packet(&self) -> bool {
        self.som && self.eom
    }
}
