//! MCTP transport header framing, packet buffers, and control message parsing.
//!
//! This crate provides the wire-format layer of the MCTP transport engine:
//! the packet header with its framing bits, owned packet buffers with
//! binding headroom, and the control-message sub-header.
//!
//! ## Wire Format
//!
//! ```text
//! +----------------------+----------------------------+
//! | dest EID (1B)        | destination endpoint       |
//! +----------------------+----------------------------+
//! | src EID (1B)         | source endpoint            |
//! +----------------------+----------------------------+
//! | flags/seq/tag (1B)   | bit 7: SOM                 |
//! |                      | bit 6: EOM                 |
//! |                      | bits 5-3: packet tag       |
//! |                      | bits 2-1: sequence number  |
//! |                      | bit 0: tag owner           |
//! +----------------------+----------------------------+
//! | payload (0..N)       | message fragment           |
//! +----------------------+----------------------------+
//! ```
//!
//! The first payload byte of a completed message carries the IC
//! (integrity check) bit in bit 7 and the message type in the low
//! seven bits. Type `0x00` is reserved for transport control traffic.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod control;
pub mod eid;
pub mod error;
pub mod header;
pub mod packet;

// Re-export main types
pub use control::{
    msg_type, ControlCommand, ControlHeader, CONTROL_SUBHEADER_SIZE, IC_MASK, MCTP_TYPE_CONTROL,
};
pub use eid::{Eid, BROADCAST_EID, NULL_EID};
pub use error::WireError;
pub use header::{next_seq, PacketHeader, HEADER_SIZE, SEQ_MODULUS, TAG_MAX};
pub use packet::PacketBuffer;
