//! Binding capability trait.
//!
//! A binding is the engine's view of one transport: SMBus, PCIe VDM,
//! LPC, a loopback pipe in tests. The engine consumes bindings only
//! through this trait; the drivers themselves live outside the engine.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::TxError;
use mctp_wire::{Eid, PacketBuffer};

/// Capability interface describing one transport.
pub trait Binding {
    /// Human-readable binding name, used in logs.
    fn name(&self) -> &str;

    /// Binding version.
    fn version(&self) -> u8 {
        1
    }

    /// Maximum on-wire packet size (transport header plus payload).
    fn pkt_size(&self) -> usize;

    /// Head reservation the binding needs in front of each packet for
    /// its own physical framing.
    fn pkt_pad(&self) -> usize {
        0
    }

    /// Transmit one packet.
    ///
    /// The engine invokes this only while [`Binding::tx_enabled`] is
    /// true.
    fn tx(&mut self, pkt: &PacketBuffer) -> Result<(), TxError>;

    /// Transmit latch. Mutated exclusively by the binding or its owner
    /// in response to physical flow control; the engine only reads it.
    fn tx_enabled(&self) -> bool {
        true
    }

    /// Optional control-message handler.
    ///
    /// Invoked for completed messages of the reserved Control type
    /// (`0x00`) with the full payload. Returning `true` consumes the
    /// message and bypasses the generic handler table; the default
    /// (no control handler registered) returns `false` and lets the
    /// message fall through to generic dispatch.
    fn control_rx(&mut self, src: Eid, payload: &[u8]) -> bool {
        let _ = (src, payload);
        false
    }
}

/// Shared binding handle.
///
/// Registration hands the context a clone; the owner keeps one to
/// drive receive and toggle the transmit latch. `Rc` (not `Arc`) is
/// deliberate: the engine is single-threaded by contract.
pub type SharedBinding = Rc<RefCell<dyn Binding>>;

/// Transmit through a binding, honoring its latch.
///
/// A disabled binding fails synchronously with [`TxError::NotReady`]
/// without its transmit path being touched; the engine never queues on
/// behalf of a disabled binding.
pub(crate) fn transmit(binding: &SharedBinding, pkt: &PacketBuffer) -> Result<(), TxError> {
    let mut binding = binding.borrow_mut();
    if !binding.tx_enabled() {
        return Err(TxError::NotReady);
    }
    binding.tx(pkt)
}
