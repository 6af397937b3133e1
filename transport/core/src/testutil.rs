//! In-memory binding used by the crate's unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::binding::Binding;
use crate::error::TxError;
use mctp_wire::{Eid, PacketBuffer};

/// Binding that records transmitted packets instead of sending them.
pub(crate) struct TestBinding {
    pub name: String,
    pub pkt_size: usize,
    pub pad: usize,
    pub enabled: bool,
    pub fail_tx: bool,
    pub consume_control: bool,
    /// Wire bytes of each transmitted packet.
    pub sent: Rc<RefCell<Vec<Vec<u8>>>>,
    /// Control messages the binding consumed.
    pub control_seen: Rc<RefCell<Vec<(Eid, Vec<u8>)>>>,
}

impl TestBinding {
    pub fn new(name: &str, pkt_size: usize) -> Rc<RefCell<Self>> {
        Self::with_pad(name, pkt_size, 0)
    }

    pub fn with_pad(name: &str, pkt_size: usize, pad: usize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            name: name.to_string(),
            pkt_size,
            pad,
            enabled: true,
            fail_tx: false,
            consume_control: false,
            sent: Rc::new(RefCell::new(Vec::new())),
            control_seen: Rc::new(RefCell::new(Vec::new())),
        }))
    }
}

impl Binding for TestBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn pkt_size(&self) -> usize {
        self.pkt_size
    }

    fn pkt_pad(&self) -> usize {
        self.pad
    }

    fn tx(&mut self, pkt: &PacketBuffer) -> Result<(), TxError> {
        if self.fail_tx {
            return Err(TxError::Failed("injected failure".to_string()));
        }
        self.sent.borrow_mut().push(pkt.wire_bytes().to_vec());
        Ok(())
    }

    fn tx_enabled(&self) -> bool {
        self.enabled
    }

    fn control_rx(&mut self, src: Eid, payload: &[u8]) -> bool {
        if self.consume_control {
            self.control_seen.borrow_mut().push((src, payload.to_vec()));
            true
        } else {
            false
        }
    }
}
