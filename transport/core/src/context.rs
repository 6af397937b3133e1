//! Transport context.
//!
//! A [`Context`] is the unit of instantiation: it owns the bus list
//! and the handler table, and nothing is process-global. A program may
//! host several independent contexts, for example the two sides of a
//! bridge test rig.

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::binding::{transmit, SharedBinding};
use crate::bus::{Bus, BusId, BusKind};
use crate::dispatch::{Delivery, Dispatcher};
use crate::error::CoreError;
use crate::reassembly::ReassemblyEngine;
use mctp_wire::{
    msg_type, next_seq, Eid, PacketBuffer, PacketHeader, WireError, HEADER_SIZE,
    MCTP_TYPE_CONTROL,
};

/// What `bus_rx` decided to do once the bus borrow ends.
enum RxAction {
    Forward(BusId),
    Deliver(SharedBinding, Eid, bytes::Bytes),
    Done,
}

/// Owns the registered buses and the completed-message handler table.
#[derive(Default)]
pub struct Context {
    buses: Vec<Bus>,
    dispatcher: Dispatcher,
}

impl Context {
    /// Create a context with no buses and no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a terminating bus owning `local_eid`.
    pub fn register_bus(
        &mut self,
        binding: SharedBinding,
        local_eid: Eid,
    ) -> Result<BusId, CoreError> {
        if !local_eid.is_assignable() {
            return Err(CoreError::ReservedEid(local_eid.0));
        }

        let id = BusId(self.buses.len());
        debug!(bus = %id, eid = %local_eid, name = binding.borrow().name(), "registered terminating bus");
        self.buses.push(Bus {
            binding,
            kind: BusKind::Terminating {
                eid: local_eid,
                reassembly: ReassemblyEngine::new(),
            },
        });
        Ok(id)
    }

    /// Register a symmetric bridge pair. Neither side owns a local
    /// EID; packets received on one are relayed verbatim to the other.
    pub fn register_bridge(
        &mut self,
        binding_a: SharedBinding,
        binding_b: SharedBinding,
    ) -> Result<(BusId, BusId), CoreError> {
        let id_a = BusId(self.buses.len());
        let id_b = BusId(self.buses.len() + 1);

        debug!(
            a = %id_a,
            b = %id_b,
            name_a = binding_a.borrow().name(),
            name_b = binding_b.borrow().name(),
            "registered bridge pair"
        );
        self.buses.push(Bus {
            binding: binding_a,
            kind: BusKind::Bridge { partner: id_b },
        });
        self.buses.push(Bus {
            binding: binding_b,
            kind: BusKind::Bridge { partner: id_a },
        });
        Ok((id_a, id_b))
    }

    /// Register the handler for one message type.
    pub fn set_handler(&mut self, msg_type: u8, handler: impl FnMut(Eid, &[u8]) + 'static) {
        self.dispatcher.set_handler(msg_type, handler);
    }

    /// Register the catch-all handler.
    pub fn set_catch_all(&mut self, handler: impl FnMut(u8, Eid, &[u8]) + 'static) {
        self.dispatcher.set_catch_all(handler);
    }

    /// Local EID of a terminating bus, if `bus` is one.
    pub fn local_eid(&self, bus: BusId) -> Option<Eid> {
        self.buses.get(bus.0).and_then(Bus::local_eid)
    }

    /// Receive entry point: a binding calls this with the raw wire
    /// bytes of one packet.
    ///
    /// All protocol-level violations are dropped without surfacing an
    /// error; the transport is best-effort by design.
    pub fn bus_rx(&mut self, bus: BusId, raw: &[u8]) {
        let action = {
            let Some(entry) = self.buses.get_mut(bus.0) else {
                warn!(%bus, "receive on unknown bus");
                return;
            };

            if raw.len() < HEADER_SIZE {
                trace!(%bus, len = raw.len(), "runt packet dropped");
                return;
            }

            // Length was checked above; decode cannot fail.
            let Ok(header) = PacketHeader::decode(raw) else {
                return;
            };

            if !entry.accepts(header.dest) {
                trace!(%bus, dest = %header.dest, "destination mismatch, dropped");
                return;
            }

            match &mut entry.kind {
                // Bridged traffic is relayed at the packet level: no
                // reassembly, no dispatch.
                BusKind::Bridge { partner } => RxAction::Forward(*partner),

                BusKind::Terminating { reassembly, .. } => {
                    match reassembly.receive(&header, &raw[HEADER_SIZE..]) {
                        Some(message) => {
                            RxAction::Deliver(entry.binding.clone(), header.src, message)
                        }
                        None => RxAction::Done,
                    }
                }
            }
        };

        match action {
            RxAction::Forward(partner) => self.forward(bus, partner, raw),
            RxAction::Deliver(binding, src, message) => self.deliver(&binding, src, &message),
            RxAction::Done => {}
        }
    }

    /// Packetize and transmit one message toward `dest`.
    ///
    /// The message is fragmented to the first terminating bus's
    /// binding: sequence numbers start at 0 and advance modulo 4, SOM
    /// on the first packet, EOM on the last. A disabled binding fails
    /// the whole attempt; nothing is queued.
    pub fn message_tx(
        &mut self,
        dest: Eid,
        tag: u8,
        tag_owner: bool,
        message: &[u8],
    ) -> Result<(), CoreError> {
        if message.is_empty() {
            return Err(CoreError::EmptyMessage);
        }

        let (binding, src) = self
            .buses
            .iter()
            .find_map(|bus| match bus.kind {
                BusKind::Terminating { eid, .. } => Some((bus.binding.clone(), eid)),
                BusKind::Bridge { .. } => None,
            })
            .ok_or(CoreError::NoRoute(dest))?;

        let (pkt_size, pkt_pad) = {
            let binding = binding.borrow();
            (binding.pkt_size(), binding.pkt_pad())
        };
        if pkt_size <= HEADER_SIZE {
            return Err(CoreError::Wire(WireError::Oversize {
                need: HEADER_SIZE + 1,
                limit: pkt_size,
            }));
        }
        let max_payload = pkt_size - HEADER_SIZE;

        let total = message.len().div_ceil(max_payload);
        let mut seq = 0u8;
        for (k, chunk) in message.chunks(max_payload).enumerate() {
            let header = PacketHeader::new(dest, src)
                .with_framing(k == 0, k == total - 1)
                .with_tag(tag)
                .with_seq(seq)
                .with_tag_owner(tag_owner);

            let mut pkt = PacketBuffer::alloc(pkt_pad, chunk.len(), pkt_size)?;
            pkt.write_header(&header);
            pkt.payload_mut().copy_from_slice(chunk);

            transmit(&binding, &pkt)?;
            seq = next_seq(seq);
        }

        trace!(%dest, len = message.len(), fragments = total, "message transmitted");
        Ok(())
    }

    /// Sweep stalled reassembly contexts on every terminating bus.
    ///
    /// The engine carries no timer; the integrator owns the timeout
    /// policy and calls this at its chosen interval. Returns the
    /// number of contexts evicted.
    pub fn evict_stalled(&mut self, max_age: Duration) -> usize {
        self.buses
            .iter_mut()
            .map(|bus| match &mut bus.kind {
                BusKind::Terminating { reassembly, .. } => reassembly.evict_stalled(max_age),
                BusKind::Bridge { .. } => 0,
            })
            .sum()
    }

    /// Relay one packet byte-identical to the partner binding.
    fn forward(&mut self, from: BusId, partner: BusId, raw: &[u8]) {
        let Some(entry) = self.buses.get(partner.0) else {
            warn!(%partner, "bridge partner missing");
            return;
        };

        let pad = entry.binding.borrow().pkt_pad();
        let Ok(pkt) = PacketBuffer::from_wire(pad, raw) else {
            return;
        };

        match transmit(&entry.binding, &pkt) {
            Ok(()) => trace!(%from, to = %partner, len = raw.len(), "bridged packet"),
            Err(err) => debug!(%from, to = %partner, %err, "bridge forward dropped"),
        }
    }

    /// Hand one completed message to control or generic dispatch.
    fn deliver(&mut self, binding: &SharedBinding, src: Eid, message: &[u8]) {
        let Some(msg_type) = msg_type(message) else {
            debug!(%src, "empty message dropped");
            return;
        };

        if msg_type == MCTP_TYPE_CONTROL && binding.borrow_mut().control_rx(src, message) {
            trace!(%src, "control message consumed by binding");
            return;
        }

        if self.dispatcher.dispatch(msg_type, src, message) == Delivery::Unhandled {
            trace!(%src, msg_type, "message had no handler");
        }
    }
}
