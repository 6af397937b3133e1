//! Per-source fragment reassembly.
//!
//! Each terminating bus owns one engine, keyed by source endpoint.
//! A Start-of-Message packet opens a pending context recording the
//! packet tag and the next expected sequence number; continuation
//! packets must match both or the whole pending message is discarded
//! with no partial delivery. End-of-Message completes the context and
//! yields the concatenated payload exactly once.
//!
//! The engine carries no timer. A pending context that never completes
//! is held until a new SOM from the same source supersedes it or the
//! owner sweeps it out with [`ReassemblyEngine::evict_stalled`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use mctp_wire::{next_seq, Eid, PacketHeader};

/// One in-flight message from a single source endpoint.
struct Pending {
    tag: u8,
    next_seq: u8,
    buf: BytesMut,
    started: Instant,
}

/// Per-source-endpoint reassembly state machine.
#[derive(Default)]
pub struct ReassemblyEngine {
    pending: HashMap<Eid, Pending>,
}

impl ReassemblyEngine {
    /// Create an engine with no pending state.
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Feed one accepted packet into the machine.
    ///
    /// Returns the complete message payload when this packet finishes
    /// one; protocol violations discard state and return nothing.
    pub fn receive(&mut self, header: &PacketHeader, payload: &[u8]) -> Option<Bytes> {
        let src = header.src;

        if header.som {
            if header.eom {
                // Single-packet message: deliver as-is. Any pending
                // context from this source stays untouched per the
                // framing rules, since this packet never joined it.
                return Some(Bytes::copy_from_slice(payload));
            }

            // Last SOM wins: a fresh start silently replaces whatever
            // was pending from this source.
            if self.pending.contains_key(&src) {
                trace!(%src, "new SOM supersedes pending message");
            }
            let mut buf = BytesMut::new();
            buf.extend_from_slice(payload);
            self.pending.insert(
                src,
                Pending {
                    tag: header.tag,
                    next_seq: next_seq(header.seq),
                    buf,
                    started: Instant::now(),
                },
            );
            return None;
        }

        // Continuation packet: must match a pending context.
        let Some(pending) = self.pending.get_mut(&src) else {
            trace!(%src, "continuation without pending message, dropped");
            return None;
        };

        if header.tag != pending.tag {
            debug!(
                %src,
                got = header.tag,
                want = pending.tag,
                "tag mismatch, reassembly aborted"
            );
            self.pending.remove(&src);
            return None;
        }

        if header.seq != pending.next_seq {
            debug!(
                %src,
                got = header.seq,
                want = pending.next_seq,
                "sequence violation, reassembly aborted"
            );
            self.pending.remove(&src);
            return None;
        }

        pending.buf.extend_from_slice(payload);
        pending.next_seq = next_seq(pending.next_seq);

        if header.eom {
            return self.pending.remove(&src).map(|done| done.buf.freeze());
        }

        None
    }

    /// Discard pending contexts older than `max_age`.
    ///
    /// The engine never runs this on its own; the integrator decides
    /// the timeout policy and calls the sweep. Returns the number of
    /// contexts evicted.
    pub fn evict_stalled(&mut self, max_age: Duration) -> usize {
        let before = self.pending.len();
        self.pending.retain(|src, pending| {
            let keep = pending.started.elapsed() < max_age;
            if !keep {
                debug!(%src, "evicting stalled reassembly context");
            }
            keep
        });
        before - self.pending.len()
    }

    /// Number of sources with a pending message.
    pub fn pending_sources(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hdr(src: u8, som: bool, eom: bool, tag: u8, seq: u8) -> PacketHeader {
        PacketHeader::new(Eid(8), Eid(src))
            .with_framing(som, eom)
            .with_tag(tag)
            .with_seq(seq)
    }

    #[test]
    fn test_single_packet_message() {
        let mut engine = ReassemblyEngine::new();
        let msg = engine.receive(&hdr(9, true, true, 0, 0), b"\x01hello");
        assert_eq!(msg.unwrap().as_ref(), b"\x01hello");
        assert_eq!(engine.pending_sources(), 0);
    }

    #[test]
    fn test_three_fragment_message() {
        let mut engine = ReassemblyEngine::new();
        assert!(engine.receive(&hdr(9, true, false, 2, 0), b"aa").is_none());
        assert!(engine.receive(&hdr(9, false, false, 2, 1), b"bb").is_none());
        let msg = engine.receive(&hdr(9, false, true, 2, 2), b"cc");
        assert_eq!(msg.unwrap().as_ref(), b"aabbcc");
        assert_eq!(engine.pending_sources(), 0);
    }

    #[test]
    fn test_sequence_wraparound() {
        let mut engine = ReassemblyEngine::new();
        assert!(engine.receive(&hdr(9, true, false, 0, 3), b"left").is_none());
        let msg = engine.receive(&hdr(9, false, true, 0, 0), b"right");
        assert_eq!(msg.unwrap().as_ref(), b"leftright");
    }

    #[test]
    fn test_sequence_skip_aborts() {
        let mut engine = ReassemblyEngine::new();
        assert!(engine.receive(&hdr(9, true, false, 0, 1), b"aa").is_none());
        // seq 2 omitted
        assert!(engine.receive(&hdr(9, false, true, 0, 3), b"cc").is_none());
        // No residue: a later valid message is unaffected.
        assert_eq!(engine.pending_sources(), 0);
        let msg = engine.receive(&hdr(9, true, true, 0, 0), b"ok");
        assert_eq!(msg.unwrap().as_ref(), b"ok");
    }

    #[test]
    fn test_tag_mismatch_aborts() {
        let mut engine = ReassemblyEngine::new();
        assert!(engine.receive(&hdr(9, true, false, 1, 0), b"aa").is_none());
        assert!(engine.receive(&hdr(9, false, true, 2, 1), b"bb").is_none());
        assert_eq!(engine.pending_sources(), 0);
    }

    #[test]
    fn test_last_som_wins() {
        let mut engine = ReassemblyEngine::new();
        assert!(engine.receive(&hdr(9, true, false, 0, 0), b"old").is_none());
        // A new SOM replaces the pending context without delivery.
        assert!(engine.receive(&hdr(9, true, false, 0, 2), b"new").is_none());
        assert_eq!(engine.pending_sources(), 1);
        let msg = engine.receive(&hdr(9, false, true, 0, 3), b"!");
        assert_eq!(msg.unwrap().as_ref(), b"new!");
    }

    #[test]
    fn test_continuation_without_som_dropped() {
        let mut engine = ReassemblyEngine::new();
        assert!(engine.receive(&hdr(9, false, true, 0, 0), b"aa").is_none());
        assert_eq!(engine.pending_sources(), 0);
    }

    #[test]
    fn test_sources_are_independent() {
        let mut engine = ReassemblyEngine::new();
        assert!(engine.receive(&hdr(9, true, false, 0, 0), b"a9").is_none());
        assert!(engine.receive(&hdr(10, true, false, 0, 0), b"a10").is_none());

        let msg = engine.receive(&hdr(9, false, true, 0, 1), b"!");
        assert_eq!(msg.unwrap().as_ref(), b"a9!");
        // Source 10 still pending.
        assert_eq!(engine.pending_sources(), 1);
    }

    #[test]
    fn test_evict_stalled() {
        let mut engine = ReassemblyEngine::new();
        assert!(engine.receive(&hdr(9, true, false, 0, 0), b"aa").is_none());
        assert_eq!(engine.evict_stalled(Duration::from_secs(60)), 0);
        assert_eq!(engine.evict_stalled(Duration::ZERO), 1);
        assert_eq!(engine.pending_sources(), 0);
    }
}
