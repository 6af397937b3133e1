//! Owned packet buffers with binding headroom.
//!
//! A [`PacketBuffer`] holds one on-wire packet (transport header plus
//! payload) preceded by a head reservation sized for the owning
//! binding's physical framing (`pkt_pad`). A binding prepends its own
//! medium header into the reservation with [`PacketBuffer::push_head`]
//! instead of copying the packet.
//!
//! Buffers are created per receive or transmit event and dropped after
//! dispatch or transmission; there is no pooling.

use bytes::BytesMut;

use crate::error::WireError;
use crate::header::{PacketHeader, HEADER_SIZE};

/// One packet: `[head reservation][header][payload]`.
#[derive(Debug)]
pub struct PacketBuffer {
    data: BytesMut,
    /// Offset of the transport header within `data`. Starts at the
    /// full reservation and moves down as `push_head` consumes it.
    start: usize,
    /// Offset of the wire region proper (header byte 0).
    wire_start: usize,
}

impl PacketBuffer {
    /// Allocate a zeroed buffer for a packet with `payload_len` payload
    /// bytes.
    ///
    /// Fails with [`WireError::Oversize`] when the on-wire portion
    /// (header plus payload) would exceed the binding's `pkt_size`.
    /// Such a failure is fatal for this single transmit attempt; the
    /// caller does not retry at this layer.
    pub fn alloc(pkt_pad: usize, payload_len: usize, pkt_size: usize) -> Result<Self, WireError> {
        let wire_len = HEADER_SIZE + payload_len;
        if wire_len > pkt_size {
            return Err(WireError::Oversize {
                need: wire_len,
                limit: pkt_size,
            });
        }

        let mut data = BytesMut::with_capacity(pkt_pad + wire_len);
        data.resize(pkt_pad + wire_len, 0);

        Ok(Self {
            data,
            start: pkt_pad,
            wire_start: pkt_pad,
        })
    }

    /// Wrap a received wire packet (header plus payload), reserving
    /// `pkt_pad` bytes of headroom in front of it.
    pub fn from_wire(pkt_pad: usize, raw: &[u8]) -> Result<Self, WireError> {
        if raw.len() < HEADER_SIZE {
            return Err(WireError::Truncated);
        }

        let mut data = BytesMut::with_capacity(pkt_pad + raw.len());
        data.resize(pkt_pad, 0);
        data.extend_from_slice(raw);

        Ok(Self {
            data,
            start: pkt_pad,
            wire_start: pkt_pad,
        })
    }

    /// Remaining head reservation in bytes.
    pub fn headroom(&self) -> usize {
        self.start
    }

    /// Prepend binding framing into the head reservation.
    pub fn push_head(&mut self, prefix: &[u8]) -> Result<(), WireError> {
        if prefix.len() > self.start {
            return Err(WireError::Headroom);
        }
        let new_start = self.start - prefix.len();
        self.data[new_start..self.start].copy_from_slice(prefix);
        self.start = new_start;
        Ok(())
    }

    /// The transport header bytes.
    pub fn header(&self) -> &[u8] {
        &self.data[self.wire_start..self.wire_start + HEADER_SIZE]
    }

    /// Mutable transport header bytes.
    pub fn header_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.wire_start..self.wire_start + HEADER_SIZE]
    }

    /// The payload bytes, disjoint from the header view.
    pub fn payload(&self) -> &[u8] {
        &self.data[self.wire_start + HEADER_SIZE..]
    }

    /// Mutable payload bytes.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.wire_start + HEADER_SIZE..]
    }

    /// Payload length in bytes.
    pub fn payload_len(&self) -> usize {
        self.data.len() - self.wire_start - HEADER_SIZE
    }

    /// The full buffer from the current head position: any pushed
    /// binding framing, then header, then payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.start..]
    }

    /// The on-wire packet (header plus payload), excluding any binding
    /// framing.
    pub fn wire_bytes(&self) -> &[u8] {
        &self.data[self.wire_start..]
    }

    /// Write a decoded header into the buffer.
    pub fn write_header(&mut self, header: &PacketHeader) {
        header.encode_into(self.header_mut());
    }

    /// Decode the transport header.
    pub fn parse_header(&self) -> Result<PacketHeader, WireError> {
        PacketHeader::decode(self.header())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eid::Eid;

    #[test]
    fn test_alloc_within_limit() {
        let pkt = PacketBuffer::alloc(4, 10, 64).unwrap();
        assert_eq!(pkt.headroom(), 4);
        assert_eq!(pkt.payload_len(), 10);
        assert_eq!(pkt.wire_bytes().len(), HEADER_SIZE + 10);
    }

    #[test]
    fn test_alloc_oversize() {
        let err = PacketBuffer::alloc(0, 64, 64).unwrap_err();
        assert!(matches!(
            err,
            WireError::Oversize { need: 67, limit: 64 }
        ));
    }

    #[test]
    fn test_header_payload_views_disjoint() {
        let mut pkt = PacketBuffer::alloc(0, 4, 64).unwrap();
        pkt.header_mut().copy_from_slice(&[1, 2, 3]);
        pkt.payload_mut().copy_from_slice(&[9, 9, 9, 9]);

        assert_eq!(pkt.header(), &[1, 2, 3]);
        assert_eq!(pkt.payload(), &[9, 9, 9, 9]);
        assert_eq!(pkt.wire_bytes(), &[1, 2, 3, 9, 9, 9, 9]);
    }

    #[test]
    fn test_from_wire() {
        let raw = [0x08, 0x09, 0x00, 0xAA, 0xBB];
        let pkt = PacketBuffer::from_wire(2, &raw).unwrap();
        assert_eq!(pkt.headroom(), 2);
        assert_eq!(pkt.wire_bytes(), &raw);
        assert_eq!(pkt.payload(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_from_wire_truncated() {
        assert!(matches!(
            PacketBuffer::from_wire(0, &[0x08, 0x09]),
            Err(WireError::Truncated)
        ));
    }

    #[test]
    fn test_push_head() {
        let mut pkt = PacketBuffer::from_wire(3, &[1, 2, 3, 4]).unwrap();
        pkt.push_head(&[0xF0, 0xF1]).unwrap();
        assert_eq!(pkt.headroom(), 1);
        assert_eq!(pkt.as_bytes(), &[0xF0, 0xF1, 1, 2, 3, 4]);
        // The wire view is unaffected by pushed framing.
        assert_eq!(pkt.wire_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_push_head_exhausted() {
        let mut pkt = PacketBuffer::from_wire(1, &[1, 2, 3]).unwrap();
        assert!(matches!(pkt.push_head(&[0, 0]), Err(WireError::Headroom)));
    }

    #[test]
    fn test_write_parse_header() {
        let mut pkt = PacketBuffer::alloc(0, 0, 64).unwrap();
        let header = PacketHeader::new(Eid(8), Eid(9)).with_framing(true, true);
        pkt.write_header(&header);
        assert_eq!(pkt.parse_header().unwrap(), header);
    }
}
