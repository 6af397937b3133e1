//! Control-message sub-header parsing.
//!
//! The first byte of every assembled message carries the IC
//! (integrity check) bit in bit 7 and the message type in the low
//! seven bits. Type `0x00` is reserved for transport control traffic;
//! control messages carry a request/response flag in bit 6 of the
//! first byte and a one-byte command code after it.
//!
//! The engine extracts the type and routes control traffic; it never
//! verifies the IC bit and never branches on the request flag itself.

use crate::error::WireError;

/// Reserved message type for transport control traffic.
pub const MCTP_TYPE_CONTROL: u8 = 0x00;

/// Integrity-check bit of the message type byte.
pub const IC_MASK: u8 = 0x80;

/// Request/response bit of the control sub-header.
const REQUEST_MASK: u8 = 0x40;

/// Control sub-header size: type/flags byte plus command code.
pub const CONTROL_SUBHEADER_SIZE: usize = 2;

/// Extract the message type from an assembled payload.
///
/// Returns `None` for an empty message, which carries no type byte.
#[inline]
pub fn msg_type(payload: &[u8]) -> Option<u8> {
    payload.first().map(|b| b & !IC_MASK)
}

/// Known control command codes (DSP0236 subset).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Assign an endpoint ID to a device
    SetEndpointId = 0x01,
    /// Query a device's endpoint ID
    GetEndpointId = 0x02,
    /// Query supported MCTP versions
    GetVersionSupport = 0x04,
    /// Query supported message types
    GetMessageTypeSupport = 0x05,
}

impl TryFrom<u8> for ControlCommand {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(ControlCommand::SetEndpointId),
            0x02 => Ok(ControlCommand::GetEndpointId),
            0x04 => Ok(ControlCommand::GetVersionSupport),
            0x05 => Ok(ControlCommand::GetMessageTypeSupport),
            _ => Err(WireError::Command(value)),
        }
    }
}

/// Parsed control-message sub-header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlHeader {
    /// IC flag of the type byte
    pub ic: bool,
    /// Request (set) or response (clear)
    pub request: bool,
    /// Raw command code; see [`ControlCommand`] for known values
    pub command: u8,
}

impl ControlHeader {
    /// Parse the sub-header from a full control-message payload.
    pub fn parse(payload: &[u8]) -> Result<Self, WireError> {
        if payload.len() < CONTROL_SUBHEADER_SIZE {
            return Err(WireError::Truncated);
        }

        Ok(Self {
            ic: payload[0] & IC_MASK != 0,
            request: payload[0] & REQUEST_MASK != 0,
            command: payload[1],
        })
    }

    /// The command as a known code, if it is one.
    pub fn known_command(&self) -> Option<ControlCommand> {
        ControlCommand::try_from(self.command).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_type_masks_ic() {
        assert_eq!(msg_type(&[0x81, 0x00]), Some(0x01));
        assert_eq!(msg_type(&[0x01]), Some(0x01));
        assert_eq!(msg_type(&[]), None);
    }

    #[test]
    fn test_control_header_parse() {
        // IC set, request set, Get Endpoint ID
        let header = ControlHeader::parse(&[0xC0, 0x02, 0xAA]).unwrap();
        assert!(header.ic);
        assert!(header.request);
        assert_eq!(header.command, 0x02);
        assert_eq!(header.known_command(), Some(ControlCommand::GetEndpointId));
    }

    #[test]
    fn test_control_header_response() {
        let header = ControlHeader::parse(&[0x00, 0x01]).unwrap();
        assert!(!header.ic);
        assert!(!header.request);
        assert_eq!(header.known_command(), Some(ControlCommand::SetEndpointId));
    }

    #[test]
    fn test_control_header_truncated() {
        assert!(matches!(
            ControlHeader::parse(&[0x00]),
            Err(WireError::Truncated)
        ));
    }

    #[test]
    fn test_unknown_command() {
        let header = ControlHeader::parse(&[0x40, 0x7E]).unwrap();
        assert_eq!(header.known_command(), None);
        assert!(matches!(
            ControlCommand::try_from(0x7E),
            Err(WireError::Command(0x7E))
        ));
    }
}
