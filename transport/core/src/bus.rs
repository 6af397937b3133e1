//! Bus registration state.
//!
//! A bus associates one binding with either a local endpoint ID
//! (terminating bus) or a partner bus (bridge pair). Buses are created
//! at registration and live as long as the owning context.

use std::fmt;

use crate::binding::SharedBinding;
use crate::reassembly::ReassemblyEngine;
use mctp_wire::Eid;

/// Handle to a registered bus within one [`crate::Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(pub(crate) usize);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus{}", self.0)
    }
}

/// What a bus does with accepted packets.
pub(crate) enum BusKind {
    /// Terminates traffic addressed to `eid`, reassembling per source.
    Terminating {
        eid: Eid,
        reassembly: ReassemblyEngine,
    },
    /// Relays every packet verbatim to the partner bus's binding.
    Bridge { partner: BusId },
}

/// One registered bus.
pub(crate) struct Bus {
    pub binding: SharedBinding,
    pub kind: BusKind,
}

impl Bus {
    /// Local endpoint ID for terminating buses.
    pub fn local_eid(&self) -> Option<Eid> {
        match self.kind {
            BusKind::Terminating { eid, .. } => Some(eid),
            BusKind::Bridge { .. } => None,
        }
    }

    /// Whether a terminating bus accepts packets for `dest`.
    ///
    /// Bridge buses accept everything; that check happens before this
    /// one on the receive path.
    pub fn accepts(&self, dest: Eid) -> bool {
        match self.local_eid() {
            Some(eid) => dest == eid || dest.is_broadcast(),
            None => true,
        }
    }
}
