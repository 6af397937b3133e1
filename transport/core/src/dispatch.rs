//! Completed-message dispatch.
//!
//! The dispatcher maps message types to handlers, with an optional
//! catch-all behind the table. Handlers are boxed closures and own
//! whatever state they capture; this replaces the C-style callback
//! plus `void *` context pair. An unsupported message type is not an
//! error condition.

use std::collections::HashMap;

use tracing::debug;

use mctp_wire::Eid;

/// Handler for one registered message type. Receives the source
/// endpoint and the full assembled payload, type byte included.
pub type Handler = Box<dyn FnMut(Eid, &[u8])>;

/// Catch-all handler; additionally receives the extracted type.
pub type CatchAll = Box<dyn FnMut(u8, Eid, &[u8])>;

/// Where a completed message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A type-keyed handler took it
    Handler,
    /// The catch-all took it
    CatchAll,
    /// Nothing was registered; message dropped
    Unhandled,
}

/// Type-keyed handler table with optional catch-all.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<u8, Handler>,
    catch_all: Option<CatchAll>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for one message type, replacing any
    /// previous registration.
    pub fn set_handler(&mut self, msg_type: u8, handler: impl FnMut(Eid, &[u8]) + 'static) {
        self.handlers.insert(msg_type, Box::new(handler));
    }

    /// Register the catch-all handler for types with no registration
    /// of their own.
    pub fn set_catch_all(&mut self, handler: impl FnMut(u8, Eid, &[u8]) + 'static) {
        self.catch_all = Some(Box::new(handler));
    }

    /// Deliver one completed message.
    pub fn dispatch(&mut self, msg_type: u8, src: Eid, payload: &[u8]) -> Delivery {
        if let Some(handler) = self.handlers.get_mut(&msg_type) {
            handler(src, payload);
            return Delivery::Handler;
        }

        if let Some(catch_all) = self.catch_all.as_mut() {
            catch_all(msg_type, src, payload);
            return Delivery::CatchAll;
        }

        debug!(msg_type, %src, "no handler for message type, dropped");
        Delivery::Unhandled
    }
}
