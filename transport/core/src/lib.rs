//! MCTP bus registration, packet reassembly, message dispatch, and
//! bridging.
//!
//! This crate is the transport engine proper. A [`Context`] owns a set
//! of buses, each pairing a [`Binding`] (the physical or logical
//! transport) with either a local endpoint ID (terminating bus) or a
//! partner bus (bridge pair). A binding feeds received packets into
//! [`Context::bus_rx`]; terminating buses reassemble multi-packet
//! messages per source endpoint and dispatch completed messages to
//! registered handlers, while bridge buses relay packets verbatim to
//! their partner.
//!
//! ## Concurrency
//!
//! The engine is single-threaded and callback-driven by contract:
//! `bus_rx` and `tx` run synchronously on the calling thread, handlers
//! run with the receive path blocked, and there are no internal locks
//! or queues. Layer concurrency above the engine by message passing
//! into a task that owns the `Context`, never by locking inside it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binding;
pub mod bus;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod reassembly;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types
pub use binding::{Binding, SharedBinding};
pub use bus::BusId;
pub use context::Context;
pub use dispatch::{Delivery, Dispatcher};
pub use error::{CoreError, TxError};
pub use reassembly::ReassemblyEngine;
