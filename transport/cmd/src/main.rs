//! mctpd: MCTP packet demux and bridge daemon.
//!
//! Hosts one transport context on a dedicated core thread. Tokio tasks
//! own the Unix sockets and feed raw packets and application messages
//! into the core over an mpsc channel; the core thread runs the
//! single-threaded engine and sweeps stalled reassembly state on a
//! timer.

mod config;
mod logging;
mod socket;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use config::{DaemonConfig, Mode};
use logging::MctpdLogFormatter;
use mctp_core::{BusId, Context, SharedBinding};
use mctp_wire::Eid;
use socket::{serve_app_socket, serve_packet_socket, SocketBinding};

/// Which packet socket a frame arrived on.
#[derive(Debug, Clone, Copy)]
pub enum Side {
    A,
    B,
}

/// Messages into the core thread.
pub enum CoreMsg {
    /// One raw packet read from a packet socket.
    Rx { side: Side, raw: Vec<u8> },
    /// One application message to packetize and transmit.
    Tx { dest: u8, message: Vec<u8> },
}

#[derive(Parser, Debug)]
#[command(name = "mctpd", version, about = "MCTP packet demux and bridge daemon")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "/etc/mctpd/config.yaml")]
    config: PathBuf,

    /// Override the operating mode (terminate, bridge)
    #[arg(long)]
    mode: Option<String>,

    /// Override the local endpoint ID
    #[arg(long)]
    eid: Option<u8>,

    /// Override the stalled-reassembly eviction age, e.g. "6s"
    #[arg(long)]
    reassembly_timeout: Option<humantime::Duration>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(MctpdLogFormatter::new("mctpd"))
        .init();

    let mut config = DaemonConfig::load_from_file(&args.config)?;
    if let Some(mode) = args.mode.as_deref() {
        config.mode = match mode {
            "terminate" => Mode::Terminate,
            "bridge" => Mode::Bridge,
            other => bail!("unknown mode {other:?} (expected terminate or bridge)"),
        };
    }
    if let Some(eid) = args.eid {
        config.eid = eid;
    }
    if let Some(timeout) = args.reassembly_timeout {
        config.reassembly_timeout_secs = timeout.as_secs().max(1);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: DaemonConfig) -> Result<()> {
    info!(mode = ?config.mode, "mctpd starting");

    let (core_tx, core_rx) = std::sync::mpsc::channel::<CoreMsg>();

    match config.mode {
        Mode::Terminate => {
            let (pkt_out_tx, pkt_out_rx) = unbounded_channel();
            let (deliver_tx, deliver_rx) = unbounded_channel();

            serve_packet_socket(
                &config.packet_socket,
                "pkt".to_string(),
                Side::A,
                core_tx.clone(),
                pkt_out_rx,
            )?;
            serve_app_socket(&config.app_socket, core_tx.clone(), deliver_rx)?;
            spawn_core_terminate(&config, core_rx, pkt_out_tx, deliver_tx)?;
        }
        Mode::Bridge => {
            let (a_out_tx, a_out_rx) = unbounded_channel();
            let (b_out_tx, b_out_rx) = unbounded_channel();

            serve_packet_socket(
                &config.packet_socket,
                "pkt-a".to_string(),
                Side::A,
                core_tx.clone(),
                a_out_rx,
            )?;
            serve_packet_socket(
                &config.bridge_socket,
                "pkt-b".to_string(),
                Side::B,
                core_tx.clone(),
                b_out_rx,
            )?;
            spawn_core_bridge(&config, core_rx, a_out_tx, b_out_tx)?;
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    drop(core_tx);
    Ok(())
}

/// Core thread for terminate mode: one terminating bus, completed
/// messages handed to the app-socket demultiplexer.
fn spawn_core_terminate(
    config: &DaemonConfig,
    core_rx: Receiver<CoreMsg>,
    pkt_out_tx: UnboundedSender<Vec<u8>>,
    deliver_tx: UnboundedSender<(u8, u8, Vec<u8>)>,
) -> Result<()> {
    let eid = config.eid;
    let pkt_size = config.pkt_size;
    let timeout = Duration::from_secs(config.reassembly_timeout_secs);
    let sweep = Duration::from_secs(config.sweep_interval_secs);

    // The engine holds Rc internals, so the context is built inside
    // the thread it lives on.
    std::thread::Builder::new()
        .name("mctp-core".to_string())
        .spawn(move || {
            let binding: SharedBinding =
                Rc::new(RefCell::new(SocketBinding::new("pkt", pkt_size, pkt_out_tx)));

            let mut ctx = Context::new();
            let bus = match ctx.register_bus(binding, Eid(eid)) {
                Ok(bus) => bus,
                Err(err) => {
                    error!(%err, eid, "bus registration failed");
                    return;
                }
            };
            ctx.set_catch_all(move |msg_type, src, payload| {
                if deliver_tx.send((msg_type, src.0, payload.to_vec())).is_err() {
                    debug!("app demux gone, message dropped");
                }
            });

            core_loop(ctx, core_rx, move |_| bus, timeout, sweep);
        })?;

    Ok(())
}

/// Core thread for bridge mode: two bridged buses, packets relayed
/// between them.
fn spawn_core_bridge(
    config: &DaemonConfig,
    core_rx: Receiver<CoreMsg>,
    a_out_tx: UnboundedSender<Vec<u8>>,
    b_out_tx: UnboundedSender<Vec<u8>>,
) -> Result<()> {
    let pkt_size = config.pkt_size;
    let timeout = Duration::from_secs(config.reassembly_timeout_secs);
    let sweep = Duration::from_secs(config.sweep_interval_secs);

    std::thread::Builder::new()
        .name("mctp-core".to_string())
        .spawn(move || {
            let binding_a: SharedBinding =
                Rc::new(RefCell::new(SocketBinding::new("pkt-a", pkt_size, a_out_tx)));
            let binding_b: SharedBinding =
                Rc::new(RefCell::new(SocketBinding::new("pkt-b", pkt_size, b_out_tx)));

            let mut ctx = Context::new();
            let (bus_a, bus_b) = match ctx.register_bridge(binding_a, binding_b) {
                Ok(pair) => pair,
                Err(err) => {
                    error!(%err, "bridge registration failed");
                    return;
                }
            };

            core_loop(
                ctx,
                core_rx,
                move |side| match side {
                    Side::A => bus_a,
                    Side::B => bus_b,
                },
                timeout,
                sweep,
            );
        })?;

    Ok(())
}

/// Single-threaded engine loop. Blocks on the core channel with a
/// timeout so the eviction sweep runs even when the sockets are idle;
/// exits when every sender is gone.
fn core_loop(
    mut ctx: Context,
    core_rx: Receiver<CoreMsg>,
    bus_for: impl Fn(Side) -> BusId,
    timeout: Duration,
    sweep: Duration,
) {
    info!("core loop running");
    loop {
        match core_rx.recv_timeout(sweep) {
            Ok(CoreMsg::Rx { side, raw }) => ctx.bus_rx(bus_for(side), &raw),
            Ok(CoreMsg::Tx { dest, message }) => {
                if let Err(err) = ctx.message_tx(Eid(dest), 0, true, &message) {
                    warn!(%err, dest, "message transmit failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                let evicted = ctx.evict_stalled(timeout);
                if evicted > 0 {
                    debug!(evicted, "evicted stalled reassembly contexts");
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!("core loop stopped");
}
