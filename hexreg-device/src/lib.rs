//! # hexreg Device Simulator
//!
//! A software stand-in for a hexreg device: the full register memory map
//! with its side-effect semantics, a command interpreter, and a TCP server
//! speaking the frame protocol of the
//! [`hexreg_protocol`](https://docs.rs/hexreg-protocol/) crate.
//!
//! ## Architecture
//!
//! The crate is built around three layers:
//!
//! - **[`memory::DeviceMemory`]**: the authoritative register bytes and the
//!   semantics of writing them: write masks, power propagation into the
//!   MAIN status registers, and auto-clearing reset strobes.
//! - **[`engine::Engine`]**: the command interpreter. It validates raw
//!   payloads, dispatches commands against the memory under a single mutex,
//!   builds response frames, and advances the sensor simulation after each
//!   dispatched command.
//! - **[`server::DeviceServer`]**: a TCP server that owns the listener and
//!   at most one client at a time, greets clients with `ACK`, recognizes
//!   the `exit` token, and shuttles payloads through the engine.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use hexreg_device::{engine::Engine, server::{Config, DeviceServer}};
//!
//! let engine = Arc::new(Engine::new());
//! let mut server = DeviceServer::new(engine, Config::default());
//! server.start()?;
//! // ... clients connect, exchange frames ...
//! server.stop();
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! The engine can also be exercised without any transport, which is how
//! most of the test suite drives it:
//!
//! ```
//! use hexreg_device::engine::Engine;
//!
//! let engine = Engine::with_seed(1);
//! assert_eq!(engine.process_command("310180"), "310180"); // write echoes
//! assert_eq!(engine.process_command("310000"), "310080"); // read returns
//! ```
//!
//! ## Concurrency
//!
//! One mutex guards the register block; a command is interpreted and its
//! sensor tick applied before the next command may begin. The server runs
//! its accept/read/dispatch loop on one background thread.
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics. Enable a logger
//! implementation such as `env_logger` to see connections, dispatched
//! frames and shutdown progress.

pub mod engine;
pub mod memory;
pub mod server;
pub mod sim;
