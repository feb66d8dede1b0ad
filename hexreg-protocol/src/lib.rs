//! # hexreg Protocol Library
//!
//! This crate implements the wire protocol spoken between a hexreg device
//! and its driver: a register-oriented request/response protocol carried as
//! fixed-size textual frames over a reliable byte stream.
//!
//! ## Overview
//!
//! A hexreg device exposes an 8-bit register memory map split into five base
//! address spaces (reserved, main, sensor, actuator, control). The driver
//! reads and writes individual registers by exchanging frames; the device
//! answers every frame with exactly one response frame. This library
//! provides:
//!
//! - Serialization and deserialization of command and fault frames
//! - Constructors for read, write, and fault messages
//! - The authoritative register map: offsets, access classes, write masks
//! - The component bit layout shared by both sides of the link
//!
//! ## Frame Format
//!
//! Every frame is exactly six ASCII hex characters, `BOOWDD`:
//!
//! - `B`: base address nibble (0..4)
//! - `OO`: register offset byte
//! - `W`: read/write nibble (`0` = read, `1` = write)
//! - `DD`: data byte
//!
//! A fault response has the form `EFFFFF` where `E` is 1 (forbidden),
//! 2 (invalid) or 3 (general). Frames carry no terminator; each frame is
//! sent as a single write.
//!
//! Two out-of-band tokens exist alongside frames: the device greets an
//! accepted client with the three bytes [`GREETING`] (`ACK`), and a client
//! requests a graceful close by sending the four bytes [`EXIT_TOKEN`]
//! (`exit`).
//!
//! ## Basic Usage
//!
//! ### Building and encoding frames
//!
//! ```
//! use hexreg_protocol::{Frame, registers::{Base, offsets}};
//!
//! // Read the LED register
//! let frame = Frame::read(Base::Actuator.nibble(), offsets::LED);
//! assert_eq!(frame.encode(), "310000");
//!
//! // Write 0x80 to it
//! let frame = Frame::write(Base::Actuator.nibble(), offsets::LED, 0x80);
//! assert_eq!(frame.encode(), "310180");
//! ```
//!
//! ### Parsing responses
//!
//! ```
//! use hexreg_protocol::{Fault, Frame};
//!
//! // A nominal response
//! match Frame::parse(b"310080").expect("frame should parse") {
//!     Frame::Command(command) => assert_eq!(command.data, 0x80),
//!     Frame::Fault(_) => panic!("not a fault"),
//! }
//!
//! // A fault response
//! assert_eq!(Frame::parse(b"1FFFFF"), Ok(Frame::Fault(Fault::Forbidden)));
//! ```
//!
//! ## Error Handling
//!
//! Structural problems with a payload (wrong length, non-hex bytes) are
//! reported as [`error::FrameError`]. Fault *frames* are not errors at this
//! layer; they parse successfully into [`Frame::Fault`].
//!
//! ## Thread Safety
//!
//! All types in this crate are plain values. Parsing and encoding perform no
//! I/O and are freely reentrant.

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod error;
pub mod registers;
