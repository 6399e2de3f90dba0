//! # gvsp — GigE Vision streaming receiver core
//!
//! A Rust library for receiving image streams from GigE Vision cameras over
//! the GigE Vision Streaming Protocol (GVSP): it listens on a UDP endpoint,
//! reassembles each frame's packet burst into a contiguous buffer, decodes
//! the pixel payload, and delivers every completed frame to a callback.
//!
//! ## Protocol references
//!
//! | Spec | Topic | How this crate uses it |
//! |------|-------|------------------------|
//! | GigE Vision 2.0 §6 (GVSP) | Stream channel | 8-byte packet header, leader/data/trailer framing, image leader layout |
//! | GigE Vision 2.0 Annex (PFNC) | Pixel formats | Six monochrome format codes and their wire packings |
//!
//! The control plane (GVCP: discovery, force-IP, camera configuration) is a
//! deliberate non-goal — the caller negotiates packet and payload sizes over
//! GVCP and hands them to this crate.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Receiver     — public API, lifecycle    │
//! ├──────────────────────────────────────────┤
//! │  engine       — dedicated receive loop   │
//! │  assembly     — frame state, reassembly  │
//! ├──────────────────────────────────────────┤
//! │  protocol     — GVSP header parsing      │
//! │  pixel        — monochrome decoders      │
//! └──────────────────────────────────────────┘
//! ```
//!
//! Datagrams flow from the socket through the header decoder into the
//! per-frame state: a leader opens the frame, data packets land in the
//! reassembly buffer, and the trailer decodes the buffer into a
//! [`Frame`] and hands it to the callback.
//!
//! ## Quick start
//!
//! ```no_run
//! use gvsp::Receiver;
//!
//! let mut receiver = Receiver::bind("0.0.0.0".parse().unwrap()).unwrap();
//! receiver.create_buffer(640 * 480, 676).unwrap(); // Mono8, 640-byte packet payloads
//! receiver.set_frame_callback(|frame| {
//!     println!("frame: {}x{} @ {} bit", frame.width, frame.height, frame.bit_depth);
//! });
//! receiver.start_receive("192.168.1.64".parse().unwrap()).unwrap();
//! ```
//!
//! ## Crate layout
//!
//! - [`receiver`] — [`Receiver`] session controller and lifecycle guards.
//! - [`protocol`] — GVSP wire constants and header/leader parsing.
//! - [`pixel`] — [`PixelFormat`], [`Frame`], and the six monochrome decoders.
//! - [`error`] — [`GvspError`] enum and [`Result`] alias.
//! - [`test_utils`] — synthetic GVSP packet generation for tests.

pub mod error;
pub mod pixel;
pub mod protocol;
pub mod receiver;
pub mod test_utils;

mod assembly;
mod engine;

pub use error::{GvspError, Result};
pub use pixel::{Frame, PixelData, PixelFormat};
pub use receiver::Receiver;
