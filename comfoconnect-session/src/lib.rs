//! Framing layer for the ComfoConnect control channel
//!
//! This crate converts between a TCP byte stream and discrete envelope
//! buffers. Each wire message is a 4-byte big-endian length followed by that
//! many envelope bytes.

pub mod framer;

pub use framer::{FrameReader, FrameWriter, MAX_FRAME_LENGTH, MIN_FRAME_LENGTH};
