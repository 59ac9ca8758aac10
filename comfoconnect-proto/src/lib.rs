//! Wire codec for the ComfoConnect LAN C envelope protocol
//!
//! The bridge speaks length-prefixed protobuf (proto2 semantics) over TCP,
//! and a one-shot protobuf exchange over UDP for discovery. This crate
//! implements the wire primitives, the `GatewayOperation` envelope and every
//! inner operation message the client exchanges with the bridge.

pub mod discovery;
pub mod envelope;
pub mod messages;
pub mod op;
pub mod wire;

pub use envelope::{Envelope, GatewayOperation, ENVELOPE_HEADER_LENGTH};
pub use op::{GatewayResult, OperationType};
