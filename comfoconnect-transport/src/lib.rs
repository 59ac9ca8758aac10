//! Transport helpers for the ComfoConnect client
//!
//! TCP connection establishment with a connect deadline for the control
//! channel, and UDP broadcast socket setup for bridge discovery.

pub mod tcp;
pub mod udp;

pub use tcp::{connect, TcpSettings};
pub use udp::{broadcast_addresses, broadcast_socket};
