//! Core types and utilities for the ComfoConnect LAN C client
//!
//! This crate provides the error taxonomy, the PDO/property value types and
//! a handful of helpers shared by every other crate in the workspace.

pub mod error;
pub mod util;
pub mod value;

pub use error::{ComfoError, ComfoResult};
pub use value::{PdoType, Value};
