//! Impact fund voting primitives.
//! Stable, protocol-neutral, behavior-free.
//!
//! Rule: identifiers are fixed-size values, never free-form strings.

pub mod primitives;
pub mod errors;

pub use primitives::{Address, ChainId, Epoch, Points, ProjectId, TxHash};
pub use errors::ParseError;
