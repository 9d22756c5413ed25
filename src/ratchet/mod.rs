//! Double Ratchet Implementation
//!
//! A variant of the Double Ratchet algorithm:
//! https://signal.org/docs/specifications/doubleratchet/
//!
//! # Features
//! - Forward secrecy through the symmetric chains
//! - Post-compromise security through the DH ratchet
//! - Out-of-order delivery within a bounded skip window
//!
//! Headers are sent in the clear; there is no header encryption.

mod chain;
mod dh;
mod header;
mod session;
mod skipped;
mod snapshot;

pub use chain::*;
pub use dh::*;
pub use header::*;
pub use session::{Session, SessionStatus};
pub use skipped::SkippedKeyBuffer;
pub use snapshot::*;
