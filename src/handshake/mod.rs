//! Handshake Module
//!
//! Implements a variant of the X3DH key agreement protocol. Identity keys
//! are Ed25519 and are mapped to X25519 for the Diffie-Hellman steps.

mod bundle;
mod convert;
mod x3dh;

pub use bundle::*;
pub use convert::*;
pub use x3dh::*;
