//! Key Pairs
//!
//! Long-term identity keys and the prekeys published for key agreement.
//! Storage and rotation policy belong to the caller.

mod identity;
mod prekey;

pub use identity::*;
pub use prekey::*;
