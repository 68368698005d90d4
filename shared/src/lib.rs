//! Shared domain logic for the Stockroom inventory platform
//!
//! This crate contains the pure parts of the system: money arithmetic for
//! invoice totals and input validation. It performs no IO and is usable from
//! the engine as well as any application embedding it.

pub mod money;
pub mod validation;

pub use money::*;
pub use validation::*;
