#![forbid(unsafe_code)]

//! Re-exports of the `tracing` macros used by this crate.
//!
//! Only compiled when the `tracing` feature is active. When it is not, the
//! no-op `macro_rules!` fallbacks exported from the crate root take their
//! place, so call sites are identical in both configurations.

pub use tracing::{debug, trace};
