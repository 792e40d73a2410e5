//! Map types used for component state and host bookkeeping.
//!
//! `hashbrown` by default; the `std-hash` feature switches to the standard
//! library maps.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::HashMap;
}
