//! Core Components
//!
//! Injectable collaborators: clock, randomness, field encryption and consumer
//! lookup.

pub mod clock;
pub mod consumer_store;
pub mod crypto;
pub mod random;

pub use clock::*;
pub use consumer_store::*;
pub use crypto::*;
pub use random::*;
