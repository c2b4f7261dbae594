//! Service Provider Types
//!
//! Token, session, consumer and configuration types.

pub mod config;
pub mod consumer;
pub mod service_provider_token;
pub mod session;
pub mod token;

pub use config::*;
pub use consumer::*;
pub use service_provider_token::*;
pub use session::*;
pub use token::*;
