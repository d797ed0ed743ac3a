//! spindle-gateway
//!
//! Static asset gateway for the dashboard.
//! Request paths pass through an ordered chain of named rules before any file is served.

pub mod assets;
pub mod config;
pub mod error;
pub mod rules;
pub mod server;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use rules::{Denial, PathRule, Resolution, RuleChain};
pub use server::Gateway;
