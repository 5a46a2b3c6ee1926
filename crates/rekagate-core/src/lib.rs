pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod token;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::Gateway;
