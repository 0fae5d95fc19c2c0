//! Single-client remote input agent.
//!
//! Accepts one TCP client, applies each request's key and mouse injections
//! through the input engine, and answers with the polled user input and an
//! optional screenshot.

pub mod agent;
pub mod config;
pub mod error;
pub mod setup;
pub mod state;

pub use agent::{Agent, AgentStatus};
pub use config::Config;
pub use error::AgentError;
pub use state::AgentState;
