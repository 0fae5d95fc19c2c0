//! Agent errors.

use remote_hand_input::InputError;
use remote_hand_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to listen: {0}")]
    Listen(#[source] ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] ProtocolError),

    #[error("input error: {0}")]
    Input(#[from] InputError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
