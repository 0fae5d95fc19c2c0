//! Serving state machine.

/// Where the agent is in its single-client lifetime.
///
/// Transitions only move forward: `Listening -> Connected -> Serving ->
/// Closed`. There is no way back to `Listening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentState {
    /// Bound, waiting for the one client.
    #[default]
    Listening,
    /// Client accepted, no request read yet.
    Connected,
    /// At least one request has been served.
    Serving,
    /// Connection gone, platform released.
    Closed,
}

impl AgentState {
    /// Whether a client is attached.
    pub fn has_client(self) -> bool {
        matches!(self, Self::Connected | Self::Serving)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listening => write!(f, "Listening"),
            Self::Connected => write!(f, "Connected"),
            Self::Serving => write!(f, "Serving"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
