use std::time::Duration;

use thiserror::Error;

/// Failure of a single start/continue operation.
///
/// None of these leave the session state corrupted; the state machine
/// returns to its nearest stable phase and the caller may retry by hand.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Bad local input, never reaches the network
    #[error("ValidationError: {0}")]
    Validation(String),

    #[error("StateError: {0}")]
    State(#[from] StateError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("no active session")]
    NoActiveSession,

    #[error("a session is already active")]
    SessionAlreadyActive,

    #[error("a request is already in flight")]
    RequestInFlight,

    /// A response arrived with no matching request
    #[error("no request is in flight")]
    NoRequestInFlight,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("protocol violation: {0}")]
    Protocol(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
