//! Error types for the Brain client.
//!
//! [`BrainError`] is a tagged error: callers branch on [`BrainError::kind`]
//! instead of matching on message text.

use std::time::Duration;

use thiserror::Error;

use crate::models::SimulationHandle;

/// Result type for Brain API operations.
pub type BrainResult<T> = Result<T, BrainError>;

/// Configuration operation result type.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Transport-level fault raised before any HTTP status was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established (refused, DNS failure, TLS).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Any other failure while sending the request or reading the body.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Discriminant of [`BrainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials rejected or re-authentication exhausted.
    Authentication,
    /// Transport fault surviving the retry budget.
    Network,
    /// Non-ok response to a simulation submission or status query.
    Simulation,
    /// Non-ok response to a read helper.
    Api,
    /// The polling loop ran out of time.
    Timeout,
    /// The remote service reported the simulation as failed.
    SimulationFailed,
    /// A response could not be interpreted.
    InvalidResponse,
    /// The request was rejected before reaching the wire.
    InvalidRequest,
}

/// Errors returned by [`SimulationClient`](crate::SimulationClient).
#[derive(Debug, Error)]
pub enum BrainError {
    /// Credentials rejected, or the session could not be re-established.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Transport fault after the retry budget was spent.
    #[error("network error: {source}")]
    Network {
        /// The last underlying transport fault.
        #[from]
        source: TransportError,
    },

    /// Simulation API error, carrying the response verbatim.
    #[error("simulation API error: {status} - {body}")]
    Simulation {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Generic API error from a read helper.
    #[error("{context}: {status} - {body}")]
    Api {
        /// What the client was trying to do.
        context: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The simulation did not complete within the allowed wait.
    #[error("simulation {handle} did not complete within {} seconds", .max_wait.as_secs_f64())]
    Timeout {
        /// The simulation that was being waited on.
        handle: SimulationHandle,
        /// The wait bound that elapsed.
        max_wait: Duration,
    },

    /// The remote service reported a terminal failure for the simulation.
    #[error("simulation {handle} failed: {message}")]
    SimulationFailed {
        /// The failed simulation.
        handle: SimulationHandle,
        /// Error detail reported by the service.
        message: String,
    },

    /// A response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request was rejected before reaching the wire.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl BrainError {
    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrainError::Authentication(_) => ErrorKind::Authentication,
            BrainError::Network { .. } => ErrorKind::Network,
            BrainError::Simulation { .. } => ErrorKind::Simulation,
            BrainError::Api { .. } => ErrorKind::Api,
            BrainError::Timeout { .. } => ErrorKind::Timeout,
            BrainError::SimulationFailed { .. } => ErrorKind::SimulationFailed,
            BrainError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            BrainError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// Returns true if this is a timeout from the polling loop.
    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            BrainError::Simulation { status, .. } | BrainError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BrainError {
    fn from(err: serde_json::Error) -> Self {
        BrainError::InvalidResponse(err.to_string())
    }
}

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required credential is not set in the environment.
    #[error("missing credential: environment variable {var} must be set")]
    MissingCredential {
        /// The environment variable that was not set.
        var: &'static str,
    },

    /// The HTTP transport could not be built.
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),

    /// Configuration file could not be read.
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`BrainConfig`](crate::BrainConfig).
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    /// Validation error.
    #[error("Validation error: {field}: {message}")]
    Validation {
        /// Field that failed validation.
        field: String,
        /// Validation error message.
        message: String,
    },
}

impl ConfigError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
