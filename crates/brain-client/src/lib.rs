//! # Brain Client
//!
//! Resilient client for the WorldQuant Brain simulation API.
//!
//! ## Features
//!
//! - **Sessions**: lazy credential login, transparent re-authentication on 401
//! - **Retries**: bounded retry budget with exponential delays for transport faults
//! - **Simulations**: submission with documented default settings
//! - **Polling**: completion wait with backoff, `Retry-After` pacing and a wait bound
//! - **Pluggable transport**: [`HttpTransport`] seam with a reqwest implementation
//!
//! ## Quick Start
//!
//! ```ignore
//! use brain_client::{BrainConfig, Credentials, SimulationClient, SimulationRequest};
//!
//! let client = SimulationClient::from_config(&BrainConfig::default(), Credentials::from_env()?)?;
//! let handle = client.submit_simulation(&SimulationRequest::regular("rank(close)")).await?;
//! let result = client.wait_for_simulation(&handle).await?;
//! let alpha = client.get_alpha(result.alpha_id().unwrap()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::SimulationClient;
pub use config::BrainConfig;
pub use error::{BrainError, BrainResult, ConfigError, ConfigResult, ErrorKind, TransportError};
pub use models::{
    Alpha, AlphaMetrics, AlphaPage, Neutralization, SettingsOverrides, SimulationHandle,
    SimulationRequest, SimulationResult, SimulationSettings, SimulationStatus, Switch,
};
pub use retry::{PollPolicy, RetryPolicy};
pub use session::{Credentials, Session};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport};
