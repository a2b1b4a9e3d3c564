//! In-memory transport for tests.
//!
//! [`ScriptedTransport`] replays queued responses in order and records every
//! request with the (tokio) instant it was issued, so paused-clock tests can
//! assert on pacing.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::session::{Credentials, Session};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

type Scripted = Result<ApiResponse, TransportError>;

/// A request observed by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The request as sent
    pub request: ApiRequest,
    /// Generation of the session it carried
    pub session_generation: u64,
    /// When it was issued
    pub at: Instant,
}

#[derive(Default)]
struct Script {
    logins: VecDeque<Scripted>,
    responses: VecDeque<Scripted>,
    fallback: Option<Scripted>,
    login_count: usize,
    requests: Vec<RecordedRequest>,
}

/// Transport that replays scripted responses.
///
/// Logins succeed with a fresh cookie unless a login outcome was queued.
/// Requests consume the response queue, then repeat the fallback if one is
/// set.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a login outcome.
    pub fn push_login(&self, outcome: Result<ApiResponse, TransportError>) -> &Self {
        self.script.lock().logins.push_back(outcome);
        self
    }

    /// Queues a response.
    pub fn push_response(&self, response: ApiResponse) -> &Self {
        self.script.lock().responses.push_back(Ok(response));
        self
    }

    /// Queues a transport fault.
    pub fn push_fault(&self, fault: TransportError) -> &Self {
        self.script.lock().responses.push_back(Err(fault));
        self
    }

    /// Response returned once the queue is drained.
    pub fn set_fallback(&self, outcome: Result<ApiResponse, TransportError>) -> &Self {
        self.script.lock().fallback = Some(outcome);
        self
    }

    /// Number of login calls made.
    pub fn login_count(&self) -> usize {
        self.script.lock().login_count
    }

    /// Requests issued so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().requests.clone()
    }

    /// Number of requests issued so far.
    pub fn request_count(&self) -> usize {
        self.script.lock().requests.len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn login(&self, _credentials: &Credentials) -> Result<ApiResponse, TransportError> {
        let mut script = self.script.lock();
        script.login_count += 1;
        let n = script.login_count;
        script.logins.pop_front().unwrap_or_else(|| {
            Ok(ApiResponse::new(201).with_header("Set-Cookie", format!("t=token-{}; Path=/", n)))
        })
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        session: &Session,
    ) -> Result<ApiResponse, TransportError> {
        let mut script = self.script.lock();
        script.requests.push(RecordedRequest {
            request: request.clone(),
            session_generation: session.generation(),
            at: Instant::now(),
        });
        match script.responses.pop_front() {
            Some(outcome) => outcome,
            None => script.fallback.clone().unwrap_or_else(|| {
                Err(TransportError::Request(format!(
                    "no scripted response for {:?} {}",
                    request.method, request.path
                )))
            }),
        }
    }
}
