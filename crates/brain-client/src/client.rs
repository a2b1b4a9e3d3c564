//! The Brain simulation client.
//!
//! [`SimulationClient`] layers three policies over an [`HttpTransport`]:
//! - lazy login and re-authentication on 401
//! - a bounded retry budget for transport faults
//! - completion polling with backoff, pacing hints and a wait bound

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::BrainConfig;
use crate::error::{BrainError, BrainResult, ConfigResult, ErrorKind};
use crate::models::{Alpha, AlphaPage, SimulationHandle, SimulationRequest, SimulationResult, SimulationStatus};
use crate::retry::{PollPolicy, RetryPolicy};
use crate::session::{Credentials, Session};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};

#[derive(Default)]
struct SessionState {
    current: Option<Session>,
    generation: u64,
}

/// Client for the Brain simulation API.
///
/// Share it behind an `Arc`; session refreshes are serialized internally.
pub struct SimulationClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Credentials,
    retry: RetryPolicy,
    poll: PollPolicy,
    session: Mutex<SessionState>,
}

impl SimulationClient {
    /// Create a client over `transport` with default policies.
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            retry: RetryPolicy::default(),
            poll: PollPolicy::default(),
            session: Mutex::new(SessionState::default()),
        }
    }

    /// Create a client with the HTTPS transport described by `config`.
    pub fn from_config(config: &BrainConfig, credentials: Credentials) -> ConfigResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.parsed_base_url()?, config.request_timeout())?;
        Ok(Self::new(Arc::new(transport), credentials)
            .with_retry_policy(config.retry)
            .with_poll_policy(config.poll))
    }

    /// Replace the request retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the default polling policy.
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Default polling policy.
    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    /// Returns true once a session has been established.
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.current.is_some()
    }

    // =========================================================================
    // AUTHENTICATION
    // =========================================================================

    /// Log in and replace the current session.
    ///
    /// Performs a single attempt; rejected credentials yield
    /// [`BrainError::Authentication`], transport faults [`BrainError::Network`].
    pub async fn connect(&self) -> BrainResult<()> {
        let mut state = self.session.lock().await;
        self.login(&mut state).await.map(|_| ())
    }

    async fn login(&self, state: &mut SessionState) -> BrainResult<Session> {
        state.current = None;
        let response = self.transport.login(&self.credentials).await?;
        if !response.is_success() {
            warn!(
                "Brain API authentication rejected for {} (status {})",
                self.credentials.email(),
                response.status
            );
            return Err(BrainError::Authentication(format!(
                "API authentication failed with status {}",
                response.status
            )));
        }

        state.generation += 1;
        let session = Session::from_login(&response, state.generation);
        state.current = Some(session.clone());
        info!("Authenticated with Brain API (session {})", state.generation);
        Ok(session)
    }

    async fn current_session(&self) -> BrainResult<Session> {
        let mut state = self.session.lock().await;
        match &state.current {
            Some(session) => Ok(session.clone()),
            None => self.login(&mut state).await,
        }
    }

    /// Re-login unless another caller already replaced `stale`.
    async fn refresh_session(&self, stale: &Session) -> BrainResult<Session> {
        let mut state = self.session.lock().await;
        if let Some(current) = &state.current {
            if current.generation() != stale.generation() {
                debug!("Session already refreshed to {}", current.generation());
                return Ok(current.clone());
            }
        }
        self.login(&mut state).await
    }

    // =========================================================================
    // REQUEST EXECUTION
    // =========================================================================

    /// Execute `request`, re-authenticating on 401 and retrying faults.
    ///
    /// Re-logins and transport retries share one budget of
    /// `RetryPolicy::max_retries`. Any response other than 401 is returned
    /// as-is, including application errors.
    pub async fn send(&self, request: &ApiRequest) -> BrainResult<ApiResponse> {
        let mut session = self.current_session().await?;
        let mut remaining = self.retry.max_retries;
        let mut network_retries = 0;

        loop {
            match self.transport.execute(request, &session).await {
                Ok(response) if response.is_unauthorized() => {
                    if remaining == 0 {
                        return Err(BrainError::Authentication(format!(
                            "{} still unauthorized after {} re-authentication attempts",
                            request.path, self.retry.max_retries
                        )));
                    }
                    remaining -= 1;
                    debug!("Session expired on {}, re-authenticating", request.path);
                    session = self.refresh_session(&session).await?;
                }
                Ok(response) => return Ok(response),
                Err(fault) => {
                    if remaining == 0 {
                        return Err(BrainError::Network { source: fault });
                    }
                    remaining -= 1;
                    network_retries += 1;
                    let delay = self.retry.delay_for(network_retries);
                    warn!(
                        "Transport fault on {} ({}), retrying in {:?}",
                        request.path, fault, delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    // =========================================================================
    // SIMULATIONS
    // =========================================================================

    /// Submit a simulation and return its handle.
    ///
    /// A non-2xx answer is returned as [`BrainError::Simulation`] and never
    /// resubmitted.
    pub async fn submit_simulation(
        &self,
        request: &SimulationRequest,
    ) -> BrainResult<SimulationHandle> {
        if request.expression().trim().is_empty() {
            return Err(BrainError::InvalidRequest(
                "alpha expression must not be empty".to_string(),
            ));
        }
        let api_request = ApiRequest::post_json("simulations", request)
            .map_err(|e| BrainError::InvalidRequest(e.to_string()))?;

        info!(
            "Submitting simulation: {} ({} {} delay {})",
            request.expression(),
            request.settings.region,
            request.settings.universe,
            request.settings.delay
        );

        let response = self.send(&api_request).await?;
        if !response.is_success() {
            return Err(simulation_error(&response));
        }

        let location = response.header("location").ok_or_else(|| {
            BrainError::InvalidResponse("simulation response has no Location header".to_string())
        })?;
        let handle = SimulationHandle::from_location(location).ok_or_else(|| {
            BrainError::InvalidResponse(format!("cannot read simulation id from '{}'", location))
        })?;

        info!("Simulation submitted: {}", handle);
        Ok(handle)
    }

    /// Fetch the current status of a simulation.
    pub async fn get_simulation_status(
        &self,
        handle: &SimulationHandle,
    ) -> BrainResult<SimulationStatus> {
        let response = self.send(&status_request(handle)?).await?;
        if !response.is_success() {
            return Err(simulation_error(&response));
        }
        Ok(response.json_body()?)
    }

    /// Wait for a simulation using the client's polling policy.
    pub async fn wait_for_simulation(
        &self,
        handle: &SimulationHandle,
    ) -> BrainResult<SimulationResult> {
        let policy = self.poll;
        self.wait_for_simulation_with(handle, &policy).await
    }

    /// Poll a simulation until it produces an alpha.
    ///
    /// Ends with the result once the status carries an alpha, with
    /// [`BrainError::Timeout`] once `max_wait` has elapsed, with the last
    /// error once failed queries in a row exceed `max_consecutive_failures`, or
    /// with [`BrainError::SimulationFailed`] when the service reports failure.
    ///
    /// A `Retry-After` hint is honored before the body is looked at.
    pub async fn wait_for_simulation_with(
        &self,
        handle: &SimulationHandle,
        policy: &PollPolicy,
    ) -> BrainResult<SimulationResult> {
        let request = status_request(handle)?;
        let start = Instant::now();
        let mut failures = 0;
        let mut polls = 0;

        while start.elapsed() < policy.max_wait {
            polls += 1;
            let outcome = self.send(&request).await.and_then(|response| {
                if response.is_success() {
                    Ok(response)
                } else {
                    Err(simulation_error(&response))
                }
            });

            let response = match outcome {
                Ok(response) => response,
                Err(err) if matches!(err.kind(), ErrorKind::Network | ErrorKind::Simulation) => {
                    failures += 1;
                    if failures > policy.max_consecutive_failures {
                        warn!(
                            "Giving up on simulation {} after {} failed queries: {}",
                            handle, failures, err
                        );
                        return Err(err);
                    }
                    let delay = policy.backoff_for(failures);
                    debug!(
                        "Status query {} for {} failed ({}), backing off {:?}",
                        polls, handle, err, delay
                    );
                    pause(start, policy.max_wait, delay).await;
                    continue;
                }
                Err(err) => return Err(err),
            };

            if let Some(hint) = pacing_hint(&response) {
                debug!("Simulation {} asks to wait {:?}", handle, hint);
                pause(start, policy.max_wait, hint).await;
                continue;
            }

            failures = 0;
            let status: SimulationStatus = response.json_body()?;
            if status.alpha_id().is_some() {
                let elapsed = start.elapsed();
                info!(
                    "Simulation {} complete after {:?} ({} polls)",
                    handle, elapsed, polls
                );
                return Ok(SimulationResult {
                    handle: handle.clone(),
                    status,
                    elapsed,
                    polls,
                });
            }
            if status.is_failed() {
                return Err(BrainError::SimulationFailed {
                    handle: handle.clone(),
                    message: status.failure_message(),
                });
            }

            pause(start, policy.max_wait, policy.poll_interval).await;
        }

        Err(BrainError::Timeout {
            handle: handle.clone(),
            max_wait: policy.max_wait,
        })
    }

    // =========================================================================
    // READ HELPERS
    // =========================================================================

    /// Fetch an alpha by id.
    pub async fn get_alpha(&self, alpha_id: &str) -> BrainResult<Alpha> {
        let request = ApiRequest::get(format!("alphas/{}", path_segment("alpha", alpha_id)?));
        let response = self.send(&request).await?;
        if !response.is_success() {
            return Err(api_error(format!("Failed to get alpha {}", alpha_id), &response));
        }
        Ok(response.json_body()?)
    }

    /// List alphas in the account.
    pub async fn list_alphas(&self, limit: u32, offset: u32) -> BrainResult<Vec<Alpha>> {
        let request = ApiRequest::get("alphas")
            .query("limit", limit)
            .query("offset", offset);
        let response = self.send(&request).await?;
        if !response.is_success() {
            return Err(api_error("Failed to list alphas".to_string(), &response));
        }
        let page: AlphaPage = response.json_body()?;
        Ok(page.results)
    }
}

fn status_request(handle: &SimulationHandle) -> BrainResult<ApiRequest> {
    Ok(ApiRequest::get(format!(
        "simulations/{}",
        path_segment("simulation", handle.as_str())?
    )))
}

fn path_segment<'a>(what: &str, id: &'a str) -> BrainResult<&'a str> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) || id == "." || id == ".." {
        return Err(BrainError::InvalidRequest(format!("invalid {} id '{}'", what, id)));
    }
    Ok(id)
}

fn simulation_error(response: &ApiResponse) -> BrainError {
    BrainError::Simulation {
        status: response.status,
        body: response.text(),
    }
}

fn api_error(context: String, response: &ApiResponse) -> BrainError {
    BrainError::Api {
        context,
        status: response.status,
        body: response.text(),
    }
}

/// Seconds requested by a `Retry-After` header, if well-formed.
///
/// Hints too large for a `Duration` saturate; the wait deadline bounds them.
fn pacing_hint(response: &ApiResponse) -> Option<Duration> {
    let raw = response.header("retry-after")?;
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => {
            Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
        }
        _ => {
            warn!("Ignoring malformed Retry-After header: {}", raw);
            None
        }
    }
}

/// Sleep for `delay`, never past the wait deadline.
async fn pause(start: Instant, max_wait: Duration, delay: Duration) {
    let remaining = max_wait.saturating_sub(start.elapsed());
    sleep(delay.min(remaining)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    fn client(transport: &Arc<ScriptedTransport>) -> SimulationClient {
        SimulationClient::new(
            transport.clone(),
            Credentials::new("quant@example.com", "secret"),
        )
    }

    fn pending() -> ApiResponse {
        ApiResponse::json(200, &json!({"id": "sim123", "status": "RUNNING", "progress": 0.5}))
    }

    fn complete(alpha: &str) -> ApiResponse {
        ApiResponse::json(200, &json!({"id": "sim123", "status": "COMPLETE", "alpha": alpha}))
    }

    // -------------------------------------------------------------------------
    // connect / send
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_connect_rejected_credentials() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_login(Ok(ApiResponse::new(401)));
        let client = client(&transport);

        let err = client.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(!client.is_connected().await);
        assert_eq!(transport.login_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_transport_fault_is_network_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_login(Err(TransportError::Connect("connection refused".into())));
        let client = client(&transport);

        let err = client.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(transport.login_count(), 1);
    }

    #[tokio::test]
    async fn test_send_logs_in_lazily_once() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ApiResponse::new(200));
        transport.push_response(ApiResponse::new(200));
        let client = client(&transport);

        client.send(&ApiRequest::get("alphas")).await.unwrap();
        client.send(&ApiRequest::get("alphas")).await.unwrap();

        assert_eq!(transport.login_count(), 1);
        assert!(client.is_connected().await);
    }

    #[tokio::test]
    async fn test_single_unauthorized_is_transparent() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ApiResponse::new(401));
        transport.push_response(ApiResponse::json(200, &json!({"ok": true})));
        let client = client(&transport);

        let response = client.send(&ApiRequest::get("alphas/a1")).await.unwrap();
        assert_eq!(response.status, 200);
        // lazy login + one re-login
        assert_eq!(transport.login_count(), 2);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].request, requests[1].request);
        assert_eq!(requests[0].session_generation, 1);
        assert_eq!(requests[1].session_generation, 2);
    }

    #[tokio::test]
    async fn test_unauthorized_every_time_exhausts_budget() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_fallback(Ok(ApiResponse::new(401)));
        let client = client(&transport);

        let err = client.send(&ApiRequest::get("alphas")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        // lazy login + exactly 3 re-logins
        assert_eq!(transport.login_count(), 1 + 3);
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn test_failed_relogin_surfaces_immediately() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_login(Ok(ApiResponse::new(201)));
        transport.push_login(Ok(ApiResponse::new(403)));
        transport.push_response(ApiResponse::new(401));
        let client = client(&transport);

        let err = client.send(&ApiRequest::get("alphas")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_faults_are_retried_with_backoff() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_fault(TransportError::Timeout("read timed out".into()));
        transport.push_fault(TransportError::Connect("reset".into()));
        transport.push_response(ApiResponse::new(200));
        let client = client(&transport);

        let response = client.send(&ApiRequest::get("alphas")).await.unwrap();
        assert_eq!(response.status, 200);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[1].at - requests[0].at >= Duration::from_millis(250));
        assert!(requests[2].at - requests[1].at >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_faults_exhaust_budget() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_fallback(Err(TransportError::Connect("refused".into())));
        let client = client(&transport);

        let err = client.send(&ApiRequest::get("alphas")).await.unwrap_err();
        match err {
            BrainError::Network { source } => {
                assert_eq!(source, TransportError::Connect("refused".into()))
            }
            other => panic!("expected network error, got {:?}", other),
        }
        assert_eq!(transport.request_count(), 4);
        assert_eq!(transport.login_count(), 1);
    }

    #[tokio::test]
    async fn test_application_errors_pass_through() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ApiResponse::new(429).with_body("quota exceeded"));
        let client = client(&transport);

        let response = client.send(&ApiRequest::get("alphas")).await.unwrap();
        assert_eq!(response.status, 429);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = Arc::new(client(&transport));
        client.connect().await.unwrap();

        // Both callers hold generation 1; the second refresh must reuse generation 2.
        let stale = client.current_session().await.unwrap();
        let first = client.refresh_session(&stale).await.unwrap();
        let second = client.refresh_session(&stale).await.unwrap();

        assert_eq!(first.generation(), 2);
        assert_eq!(second.generation(), 2);
        assert_eq!(transport.login_count(), 2);
    }

    // -------------------------------------------------------------------------
    // submission
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_submit_returns_handle_from_location() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(
            ApiResponse::new(201)
                .with_header("Location", "https://api.worldquantbrain.com/simulations/sim123"),
        );
        let client = client(&transport);

        let request = SimulationRequest::regular("rank(close)");
        let handle = client.submit_simulation(&request).await.unwrap();
        assert_eq!(handle.as_str(), "sim123");

        let sent = &transport.requests()[0].request;
        assert_eq!(sent.path, "simulations");
        assert_eq!(sent.body.as_ref().unwrap()["regular"], json!("rank(close)"));
        assert_eq!(sent.body.as_ref().unwrap()["settings"]["decay"], json!(6));
    }

    #[tokio::test]
    async fn test_submit_non_ok_is_simulation_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ApiResponse::new(400).with_body(r#"{"regular":"bad"}"#));
        let client = client(&transport);

        let err = client
            .submit_simulation(&SimulationRequest::regular("rank(nope"))
            .await
            .unwrap_err();
        match err {
            BrainError::Simulation { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, r#"{"regular":"bad"}"#);
            }
            other => panic!("expected simulation error, got {:?}", other),
        }
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_submit_without_location_is_invalid_response() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ApiResponse::new(201));
        let client = client(&transport);

        let err = client
            .submit_simulation(&SimulationRequest::regular("rank(close)"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_expression_locally() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = client(&transport);

        let err = client
            .submit_simulation(&SimulationRequest::regular("   "))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(transport.login_count(), 0);
    }

    // -------------------------------------------------------------------------
    // polling
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_first_completed_status() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(complete("alpha456"));
        let client = client(&transport);

        let result = client
            .wait_for_simulation(&SimulationHandle::new("sim123"))
            .await
            .unwrap();
        assert_eq!(result.alpha_id(), Some("alpha456"));
        assert_eq!(result.polls, 1);
        assert!(result.elapsed <= Duration::from_secs(300));
        assert_eq!(transport.requests()[0].request.path, "simulations/sim123");
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_state_polls_are_spaced_by_interval() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(pending());
        transport.push_response(pending());
        transport.push_response(pending());
        transport.push_response(complete("alpha456"));
        let client = client(&transport);

        let result = client
            .wait_for_simulation(&SimulationHandle::new("sim123"))
            .await
            .unwrap();
        assert_eq!(result.polls, 4);

        let requests = transport.requests();
        for pair in requests.windows(2) {
            assert!(pair[1].at - pair[0].at >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_hint_is_honored_without_resetting_clock() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(pending().with_header("Retry-After", "5"));
        transport.push_response(complete("alpha456"));
        let client = client(&transport);

        let result = client
            .wait_for_simulation(&SimulationHandle::new("sim123"))
            .await
            .unwrap();

        let requests = transport.requests();
        assert!(requests[1].at - requests[0].at >= Duration::from_secs(5));
        assert!(result.elapsed >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_hint_takes_precedence_over_completion() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(complete("early").with_header("Retry-After", "2.5"));
        transport.push_response(complete("alpha456"));
        let client = client(&transport);

        let result = client
            .wait_for_simulation(&SimulationHandle::new("sim123"))
            .await
            .unwrap();
        assert_eq!(result.alpha_id(), Some("alpha456"));
        assert_eq!(result.polls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_hints_count_against_wait_bound() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_fallback(Ok(pending().with_header("Retry-After", "4")));
        let client = client(&transport);
        let policy = PollPolicy::default().with_max_wait(Duration::from_secs(10));

        let err = client
            .wait_for_simulation_with(&SimulationHandle::new("sim123"), &policy)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        // queries at t=0, 4 and 8; the third hint is clamped to the deadline
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_503_fails_once_ceiling_is_exceeded() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_fallback(Ok(ApiResponse::new(503).with_body("Service Unavailable")));
        let client = client(&transport);

        let err = client
            .wait_for_simulation(&SimulationHandle::new("sim123"))
            .await
            .unwrap_err();
        assert!(!err.is_timeout());
        assert_eq!(err.kind(), ErrorKind::Simulation);
        assert_eq!(err.status(), Some(503));
        assert_eq!(transport.request_count(), 4);

        // backoff of 2s, 4s then 8s between the failed polls
        let requests = transport.requests();
        assert_eq!(requests[1].at - requests[0].at, Duration::from_secs(2));
        assert_eq!(requests[2].at - requests[1].at, Duration::from_secs(4));
        assert_eq!(requests[3].at - requests[2].at, Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_hint_keeps_failure_count() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ApiResponse::new(502));
        transport.push_response(ApiResponse::new(502));
        transport.push_response(pending().with_header("Retry-After", "1"));
        transport.set_fallback(Ok(ApiResponse::new(502)));
        let client = client(&transport);

        let err = client
            .wait_for_simulation(&SimulationHandle::new("sim123"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(502));
        // two failures before the hint and two after it; a reset would need four more
        assert_eq!(transport.request_count(), 5);

        let requests = transport.requests();
        assert_eq!(requests[3].at - requests[2].at, Duration::from_secs(1));
        assert_eq!(requests[4].at - requests[3].at, Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_pacing_hint_waits_until_deadline() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_fallback(Ok(pending().with_header("Retry-After", "1e20")));
        let client = client(&transport);
        let policy = PollPolicy::default().with_max_wait(Duration::from_secs(10));

        let err = client
            .wait_for_simulation_with(&SimulationHandle::new("sim123"), &policy)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_counter() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ApiResponse::new(502));
        transport.push_response(ApiResponse::new(502));
        transport.push_response(pending());
        transport.push_response(ApiResponse::new(502));
        transport.push_response(ApiResponse::new(502));
        transport.push_response(complete("alpha456"));
        let client = client(&transport);

        let result = client
            .wait_for_simulation(&SimulationHandle::new("sim123"))
            .await
            .unwrap();
        assert_eq!(result.alpha_id(), Some("alpha456"));
        assert_eq!(result.polls, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failures_during_wait_surface_last_fault() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_fallback(Err(TransportError::Timeout("deadline".into())));
        let client = client(&transport).with_retry_policy(RetryPolicy::none());

        let err = client
            .wait_for_simulation(&SimulationHandle::new("sim123"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_fallback(Ok(pending()));
        let client = client(&transport);
        let policy = PollPolicy::default().with_max_wait(Duration::from_secs(5));

        let err = client
            .wait_for_simulation_with(&SimulationHandle::new("sim123"), &policy)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("sim123"));
        assert_eq!(transport.request_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_simulation_ends_wait() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ApiResponse::json(
            200,
            &json!({"id": "sim123", "status": "ERROR", "message": "Attempted to use unknown variable"}),
        ));
        let client = client(&transport);

        let err = client
            .wait_for_simulation(&SimulationHandle::new("sim123"))
            .await
            .unwrap_err();
        match err {
            BrainError::SimulationFailed { handle, message } => {
                assert_eq!(handle.as_str(), "sim123");
                assert!(message.contains("unknown variable"));
            }
            other => panic!("expected failed simulation, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_error_aborts_wait() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_fallback(Ok(ApiResponse::new(401)));
        let client = client(&transport);

        let err = client
            .wait_for_simulation(&SimulationHandle::new("sim123"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(transport.request_count(), 4);
    }

    // -------------------------------------------------------------------------
    // read helpers
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_get_alpha_non_ok_is_api_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ApiResponse::new(404).with_body("not found"));
        let client = client(&transport);

        let err = client.get_alpha("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.to_string(), "Failed to get alpha missing: 404 - not found");
    }

    #[tokio::test]
    async fn test_list_alphas_sends_paging_and_unwraps_results() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ApiResponse::json(
            200,
            &json!({"count": 2, "results": [{"id": "a1"}, {"id": "a2", "grade": "GOOD"}]}),
        ));
        let client = client(&transport);

        let alphas = client.list_alphas(2, 10).await.unwrap();
        assert_eq!(alphas.len(), 2);
        assert_eq!(alphas[1].grade.as_deref(), Some("GOOD"));

        let sent = &transport.requests()[0].request;
        assert_eq!(sent.path, "alphas");
        assert!(sent.query.contains(&("offset".to_string(), "10".to_string())));
    }

    #[tokio::test]
    async fn test_ids_cannot_escape_path() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = client(&transport);

        let err = client.get_alpha("../users/self").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(transport.request_count(), 0);
    }
}
