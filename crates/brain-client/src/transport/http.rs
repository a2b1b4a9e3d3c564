//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::{Client, Url};
use tracing::debug;

use super::{ApiRequest, ApiResponse, HttpTransport, Method};
use crate::error::TransportError;
use crate::session::{Credentials, Session};

/// HTTPS transport against a fixed base URL.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a transport with a per-request timeout.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("brain-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Request(format!("invalid path '{}': {}", path, e)))
    }

    async fn collect(response: reqwest::Response) -> Result<ApiResponse, TransportError> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn login(&self, credentials: &Credentials) -> Result<ApiResponse, TransportError> {
        let url = self.url("authentication")?;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .basic_auth(credentials.email(), Some(credentials.password()))
            .send()
            .await?;
        Self::collect(response).await
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        session: &Session,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(&request.path)?;
        debug!("{:?} {}", request.method, url);

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(cookie) = session.cookie() {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(authorization) = session.authorization() {
            builder = builder.header(AUTHORIZATION, authorization);
        }

        let response = builder.send().await?;
        Self::collect(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_resolve_against_base() {
        let base = Url::parse("https://api.worldquantbrain.com/").unwrap();
        let transport = ReqwestTransport::new(base, Duration::from_secs(30)).unwrap();

        assert_eq!(
            transport.url("simulations/sim123").unwrap().as_str(),
            "https://api.worldquantbrain.com/simulations/sim123"
        );
        assert_eq!(
            transport.url("/alphas").unwrap().as_str(),
            "https://api.worldquantbrain.com/alphas"
        );
    }
}
