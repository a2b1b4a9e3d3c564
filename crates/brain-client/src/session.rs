//! Credentials and session state.

use std::fmt;

use crate::error::{ConfigError, ConfigResult};
use crate::transport::ApiResponse;

/// Environment variable holding the account identifier.
pub const EMAIL_ENV: &str = "WORLDQUANT_EMAIL";

/// Environment variable holding the account secret.
pub const PASSWORD_ENV: &str = "WORLDQUANT_PASSWORD";

/// Login credential pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Reads credentials from `WORLDQUANT_EMAIL` / `WORLDQUANT_PASSWORD`.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingCredential { var })
        };
        Ok(Self::new(read(EMAIL_ENV)?, read(PASSWORD_ENV)?))
    }

    /// Account identifier.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Account secret.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authentication state established by a successful login.
///
/// The contents are opaque to callers; transports replay them on every
/// request.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    cookie: Option<String>,
    authorization: Option<String>,
    generation: u64,
}

impl Session {
    /// Builds a session from a login response.
    pub fn from_login(response: &ApiResponse, generation: u64) -> Self {
        let cookies: Vec<&str> = response
            .headers_all("set-cookie")
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('='))
            .collect();

        Self {
            cookie: (!cookies.is_empty()).then(|| cookies.join("; ")),
            authorization: response.header("authorization").map(str::to_string),
            generation,
        }
    }

    /// Value for the `Cookie` request header.
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Value for the `Authorization` request header.
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    /// Login sequence number; increases on every successful login.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("generation", &self.generation)
            .field("has_cookie", &self.cookie.is_some())
            .field("has_authorization", &self.authorization.is_some())
            .finish()
    }
}
