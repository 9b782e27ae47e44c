use std::time::Duration;

use newvm_api::{Credentials, NewVmClient};

use crate::{Error, Result};

/// Connection settings for the NewVM API, read from the environment.
#[derive(Clone)]
pub struct BackendConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub totp: String,
    pub timeout: Duration,
}

impl BackendConfig {
    /// Reads `NEWVM_HOST`, `NEWVM_USERNAME`, `NEWVM_PASSWORD`, `NEWVM_TOTP` and
    /// `NEWVM_TIMEOUT_SECS`, after loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            var(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::InvalidConfig(format!("{key} is not set")))
        };

        let timeout = match var("NEWVM_TIMEOUT_SECS") {
            Some(secs) => secs.parse().map(Duration::from_secs).map_err(|_| {
                Error::InvalidConfig(format!("NEWVM_TIMEOUT_SECS must be whole seconds, got {secs:?}"))
            })?,
            None => newvm_api::DEFAULT_TIMEOUT,
        };

        Ok(Self {
            host: var("NEWVM_HOST").unwrap_or_else(|| newvm_api::DEFAULT_HOST.to_string()),
            username: required("NEWVM_USERNAME")?,
            password: required("NEWVM_PASSWORD")?,
            totp: var("NEWVM_TOTP").unwrap_or_default(),
            timeout,
        })
    }

    /// Log in and verify the token.
    pub async fn connect(&self) -> Result<NewVmClient> {
        let credentials = Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
            totp: self.totp.clone(),
        };
        let client = NewVmClient::login(self.host.clone(), self.timeout, &credentials).await?;
        tracing::info!(host = %self.host, username = %self.username, "logged in to newvm");
        Ok(client)
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
