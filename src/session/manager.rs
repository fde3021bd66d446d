//! Authenticated session over a remote procedure channel
//!
//! State machine with two transitions:
//! - `authenticate`: Unauthenticated -> Active (first login)
//! - `reauthenticate`: Active -> Active, only on a session-expired fault
//!
//! A call gets one retry after a re-login. A second expiry is surfaced as a
//! [`SilverError::RemoteCall`] so a broken credential cannot loop.

use std::fmt;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::credentials::Credentials;
use crate::error::{Result, SilverError};
use crate::rpc::{scalar_text, CallOutcome, Fault, Params, RpcChannel};

#[derive(Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Active { token: String },
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("Unauthenticated"),
            Self::Active { .. } => f
                .debug_struct("Active")
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

pub struct SessionManager<C> {
    channel: C,
    credentials: Credentials,
    state: SessionState,
}

impl<C: RpcChannel> SessionManager<C> {
    /// Create a manager without logging in
    pub fn new(channel: C, credentials: Credentials) -> Self {
        Self {
            channel,
            credentials,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    fn token(&self) -> Option<&str> {
        match &self.state {
            SessionState::Active { token } => Some(token.as_str()),
            SessionState::Unauthenticated => None,
        }
    }

    /// Log in and store the returned session token.
    ///
    /// Replaces any existing token in place; on failure the previous state is
    /// left untouched.
    pub async fn login(&mut self) -> Result<()> {
        info!("Logging in");

        let mut params = Params::new();
        params.insert("USERNAME".into(), json!(self.credentials.username));
        params.insert("PASSWORD".into(), json!(self.credentials.password()));

        let response = self.channel.call("Login", &params, None).await?;
        let payload = match CallOutcome::from(response) {
            CallOutcome::Success(payload) => payload,
            CallOutcome::Expired(fault) | CallOutcome::Failed(fault) => {
                return Err(SilverError::Authentication(fault));
            }
        };

        let token = payload
            .get("SESSIONID")
            .and_then(scalar_text)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SilverError::Authentication(Fault::new("", "Login response carried no SESSIONID"))
            })?;

        self.state = SessionState::Active { token };
        info!("Login successful");
        Ok(())
    }

    /// End the session. The state is reset even if the service rejects the call.
    pub async fn logout(&mut self) -> Result<()> {
        let Some(token) = self.token().map(str::to_string) else {
            return Ok(());
        };
        self.state = SessionState::Unauthenticated;

        let response = self.channel.call("Logout", &Params::new(), Some(&token)).await?;
        match CallOutcome::from(response) {
            CallOutcome::Success(_) | CallOutcome::Expired(_) => Ok(()),
            CallOutcome::Failed(fault) => Err(SilverError::RemoteCall {
                method: "Logout".to_string(),
                fault,
            }),
        }
    }

    /// Issue `method` with the current session token.
    ///
    /// Logs in first if there is no session yet.
    pub async fn call(&mut self, method: &str, params: Params) -> Result<Value> {
        if !self.is_authenticated() {
            self.login().await?;
        }

        match self.call_once(method, &params).await? {
            CallOutcome::Success(payload) => Ok(payload),
            CallOutcome::Failed(fault) => Err(SilverError::RemoteCall {
                method: method.to_string(),
                fault,
            }),
            CallOutcome::Expired(fault) => {
                warn!("Session expired during {} ({}), logging in again", method, fault);
                self.login().await?;

                match self.call_once(method, &params).await? {
                    CallOutcome::Success(payload) => Ok(payload),
                    CallOutcome::Expired(fault) | CallOutcome::Failed(fault) => {
                        Err(SilverError::RemoteCall {
                            method: method.to_string(),
                            fault,
                        })
                    }
                }
            }
        }
    }

    async fn call_once(&self, method: &str, params: &Params) -> Result<CallOutcome> {
        debug!("Calling {}", method);
        let response = self.channel.call(method, params, self.token()).await?;
        Ok(CallOutcome::from(response))
    }
}
