//! Scripted channel for unit tests

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{Fault, Params, RpcChannel, RpcResponse};
use crate::error::{Result, SilverError};

/// One recorded call
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: String,
    pub params: Params,
    pub session: Option<String>,
}

/// Channel that answers `Login` with a fresh token and every other call from a
/// script, in order. Clones share the same script and log.
#[derive(Clone, Default)]
pub(crate) struct ScriptedChannel {
    script: Arc<Mutex<VecDeque<Result<RpcResponse>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    reject_login: Arc<Mutex<bool>>,
    logins: Arc<Mutex<u32>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: RpcResponse) -> &Self {
        self.script.lock().push_back(Ok(response));
        self
    }

    pub fn push_ok(&self, payload: Value) -> &Self {
        self.push(RpcResponse::ok(payload))
    }

    pub fn push_expired(&self) -> &Self {
        self.push(RpcResponse::fault(Fault::new("145", "Session has expired")))
    }

    pub fn push_transport_error(&self, message: &str) -> &Self {
        self.script
            .lock()
            .push_back(Err(SilverError::Transport(message.to_string())));
        self
    }

    pub fn reject_logins(&self) {
        *self.reject_login.lock() = true;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Non-login calls, in order
    pub fn api_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method != "Login")
            .collect()
    }

    pub fn login_count(&self) -> u32 {
        *self.logins.lock()
    }
}

#[async_trait]
impl RpcChannel for ScriptedChannel {
    async fn call(
        &self,
        method: &str,
        params: &Params,
        session: Option<&str>,
    ) -> Result<RpcResponse> {
        self.calls.lock().push(RecordedCall {
            method: method.to_string(),
            params: params.clone(),
            session: session.map(str::to_string),
        });

        if method == "Login" {
            if *self.reject_login.lock() {
                return Ok(RpcResponse {
                    success: false,
                    payload: json!({"SUCCESS": "false"}),
                    fault: Some(Fault::new("140", "Invalid login")),
                });
            }
            let mut logins = self.logins.lock();
            *logins += 1;
            return Ok(RpcResponse::ok(json!({
                "SUCCESS": "true",
                "SESSIONID": format!("token-{}", *logins),
            })));
        }

        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(RpcResponse::ok(json!({"SUCCESS": "true"}))))
    }
}
