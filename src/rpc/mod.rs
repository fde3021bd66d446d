//! Remote procedure channel
//!
//! The API is a fixed set of named calls that take a flat parameter map and
//! answer with a `SUCCESS` flag plus a payload. [`RpcChannel`] is the seam the
//! session layer talks through; [`SoapChannel`] is the production transport.

pub mod envelope;
#[cfg(test)]
pub(crate) mod mock;
mod soap;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

pub use soap::{pod_endpoint, SoapChannel};

/// Fault code the service uses for an expired session
pub const SESSION_EXPIRED_FAULT: &str = "145";

/// Call parameters, in the order they are sent
pub type Params = Map<String, Value>;

/// Fault reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: String,
    pub detail: String,
}

impl Fault {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
        }
    }

    /// Fault for a failure-flagged response that carried no fault element.
    /// The raw payload becomes the detail.
    pub fn unspecified(payload: &Value) -> Self {
        Self::new("", payload.to_string())
    }

    pub fn is_session_expired(&self) -> bool {
        self.code == SESSION_EXPIRED_FAULT
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code.is_empty() {
            write!(f, "{}", self.detail)
        } else {
            write!(f, "fault {}: {}", self.code, self.detail)
        }
    }
}

/// Raw response shape, as produced by a channel
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub success: bool,
    pub payload: Value,
    pub fault: Option<Fault>,
}

impl RpcResponse {
    pub fn ok(payload: Value) -> Self {
        Self {
            success: true,
            payload,
            fault: None,
        }
    }

    pub fn fault(fault: Fault) -> Self {
        Self {
            success: false,
            payload: Value::Null,
            fault: Some(fault),
        }
    }
}

/// Response decoded once at the channel boundary
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success(Value),
    Expired(Fault),
    Failed(Fault),
}

impl From<RpcResponse> for CallOutcome {
    fn from(response: RpcResponse) -> Self {
        if response.success {
            return CallOutcome::Success(response.payload);
        }
        let fault = response
            .fault
            .unwrap_or_else(|| Fault::unspecified(&response.payload));
        if fault.is_session_expired() {
            CallOutcome::Expired(fault)
        } else {
            CallOutcome::Failed(fault)
        }
    }
}

#[async_trait]
pub trait RpcChannel: Send + Sync {
    /// Issue one call. `session` is the current session token, if any.
    ///
    /// Transport failures are errors; service-level failures come back as a
    /// failure-flagged [`RpcResponse`].
    async fn call(&self, method: &str, params: &Params, session: Option<&str>)
        -> Result<RpcResponse>;
}

/// Lenient truthiness for flags that arrive as text.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "success" | "1" | "yes"
        ),
        _ => false,
    }
}

/// Scalar field rendered as text; objects and arrays are not scalars.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A field that may hold one object or many; the decoder cannot tell the two
/// apart when only one element was sent.
pub(crate) fn collection(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(other) => vec![other.clone()],
    }
}
