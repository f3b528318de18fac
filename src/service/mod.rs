//! Service layer: turns a raw request body into a status code and JSON envelope.
//!
//! Everything here is synchronous; the transport layer decides which thread
//! runs it.

mod context;
mod dispatch;
mod error;

use std::sync::Arc;

use serde_json::{Value, json};

use crate::domain::Authenticator;
use crate::store::Store;

pub use context::RequestContext;
pub use dispatch::method_handler;
pub use error::{
    ApiError, BAD_REQUEST, FORBIDDEN, INTERNAL_ERROR, INVALID_REQUEST, METHOD_NOT_ALLOWED,
    NOT_FOUND, OK, reason,
};

/// The only routable path, compared with surrounding slashes stripped.
pub const METHOD_PATH: &str = "method";

#[derive(Debug, Clone, PartialEq)]
/// Status code plus the JSON envelope sent back to the caller.
pub struct ApiResponse {
    pub code: u16,
    pub body: Value,
}

impl ApiResponse {
    /// `{"response": payload, "code": 200}`
    pub fn success(payload: Value) -> Self {
        Self {
            code: OK,
            body: json!({"response": payload, "code": OK}),
        }
    }

    /// `{"error": <reason phrase>, "code": code}`
    pub fn failure(code: u16) -> Self {
        Self {
            code,
            body: json!({"error": reason(code), "code": code}),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.body.to_string().into_bytes()
    }
}

#[derive(Clone)]
/// Request handler shared by every connection.
pub struct Api {
    auth: Authenticator,
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl Api {
    pub fn new(auth: Authenticator, store: Arc<dyn Store>) -> Self {
        Self { auth, store }
    }

    pub fn auth(&self) -> &Authenticator {
        &self.auth
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Handle one POST body addressed to `path`.
    ///
    /// Never fails: every outcome, including unexpected ones, maps to an
    /// envelope. One summary line is logged per call.
    pub fn handle(&self, path: &str, body: &[u8], ctx: &mut RequestContext) -> ApiResponse {
        let response = match self.route(path, body, ctx) {
            Ok(payload) => ApiResponse::success(payload),
            Err(err) => {
                let code = err.code();
                if code == INTERNAL_ERROR {
                    tracing::error!(request_id = %ctx.request_id, error = %err, "unexpected failure");
                } else {
                    tracing::debug!(request_id = %ctx.request_id, error = %err, "request rejected");
                }
                ApiResponse::failure(code)
            }
        };

        tracing::info!(
            request_id = %ctx.request_id,
            path,
            code = response.code,
            has = ?ctx.has,
            nclients = ?ctx.nclients,
            "request handled"
        );
        response
    }

    fn route(
        &self,
        path: &str,
        body: &[u8],
        ctx: &mut RequestContext,
    ) -> Result<Value, ApiError> {
        let request: Value = serde_json::from_slice(body).map_err(ApiError::BadRequest)?;
        tracing::debug!(request_id = %ctx.request_id, path, body = %request, "request received");

        if path.trim_matches('/') != METHOD_PATH {
            return Err(ApiError::NotFound {
                path: path.to_owned(),
            });
        }

        let response = method_handler(&request, ctx, self.store.as_ref(), &self.auth)?;
        serde_json::to_value(response).map_err(|err| ApiError::Internal(err.to_string()))
    }

    /// Liveness payload; `store` reports whether the cache answers its probe.
    pub fn health(&self) -> Value {
        json!({"status": "ok", "store": self.store.available()})
    }
}
