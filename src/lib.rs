//! JSON-over-HTTP scoring API with declarative request validation.
//!
//! The crate is layered: a domain layer of validated field kinds and request
//! schemas, scoring functions over a cache port, a synchronous service layer
//! producing status codes and envelopes, and a hyper transport on top.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use scoring_api::{Api, Authenticator, MemoryStore, RequestContext};
//!
//! let api = Api::new(Authenticator::new("Otus", "42"), Arc::new(MemoryStore::new()));
//! let mut ctx = RequestContext::new("demo");
//! let response = api.handle("/method", br#"{"login": "h&f"}"#, &mut ctx);
//! assert_eq!(response.code, 422);
//! ```
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod domain;
pub mod scoring;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod transport;

pub use config::{Config, ConfigError, ConfigLoader};
pub use domain::{
    Authenticator, ClientsInterestsRequest, EnvelopeError, MethodRequest, MethodResponse,
    OnlineScoreRequest, Score, ValidationError,
};
pub use scoring::{InterestsError, get_interests, get_score};
pub use service::{Api, ApiError, ApiResponse, RequestContext};
pub use store::{MemoryStore, RedisStore, RetryingStore, Store, StoreError};
pub use transport::{Server, ServerError};
