//! Transport layer: HTTP framing around the service layer.

mod server;

pub use server::{HttpResponse, REQUEST_ID_HEADER, Server, ServerError};
