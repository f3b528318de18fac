use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::Instrument;

use crate::service::{
    Api, ApiResponse, BAD_REQUEST, INTERNAL_ERROR, METHOD_NOT_ALLOWED, METHOD_PATH, NOT_FOUND, OK,
    RequestContext,
};

/// Header carrying a caller-chosen request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const HEALTH_PATH: &str = "health";

pub type HttpResponse = Response<Full<Bytes>>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// HTTP/1 front end for an [`Api`].
///
/// The core runs on the blocking pool, since cache backends may block.
pub struct Server {
    listener: TcpListener,
    api: Arc<Api>,
    request_timeout: Duration,
}

impl Server {
    /// Bind `addr`; port 0 picks an ephemeral port (see [`Server::local_addr`]).
    pub async fn bind(
        addr: SocketAddr,
        api: Api,
        request_timeout: Duration,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            api: Arc::new(api),
            request_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "cannot listen for Ctrl-C, serving until killed");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves. Connections already accepted finish
    /// on their own tasks.
    pub async fn serve_with_shutdown(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "starting server");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let api = Arc::clone(&self.api);
                            let timeout = self.request_timeout;
                            tokio::spawn(async move {
                                let service = service_fn(move |req| {
                                    handle_request(Arc::clone(&api), timeout, req)
                                });
                                if let Err(err) = http1::Builder::new()
                                    .serve_connection(TokioIo::new(stream), service)
                                    .await
                                {
                                    tracing::debug!(%remote_addr, error = %err, "connection error");
                                }
                            });
                        }
                        Err(err) => tracing::error!(error = %err, "failed to accept connection"),
                    }
                }
                () = &mut shutdown => {
                    tracing::info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }
        Ok(())
    }
}

async fn handle_request(
    api: Arc<Api>,
    timeout: Duration,
    req: Request<Incoming>,
) -> Result<HttpResponse, Infallible> {
    let request_id = request_id(&req);
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let span = tracing::info_span!("request", %request_id, %method, %path);

    let response = async {
        let route = path.trim_matches('/');
        match method {
            Method::POST => handle_post(api, timeout, request_id.clone(), path.clone(), req).await,
            Method::GET if route == HEALTH_PATH => handle_health(api).await,
            _ if route == METHOD_PATH => ApiResponse::failure(METHOD_NOT_ALLOWED),
            _ => ApiResponse::failure(NOT_FOUND),
        }
    }
    .instrument(span)
    .await;

    Ok(to_http(&response, &request_id))
}

async fn handle_post(
    api: Arc<Api>,
    timeout: Duration,
    request_id: String,
    path: String,
    req: Request<Incoming>,
) -> ApiResponse {
    let body = match tokio::time::timeout(timeout, req.into_body().collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "failed to read request body");
            return ApiResponse::failure(BAD_REQUEST);
        }
        Err(_) => {
            tracing::warn!("request body read timed out");
            return ApiResponse::failure(BAD_REQUEST);
        }
    };

    let span = tracing::Span::current();
    let task = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        let mut ctx = RequestContext::new(request_id);
        api.handle(&path, &body, &mut ctx)
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            tracing::error!(error = %err, "request handler panicked");
            ApiResponse::failure(INTERNAL_ERROR)
        }
        Err(_) => {
            tracing::error!("request handler timed out");
            ApiResponse::failure(INTERNAL_ERROR)
        }
    }
}

async fn handle_health(api: Arc<Api>) -> ApiResponse {
    match tokio::task::spawn_blocking(move || api.health()).await {
        Ok(body) => ApiResponse { code: OK, body },
        Err(err) => {
            tracing::error!(error = %err, "health probe panicked");
            ApiResponse::failure(INTERNAL_ERROR)
        }
    }
}

fn request_id<B>(req: &Request<B>) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().simple().to_string(), str::to_owned)
}

fn to_http(response: &ApiResponse, request_id: &str) -> HttpResponse {
    let mut http = Response::new(Full::new(Bytes::from(response.to_bytes())));
    *http.status_mut() =
        StatusCode::from_u16(response.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let headers = http.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    http
}
