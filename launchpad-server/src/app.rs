// Routing and request handling

use bytes::Bytes;
use http::header::{ALLOW, HeaderValue};
use http::{Method, Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use std::time::Instant;
use tracing::{debug, info};

use crate::{ApiError, AppState, ServerError, routes};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Campaign,
    Waitlist,
    Health,
}

impl Route {
    fn allowed(&self) -> &'static str {
        match self {
            Route::Campaign => "GET, POST",
            Route::Waitlist => "POST",
            Route::Health => "GET",
        }
    }
}

/// The Launchpad HTTP application.
pub struct App {
    state: AppState,
    router: matchit::Router<Route>,
}

impl App {
    pub fn new(state: AppState) -> Result<Self, ServerError> {
        let mut router = matchit::Router::new();
        router.insert("/campaign", Route::Campaign)?;
        router.insert("/waitlist", Route::Waitlist)?;
        router.insert("/health", Route::Health)?;

        Ok(Self { state, router })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Read a streamed request body, then handle the request.
    pub async fn serve<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();

        let bytes = match Limited::new(body, MAX_BODY_BYTES).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                let error = if err.downcast_ref::<LengthLimitError>().is_some() {
                    ApiError::PayloadTooLarge(format!("body exceeds {MAX_BODY_BYTES} bytes"))
                } else {
                    ApiError::BadRequest(format!("failed to read request body: {err}"))
                };
                return error.into_response();
            }
        };

        self.handle(Request::from_parts(parts, bytes)).await
    }

    /// Route and handle a request whose body is already in memory.
    pub async fn handle(&self, req: Request<Bytes>) -> Response<Full<Bytes>> {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = match self.route(req).await {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "Request failed");
                err.into_response()
            }
        };

        info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request handled"
        );
        response
    }

    async fn route(&self, req: Request<Bytes>) -> Result<Response<Full<Bytes>>, ApiError> {
        let route = match self.router.at(req.uri().path()) {
            Ok(matched) => *matched.value,
            Err(_) => return Err(ApiError::NotFound(req.uri().path().to_string())),
        };

        let method = req.method().clone();
        match (route, &method) {
            (Route::Campaign, &Method::POST) => routes::send_campaign(&self.state, req).await,
            (Route::Campaign, &Method::GET) => routes::campaign_stats(&self.state).await,
            (Route::Waitlist, &Method::POST) => routes::join_waitlist(&self.state, req).await,
            (Route::Health, &Method::GET) => routes::health(&self.state),
            (route, _) => {
                let mut response = ApiError::MethodNotAllowed(format!(
                    "{} {}",
                    method,
                    req.uri().path()
                ))
                .into_response();
                response
                    .headers_mut()
                    .insert(ALLOW, HeaderValue::from_static(route.allowed()));
                Ok(response)
            }
        }
    }
}
