//! # Launchpad Server
//!
//! HTTP surface of Launchpad.
//!
//! | Route | Method | Access | Purpose |
//! |-------|--------|--------|---------|
//! | `/waitlist` | POST | public | Join the waitlist, optionally sending a welcome email |
//! | `/campaign` | POST | admin | Send a template or custom HTML campaign |
//! | `/campaign` | GET | public | Subscriber count |
//! | `/health` | GET | public | Liveness and active transport |
//!
//! Admin routes take the password as `Authorization: Bearer <password>` or
//! `x-admin-password: <password>`. Errors are JSON `{"error": ..., "status": ...}`.
//!
//! ```rust,ignore
//! use launchpad_server::{App, AppState, server};
//! use std::sync::Arc;
//!
//! let state = AppState::from_config(&config)?;
//! let shutdown = state.shutdown.clone();
//! let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
//! server::serve(listener, Arc::new(App::new(state)?), shutdown).await?;
//! ```

mod app;
mod error;
pub mod routes;
pub mod secrets;
pub mod server;
mod state;
pub mod store;

pub use app::{App, MAX_BODY_BYTES};
pub use error::{ApiError, ServerError};
pub use secrets::{ADMIN_PASSWORD_HEADER, SecretProvider, StaticSecret};
pub use state::AppState;
pub use store::{InMemorySubscriberStore, StoreError, Subscriber, SubscriberStore};
