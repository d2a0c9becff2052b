//! Client library for the TeamBoard team/project/task tracker.
//!
//! [`http::ApiClient`] talks to the backend and owns the bearer-token
//! lifecycle; [`state`] holds the session, team and board stores built on
//! top of it.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod parser;
pub mod state;

pub use error::{ApiError, TransportError};
pub use http::ApiClient;
