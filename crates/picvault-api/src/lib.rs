//! Picvault API Library
//!
//! HTTP handlers, authentication extractor and application setup.

pub mod auth;
pub mod constants;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
