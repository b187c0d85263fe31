//! Independent and project agnostic libraries
//!
//! Nothing in here knows about stores, tiers or the concrete queue names. Everything
//! specific to the deployment lives in the [`domain`](super::domain) and [`module`](super::module)
//! modules instead.

pub mod communication;
pub mod helpers;

/// Generic error type
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result with no value and a [`BoxedError`]
pub type EmptyResult = Result<(), BoxedError>;
