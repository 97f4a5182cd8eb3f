//! URL shortener service implementation.
//!
//! Ties a [`Repository`](tinylink_core::Repository) to a
//! [`Generator`](tinylink_generator::Generator). Core types are re-exported
//! from `tinylink_core`.

pub mod service;

pub use service::{ShortenerService, DEFAULT_MAX_ATTEMPTS};
pub use tinylink_core::{Shortener, ShortenerError};
