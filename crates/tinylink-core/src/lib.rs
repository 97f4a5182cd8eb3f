//! Core types and traits for the Tinylink URL shortener.
//!
//! This crate provides the domain types shared by the storage backends,
//! the shortener service, and the HTTP gateway.

pub mod error;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use error::{CoreError, ShortenerError, StorageError};
pub use repository::{ReadRepository, Repository, ShortLink, Upsert};
pub use shortcode::ShortCode;
pub use shortener::Shortener;
