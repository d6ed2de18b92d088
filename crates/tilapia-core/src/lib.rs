//! # Tilapia Core
//!
//! Core types, traits, and error handling shared by the Tilapia crates.
//!
//! This crate provides:
//! - The response [`Body`] type (materialized, JSON value, or byte stream)
//! - The [`Middleware`] trait and [`Next`] chain
//! - Error types

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod body;
pub mod error;
pub mod middleware;

pub use body::{Body, BodyStream};
pub use error::{Error, Result};
pub use middleware::{HandlerFn, Middleware, Next, ResponseFuture};

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{Request, Response, StatusCode};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::body::{Body, BodyStream};
    pub use crate::error::{Error, Result};
    pub use crate::middleware::{Middleware, Next};
}
