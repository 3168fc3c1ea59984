//! Fansly API interception module.
//!
//! This module provides:
//! - Watched endpoint families and the refetch marker
//! - Authenticated refetch using captured request headers
//! - The interceptor feeding the correlation store
//! - Payload and messaging types

pub mod client;
pub mod endpoints;
pub mod intercept;
pub mod types;

pub use client::{RefetchClient, DEFAULT_HEADER_DENYLIST};
pub use endpoints::{EndpointFamily, EndpointMatcher, API_BASE};
pub use intercept::Interceptor;
pub use types::*;
