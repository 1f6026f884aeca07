//! docqa-client
//!
//! Async client for the document Q&A backend: uploads, listings, renames,
//! downloads and queries, plus the failure classifier that turns transport
//! and HTTP errors into messages fit for a user.

pub mod classify;
pub mod client;
pub mod error;
pub mod normalize;
pub mod poll;
pub mod service;

pub use client::ApiClient;
pub use error::ClientError;
