//! docqa-core
//!
//! Pure domain types and backend endpoint conventions.
//! No I/O: this is the shared vocabulary of the docqa workspace.

pub mod endpoints;
pub mod error;
pub mod models;
