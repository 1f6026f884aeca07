//! docqa-cli
//!
//! Configuration and the chat session controller behind the `docqa`
//! binary.

pub mod config;
pub mod session;
