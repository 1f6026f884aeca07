//! docqa-history
//!
//! Client-local chat history: per-document transcripts persisted as one
//! JSON table through a pluggable key-value backend, bounded by age and
//! by storage capacity.

pub mod backend;
pub mod clock;
pub mod error;
pub mod state;
pub mod store;
