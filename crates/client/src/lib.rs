//! Client code for pagetally.
//!
//! This crate provides the HTTP fetch collaborator used by the server to
//! populate the content cache.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, UrlError, canonicalize};
