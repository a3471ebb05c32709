//! Core types and shared functionality for pagetally.
//!
//! This crate provides:
//! - Cache-aside fetching with per-URL access counting
//! - Key-value store port with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod content;
pub mod counter;
pub mod error;
pub mod fetch;
pub mod keys;
pub mod orchestrator;
pub mod store;

pub use config::{AppConfig, ConfigError, StoreBackend};
pub use content::ContentCache;
pub use counter::AccessCounter;
pub use error::{Error, FetchError};
pub use fetch::Fetcher;
pub use orchestrator::{FetchOrchestrator, Lookup, Tracked};
pub use store::{KvStore, MemoryStore, SqliteStore};
