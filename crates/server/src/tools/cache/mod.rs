//! Cache maintenance tools.

pub mod purge;

pub use purge::{CachePurgeOutput, CachePurgeParams, purge_impl};
