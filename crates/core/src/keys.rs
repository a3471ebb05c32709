//! Store key namespaces.
//!
//! Each URL is tracked under two keys: `count:<url>` for the access counter
//! and `content:<url>` for the cached body. Neither prefix is a prefix of the
//! other, so the namespaces cannot collide for any URL.

pub const COUNT_PREFIX: &str = "count:";
pub const CONTENT_PREFIX: &str = "content:";

pub fn count_key(url: &str) -> String {
    format!("{COUNT_PREFIX}{url}")
}

pub fn content_key(url: &str) -> String {
    format!("{CONTENT_PREFIX}{url}")
}
