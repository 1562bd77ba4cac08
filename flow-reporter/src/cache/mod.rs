//! Content-Addressed Response Cache
//!
//! Gates expensive text and image generation behind a fingerprint lookup.

pub mod fingerprint;
pub mod response_cache;

pub use fingerprint::{canonical_json, Fingerprint};
pub use response_cache::{CacheEntry, Namespace, ResponseCache};
