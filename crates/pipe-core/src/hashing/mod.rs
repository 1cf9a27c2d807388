//! Módulo de hashing y canonicalización JSON.

pub mod canonical_json;
pub mod hash;
pub mod path;

pub use canonical_json::to_canonical_json;
pub use hash::{hash_str, hash_value};
pub use path::fingerprint_path;
