//! Cache: cálculo de keys y serialización de lookup→publicación por key.

pub mod locks;
pub mod resolver;

pub use locks::KeyLocks;
pub use resolver::{CacheKeyResolver, InputIdentity};
