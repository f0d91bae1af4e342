//! Content-addressed artifact cache.
//!
//! Three layers, composed by the request orchestrator:
//!
//! - [`canonicalize_str`] / [`canonical_string`]: deterministic JSON, the
//!   foundation of key stability across runs and hosts
//! - [`CacheKey`]: SHA-256 content addressing over length-prefixed segments
//! - [`DiagramCache`]: bounded LRU + TTL store of [`CachedEntry`] values
//! - [`SingleFlight`]: at-most-one concurrent computation per key
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use dg_cache::{CacheKey, CachedEntry, DiagramCache};
//! use dg_core::{OutputType, RenderedArtifact};
//!
//! let cache = DiagramCache::new(1024, Duration::from_secs(60));
//! let key = CacheKey { kind: "pyramid_3", payload: "{}", theme: "{}" }.compute_hash();
//! cache.put(&key, CachedEntry {
//!     artifact: RenderedArtifact::svg("<svg/>".to_owned(), OutputType::Svg),
//!     public_url: None,
//!     generation_method: "svg_template".to_owned(),
//! });
//! assert!(cache.get(&key).is_some());
//! ```

mod canonical;
mod key;
mod singleflight;
mod store;

pub use canonical::{CanonicalError, canonical_string, canonicalize_str};
pub use key::CacheKey;
pub use singleflight::{FlightResult, SingleFlight};
pub use store::{CachedEntry, DiagramCache};
