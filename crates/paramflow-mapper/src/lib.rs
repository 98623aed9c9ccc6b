//! ParamFlow mapping pipeline.
//!
//! Turns a stream of flat `(path, value)` parameter notifications, such as
//! TR-069/TR-181 `Device.Hosts.Host.3.PhysAddress = "11-22-33-44-55-66"`, into
//! typed entities keyed by an identifier taken from the path.
//!
//! - **pattern / router / trie**: compile dotted wildcard paths and route
//!   runtime paths through exact, prefix, suffix and fallback tiers
//! - **extractor**: derive entity keys from the path or value
//! - **transform**: named, memoized string-to-value conversions
//! - **pool / store**: instance reuse and the shared entity store
//! - **mapper**: the orchestrator, with batch fan-out and cancellation
//!
//! ```no_run
//! use std::sync::Arc;
//! use paramflow_core::{Entity, EntitySchema, TypeRegistry};
//! use paramflow_mapper::{KeyExtractor, Mapper, Pattern, Rule};
//!
//! #[derive(Default)]
//! struct Host {
//!     mac: String,
//! }
//!
//! impl Entity for Host {
//!     fn schema() -> EntitySchema<Self> {
//!         EntitySchema::new().field("MACAddress", |h: &mut Host| &mut h.mac)
//!     }
//! }
//!
//! let registry = TypeRegistry::new();
//! registry.register_entity::<Host>("host").unwrap();
//! let mapper = Mapper::new(Arc::new(registry)).unwrap();
//! mapper
//!     .add_rule(
//!         Rule::new(
//!             "host mac",
//!             Pattern::compile("Device.Hosts.Host.*.PhysAddress"),
//!             "host",
//!             "MACAddress",
//!             KeyExtractor::prefixed_segment("host:", 3),
//!         )
//!         .with_transform("mac_normalize"),
//!     )
//!     .unwrap();
//! mapper.process("Device.Hosts.Host.1.PhysAddress", "11-22-33-44-55-66").unwrap();
//! ```

pub mod cancel;
pub mod error;
pub mod extractor;
pub mod mapper;
pub mod path;
pub mod pattern;
pub mod pool;
pub mod router;
pub mod rule;
pub mod stats;
pub mod store;
pub mod transform;
pub mod trie;

pub use cancel::CancelToken;
pub use error::{MapperError, Result, TransformError};
pub use extractor::{extract_between, extract_instance, KeyExtractor, SegmentCache};
pub use mapper::{ErrorHandler, Mapper, MapperBuilder};
pub use pattern::{Pattern, PatternId, Segment};
pub use pool::ObjectPool;
pub use router::{RouteTier, Router};
pub use rule::Rule;
pub use stats::{MapperStats, StatsSnapshot};
pub use store::{EntityStore, Installed};
pub use transform::{CacheStats, TransformFn, TransformRegistry};
