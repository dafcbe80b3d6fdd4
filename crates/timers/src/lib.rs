//! Hierarchical Request Timers
//!
//! This crate records named, taggable timers in a thread-safe tree that
//! mirrors the call graph of a request, and exports them for timing reports:
//! - Timers and timer sets with insertion-ordered, lock-guarded storage
//! - Scope propagation so nested work lands in its own child set
//! - Depth-first flattening with per-export parent/id numbering
//! - A JSON wire tree that round-trips to a detached forest
//! - `Server-Timing` header export, fired once per response
//!
//! # Example
//!
//! ```rust
//! use timers::{Scope, TimerScope};
//!
//! let scope = Scope::with_new_set();
//! let set = scope.timers();
//!
//! set.new_timer("auth").tag("cached").start().stop();
//! set.wrap(&scope, "load page", |scope: Scope| {
//!     scope.timers().new_timer("query").start().stop();
//! });
//!
//! let header = set.server_timing();
//! assert_eq!(header.split(", ").count(), 3);
//!
//! let json = set.to_json().unwrap();
//! let restored = timers::TimerSet::from_json(&json).unwrap();
//! assert_eq!(restored.all_deep().len(), 3);
//! ```
//!
//! # Modules
//!
//! - [`timer`] - Timer handles and value snapshots
//! - [`set`] - Timer sets
//! - [`scope`] - Scope propagation
//! - [`tree`] - Traversal and flattening
//! - [`codec`] - JSON wire tree
//! - [`header`] - Server-Timing formatting
//! - [`response`] - Export-once response hook
//! - [`service`] - Application-wide timer service
//! - [`config`] - Configuration

pub mod codec;
pub mod config;
mod error;
pub mod header;
pub mod response;
pub mod scope;
mod service;
pub mod set;
pub mod timer;
pub mod tree;

pub use codec::WireTimer;
pub use config::{TimersConfig, DEFAULT_REQUEST_TIMER};
pub use error::{TimersError, TimersResult};
pub use header::SERVER_TIMING;
pub use response::{ExportTrigger, ResponseReport, ResponseTimings, TimingHeader};
pub use scope::{Scope, TimerScope};
pub use service::TimerService;
pub use set::TimerSet;
pub use timer::{StartMark, Timer, TimerSnapshot};
pub use tree::{FlatTimer, ROOT_ID};

/// Re-export for convenience
pub use std::time::Duration;
