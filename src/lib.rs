// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod fetch;
pub mod format;
pub mod metrics;
pub mod roster;
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::Aggregator;
pub use crate::config::PushConfig;
pub use crate::dispatch::{DispatchOutcome, MessageTransport, MockTransport};
pub use crate::fetch::types::{Article, ArticleFetcher};
pub use crate::roster::{InMemoryRoster, Recipient, RosterProvider};
pub use crate::scheduler::{PushError, PushScheduler};
