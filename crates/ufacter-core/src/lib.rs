//! ufacter-core: fact collection and aggregation engine
//!
//! Runs fact reporters concurrently, filters the facts they emit and folds
//! them into one hierarchical namespace ready for rendering.

pub mod config;
pub mod custom;
pub mod engine;
pub mod error;
pub mod fact;
pub mod filter;
pub mod namespace;
pub mod reporter;

pub use config::CollectionConfig;
pub use custom::{CustomFacts, CustomFactsOrder};
pub use engine::{CollectionEngine, CollectionSummary, DEFAULT_QUEUE_CAPACITY};
pub use error::CoreError;
pub use fact::{ERRORS_PREFIX, Fact, FactValue, STATS_PREFIX};
pub use filter::{FactFilter, Rejection};
pub use namespace::{Displaced, Namespace, Node};
pub use reporter::{FactSink, ReportOptions, Reporter};
