// Declare modules at the root level
pub mod aggregator;
pub mod alerts;
pub mod cache;
pub mod domain;
pub mod error;
pub mod irrigation;
pub mod monitor;
pub mod parser;
pub mod poller;
pub mod registry;
pub mod service;
pub mod simulator;
pub mod store;
pub mod time;
pub mod validators;

// Test utilities module (available in test and integration test builds)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export everything under a shared namespace for external access
pub mod shared {
    pub use super::aggregator;
    pub use super::alerts;
    pub use super::cache;
    pub use super::domain;
    pub use super::error;
    pub use super::irrigation;
    pub use super::monitor;
    pub use super::parser;
    pub use super::poller;
    pub use super::registry;
    pub use super::service;
    pub use super::simulator;
    pub use super::store;
    pub use super::time;
    pub use super::validators;
}

// Also re-export at root for convenience
pub use aggregator::*;
pub use alerts::*;
pub use cache::*;
pub use domain::*;
pub use error::*;
pub use irrigation::*;
pub use monitor::*;
pub use parser::*;
pub use poller::*;
pub use registry::*;
pub use service::*;
pub use simulator::*;
pub use store::*;
pub use time::*;
pub use validators::*;
