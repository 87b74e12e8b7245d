//! Integration test common infrastructure.
//!
//! Provides a seeded in-memory site, visitor sessions on it, and an
//! exception sink that records what the controllers report.

pub mod site;

#[allow(unused_imports)]
pub use site::{company, RecordingSink, TestSite, Visitor};
