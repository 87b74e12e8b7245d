//! Collaborative context management.
//!
//! [`ContextRegistry`] keeps one live document context per record for the
//! session; [`AcquisitionManager`] hands out sets of them to page controllers
//! and forwards remote changes while they are held.

mod acquire;
mod registry;

pub use acquire::{Acquisition, AcquisitionManager, RemoteUpdate};
pub use registry::{ContextHold, ContextRegistry};
