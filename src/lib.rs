//! dealport - company directory page controllers
//!
//! The controller layer of a server-rendered, progressively upgraded company
//! directory: a tree of state-driven controllers mounting views on router
//! transitions, debounced capture of user edits into field operations, and
//! reference-counted acquisition of collaborative record contexts.

pub mod collab;
pub mod config;
pub mod context;
pub mod controller;
pub mod debounce;
pub mod dom;
pub mod error;
pub mod event;
pub mod metrics;
pub mod page;
pub mod resource;
pub mod router;
pub mod telemetry;
pub mod view;

pub use context::{AppContext, ExceptionSink, User};
pub use controller::{FlushReport, Navigator};
pub use error::{AcquisitionError, ResourceError, SubmissionError, TransitionError};
