//! Controller tree.
//!
//! ```text
//! FrontController            page
//!   └─ PageController        home | @name
//!        ├─ HomePageController          none | edit | submit
//!        ├─ CompanyDetailPageController none
//!        └─ DummyController             anything (stateless fallback)
//! ```
//!
//! Each controller holds at most one state: the full path from the root down
//! to its own segment. [`node::transition`] moves the whole tree to a target
//! router state by leaving what diverged (innermost first) and entering what
//! is missing (outermost first).

pub mod detail;
pub mod dummy;
pub mod flush;
pub mod front;
pub mod home;
pub mod navigator;
pub mod node;
pub mod page;

pub use detail::CompanyDetailPageController;
pub use dummy::DummyController;
pub use flush::{ChangeFlusher, FlushReport};
pub use front::FrontController;
pub use home::HomePageController;
pub use navigator::Navigator;
pub use node::{current_path, transition};
pub use page::PageController;

use crate::error::TransitionError;
use crate::router::{RouterState, StateSegment};
use async_trait::async_trait;

/// A node in the controller tree.
#[async_trait]
pub trait Controller: Send {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Path from the root to this controller's state; `None` when stateless.
    fn path(&self) -> Option<&[StateSegment]>;

    /// This controller's own segment.
    fn state(&self) -> Option<&StateSegment> {
        self.path().and_then(|path| path.last())
    }

    /// Enter the state named by the last segment of `path`.
    ///
    /// With `upgrade` the markup for the state is already in the document and
    /// must be attached to instead of rebuilt. Only called while stateless.
    async fn enter(&mut self, path: RouterState, upgrade: bool) -> Result<(), TransitionError>;

    /// Tear down the current state completely. Safe to call while stateless
    /// or after a failed `enter`.
    fn leave(&mut self);

    /// The controller the current state delegates to.
    fn child(&mut self) -> Option<&mut dyn Controller> {
        None
    }

    fn child_ref(&self) -> Option<&dyn Controller> {
        None
    }

    /// Handle work queued by listeners since the last call.
    async fn process_commands(&mut self) {
        if let Some(child) = self.child() {
            child.process_commands().await;
        }
    }
}

pub(crate) fn unknown_state(controller: &'static str, state: &StateSegment) -> TransitionError {
    TransitionError::UnknownState {
        controller,
        state: state.clone(),
    }
}
