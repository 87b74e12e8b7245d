//! Root of the controller tree.

use super::{unknown_state, Controller, PageController};
use crate::context::AppContext;
use crate::error::TransitionError;
use crate::router::{RouterState, StateSegment};
use async_trait::async_trait;

/// Accepts `page` and delegates everything below it to the [`PageController`].
pub struct FrontController {
    path: Option<RouterState>,
    page: PageController,
}

impl FrontController {
    pub fn new(cx: AppContext) -> Self {
        Self {
            path: None,
            page: PageController::new(cx),
        }
    }

    pub fn page(&self) -> &PageController {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut PageController {
        &mut self.page
    }
}

#[async_trait]
impl Controller for FrontController {
    fn name(&self) -> &'static str {
        "front"
    }

    fn path(&self) -> Option<&[StateSegment]> {
        self.path.as_deref()
    }

    async fn enter(&mut self, path: RouterState, _upgrade: bool) -> Result<(), TransitionError> {
        match path.last() {
            Some(state) if state.is("page") => {
                self.path = Some(path);
                Ok(())
            }
            Some(state) => Err(unknown_state(self.name(), state)),
            None => Err(unknown_state(self.name(), &StateSegment::name(""))),
        }
    }

    fn leave(&mut self) {
        self.path = None;
    }

    fn child(&mut self) -> Option<&mut dyn Controller> {
        Some(&mut self.page)
    }

    fn child_ref(&self) -> Option<&dyn Controller> {
        Some(&self.page)
    }
}
