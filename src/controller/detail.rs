//! Controller below a company detail page.

use super::{unknown_state, Controller};
use crate::error::TransitionError;
use crate::router::{RouterState, StateSegment};
use async_trait::async_trait;

/// Only knows `none`; the detail view itself is owned by the page controller.
#[derive(Debug, Default)]
pub struct CompanyDetailPageController {
    path: Option<RouterState>,
}

impl CompanyDetailPageController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap the parent part of the current path after the entity was renamed.
    pub fn rebase(&mut self, parent: &[StateSegment]) {
        if let Some(path) = &mut self.path {
            let own = path.last().cloned();
            *path = parent.to_vec();
            path.extend(own);
        }
    }
}

#[async_trait]
impl Controller for CompanyDetailPageController {
    fn name(&self) -> &'static str {
        "company-detail"
    }

    fn path(&self) -> Option<&[StateSegment]> {
        self.path.as_deref()
    }

    async fn enter(&mut self, path: RouterState, _upgrade: bool) -> Result<(), TransitionError> {
        match path.last() {
            Some(state) if state.is("none") => {
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
}
