//! Stateless fallback controller.

use super::Controller;
use crate::error::TransitionError;
use crate::router::{RouterState, StateSegment};
use async_trait::async_trait;

/// Accepts any state and does nothing with it. Stands in as the child of a
/// controller whose state has nothing below it, so the tree is always
/// traversable.
#[derive(Debug, Default)]
pub struct DummyController {
    path: Option<RouterState>,
}

impl DummyController {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Controller for DummyController {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn path(&self) -> Option<&[StateSegment]> {
        self.path.as_deref()
    }

    async fn enter(&mut self, path: RouterState, _upgrade: bool) -> Result<(), TransitionError> {
        self.path = Some(path);
        Ok(())
    }

    fn leave(&mut self) {
        self.path = None;
    }
}
