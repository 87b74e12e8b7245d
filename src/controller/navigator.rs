//! Drives the controller tree the way a browser session would.

use super::{current_path, transition, Controller, FlushReport, FrontController, PageController};
use crate::context::AppContext;
use crate::event::{dispatch, Event, FormSubmit, StateSelect};
use crate::error::TransitionError;
use crate::page::Page;
use crate::router::{format_state_list, RouterState, StateSegment};
use crate::view::FieldEdit;
use dealport_collab::RecordId;
use tracing::{debug, info};

/// Owns the root controller and translates gestures into transitions.
///
/// The first navigation of a [`Navigator::hydrating`] instance attaches to
/// the server-rendered markup; every later one renders fresh.
pub struct Navigator {
    cx: AppContext,
    root: FrontController,
    upgrade_pending: bool,
}

impl Navigator {
    pub fn new(cx: AppContext) -> Self {
        Self {
            root: FrontController::new(cx.clone()),
            cx,
            upgrade_pending: false,
        }
    }

    /// For a page whose document came from the server.
    pub fn hydrating(cx: AppContext) -> Self {
        Self {
            upgrade_pending: true,
            ..Self::new(cx)
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.cx
    }

    pub fn root(&self) -> &FrontController {
        &self.root
    }

    pub fn page_controller(&self) -> &PageController {
        self.root.page()
    }

    /// The deepest entered path, e.g. `page/home/edit`.
    pub fn current_state(&self) -> RouterState {
        current_path(&self.root)
    }

    pub async fn navigate(&mut self, target: &[StateSegment]) -> Result<(), TransitionError> {
        let upgrade = std::mem::take(&mut self.upgrade_pending);
        transition(&mut self.root, target, upgrade).await?;

        let url = self.cx.router.stringify(target);
        {
            let mut page = self.cx.page.lock();
            if upgrade || self.cx.server {
                page.set_url(url);
            } else {
                page.push_state(url);
            }
        }

        self.root.process_commands().await;
        Ok(())
    }

    /// Anchor activation inside the home page.
    ///
    /// Listeners may cancel the navigation and queue their own work instead.
    /// Returns whether the navigation happened.
    pub async fn select_state(&mut self, state: RouterState) -> Result<bool, TransitionError> {
        let mut event = Event::new(StateSelect { state });
        {
            let page = self.cx.page.lock();
            if let Some(home) = page.home() {
                dispatch(&mut event, &[&home.state_select]);
            }
        }

        if event.default_prevented() {
            debug!(state = %format_state_list(&event.detail.state), "state selection intercepted");
            self.root.process_commands().await;
            return Ok(false);
        }
        self.navigate(&event.detail.state).await?;
        Ok(true)
    }

    /// User input on a grid item. Only items in editing mode accept it.
    pub fn edit_field(&self, id: &RecordId, edit: FieldEdit) -> bool {
        let mut page = self.cx.page.lock();
        let Some((dom, home)) = page.home_parts() else {
            return false;
        };
        if !home.grid.item(id).is_some_and(|item| item.editing()) {
            return false;
        }
        home.grid.user_edit(dom, id, edit)
    }

    /// Submit gesture on the public form. The returned event tells whether
    /// the browser default (a full post) was prevented.
    pub async fn submit_form(&mut self, mut event: Event<FormSubmit>) -> Event<FormSubmit> {
        {
            let mut page = self.cx.page.lock();
            if let Some((dom, home)) = page.home_parts() {
                if let Some(form) = &home.submit_form {
                    form.emit_submit(dom, &mut event);
                }
            }
        }
        self.root.process_commands().await;
        event
    }

    pub fn with_page<R>(&self, f: impl FnOnce(&mut Page) -> R) -> R {
        f(&mut self.cx.page.lock())
    }

    /// Wait for the next remote change on a held context and apply it.
    pub async fn apply_next_remote_update(&mut self) -> Option<RecordId> {
        self.root.page_mut().next_remote_update().await
    }

    /// Apply remote changes that already arrived, plus any other queued work.
    pub async fn apply_pending_remote_updates(&mut self) {
        self.root.process_commands().await;
    }

    /// Flush captured edits now. `None` unless the home page is in edit mode.
    pub async fn flush_changes(&self) -> Option<FlushReport> {
        let page = self.root.page();
        if !page.is_home_active() {
            return None;
        }
        page.home().flush_now().await
    }

    /// Flush, wait for saves in flight, then leave every state.
    pub async fn teardown(&mut self) -> Result<(), TransitionError> {
        self.flush_changes().await;
        self.cx.saves.wait_idle().await;
        transition(&mut self.root, &[], false).await?;
        self.cx.saves.wait_idle().await;
        info!("page torn down");
        Ok(())
    }
}
