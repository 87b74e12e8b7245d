//! Home page states: `none`, `edit` and `submit`.

use super::{unknown_state, ChangeFlusher, Controller, FlushReport};
use crate::collab::AcquisitionManager;
use crate::context::AppContext;
use crate::debounce::{Completion, Debouncer};
use crate::error::{AcquisitionError, ResourceError, TransitionError};
use crate::event::ListenerId;
use crate::page::Page;
use crate::router::{RouterState, StateSegment};
use crate::view::{Disposable, HomePage, Hydratable, Mountable, StateAnchor, SubmitForm};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

const EDIT_ANCHOR: &str = "editAnchor";
const SUBMIT_FAILED: &str = "Sorry, something went wrong with your form submission";

/// Work requested by listeners, handled in `process_commands`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HomeCommand {
    AddCompany,
    SubmitForm,
}

/// Listener registrations on the home view.
#[derive(Debug, Default)]
struct Listeners {
    state_select: Option<ListenerId>,
    editable_change: Option<ListenerId>,
}

pub struct HomePageController {
    cx: AppContext,
    contexts: Arc<AcquisitionManager>,
    path: Option<RouterState>,
    edit_anchor: Option<StateAnchor>,
    listeners: Listeners,
    flusher: ChangeFlusher,
    debouncer: Debouncer,
    commands_tx: mpsc::UnboundedSender<HomeCommand>,
    commands_rx: mpsc::UnboundedReceiver<HomeCommand>,
}

impl HomePageController {
    pub fn new(cx: AppContext, contexts: Arc<AcquisitionManager>) -> Self {
        let flusher = ChangeFlusher::new(cx.clone(), Arc::clone(&contexts));
        let debouncer = {
            let flusher = flusher.clone();
            Debouncer::new(
                cx.config.editing.flush_interval(),
                cx.config.editing.flush_immediate,
                move |completion: Completion| {
                    let flusher = flusher.clone();
                    async move {
                        flusher.flush().await;
                        completion.done();
                    }
                },
            )
        };
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Self {
            cx,
            contexts,
            path: None,
            edit_anchor: None,
            listeners: Listeners::default(),
            flusher,
            debouncer,
            commands_tx,
            commands_rx,
        }
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Flush captured edits now instead of waiting for the debouncer.
    /// `None` unless in edit mode.
    pub async fn flush_now(&self) -> Option<FlushReport> {
        self.flusher.flush().await
    }

    /// Path of the sibling state `name` (e.g. `page/home/edit` from `page/home/none`).
    fn sibling_state(&self, name: &str) -> RouterState {
        let mut state: RouterState = match &self.path {
            Some(path) => path[..path.len().saturating_sub(1)].to_vec(),
            None => vec![StateSegment::name("page"), StateSegment::name("home")],
        };
        state.push(StateSegment::name(name));
        state
    }

    fn is_in(&self, name: &str) -> bool {
        self.state().is_some_and(|state| state.is(name))
    }

    // ========================================================================
    // Contextual menu
    // ========================================================================

    fn hydrate_edit_anchor(&mut self, page: &Page) -> Result<(), TransitionError> {
        self.edit_anchor = StateAnchor::find_by_class(&page.dom, page.contextual_menu(), EDIT_ANCHOR)?;
        Ok(())
    }

    fn create_edit_anchor(&mut self, page: &mut Page, target: &str, label: &str) {
        let state = self.sibling_state(target);
        let anchor = StateAnchor::create(&mut page.dom, &*self.cx.router, state, label);
        page.dom.add_class(anchor.outer(), EDIT_ANCHOR);
        let menu = page.contextual_menu();
        anchor.mount(&mut page.dom, menu);
        self.edit_anchor = Some(anchor);
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Intercept navigation to the submit state and turn it into "add company".
    fn listen_add_company(&mut self, home: &mut HomePage) {
        let target = self.sibling_state("submit");
        let tx = self.commands_tx.clone();
        let id = home.state_select.on(move |event| {
            if event.detail.state != target {
                return;
            }
            event.prevent_default();
            event.stop_propagation();
            let _ = tx.send(HomeCommand::AddCompany);
        });
        self.listeners.state_select = Some(id);
    }

    fn listen_editable_change(&mut self, home: &mut HomePage) {
        let debouncer = self.debouncer.clone();
        let id = home.grid.editable_change.on(move |_| debouncer.trigger());
        self.listeners.editable_change = Some(id);
    }

    fn listen_submit(&self, form: &mut SubmitForm) {
        let tx = self.commands_tx.clone();
        form.submit.on(move |event| {
            if event.default_prevented() {
                // Invalid input, or cancelled by someone else.
                return;
            }
            event.prevent_default();
            let _ = tx.send(HomeCommand::SubmitForm);
        });
    }

    fn remove_listeners(&mut self, home: &mut HomePage) {
        if let Some(id) = self.listeners.state_select.take() {
            home.state_select.remove(id);
        }
        if let Some(id) = self.listeners.editable_change.take() {
            home.grid.editable_change.remove(id);
        }
    }

    // ========================================================================
    // States
    // ========================================================================

    fn enter_none(&mut self, upgrade: bool) -> Result<(), TransitionError> {
        let handle = Arc::clone(&self.cx.page);
        let mut page = handle.lock();

        if upgrade {
            self.hydrate_edit_anchor(&page)?;
        } else if self.cx.user.is_some() {
            self.create_edit_anchor(&mut page, "edit", "[ edit ]");
        }

        if self.cx.user.is_some() {
            let (_, home) = page.home_parts().ok_or(TransitionError::NoPageView)?;
            self.listen_add_company(home);
        }
        Ok(())
    }

    fn enter_edit(&mut self, upgrade: bool) -> Result<(), TransitionError> {
        let handle = Arc::clone(&self.cx.page);
        let mut page = handle.lock();

        if upgrade {
            self.hydrate_edit_anchor(&page)?;
        } else {
            if self.cx.user.is_some() {
                let (dom, home) = page.home_parts().ok_or(TransitionError::NoPageView)?;
                home.grid.set_editing(dom, true);
            }
            self.create_edit_anchor(&mut page, "none", "[ stop editing ]");
        }

        if self.cx.user.is_some() {
            let (_, home) = page.home_parts().ok_or(TransitionError::NoPageView)?;
            self.listen_editable_change(home);
            self.listen_add_company(home);
            self.flusher.start_editing();
        }
        Ok(())
    }

    async fn enter_submit(&mut self, upgrade: bool) -> Result<(), TransitionError> {
        let handle = Arc::clone(&self.cx.page);

        if upgrade {
            let mut page = handle.lock();
            let (dom, home) = page.home_parts().ok_or(TransitionError::NoPageView)?;
            let mut form = SubmitForm::hydrate_child(dom, home.outer())?;
            self.listen_submit(&mut form);
            home.submit_form = Some(form);
            return Ok(());
        }

        let path = self.path.clone().unwrap_or_default();
        let fader = self.sibling_state("none");

        let posted = {
            let mut page = handle.lock();
            page.fader_state = Some(fader.clone());
            let (dom, home) = page.home_parts().ok_or(TransitionError::NoPageView)?;

            // Submitter fields are only asked from anonymous visitors.
            let mut form = SubmitForm::create(dom, self.cx.csrf_token.as_deref(), self.cx.user.is_none());
            form.set_action(dom, self.cx.router.stringify(&path));
            form.mount(dom, home.outer());

            let mut posted = None;
            if self.cx.csrf_valid {
                if let Some(data) = &self.cx.post_data {
                    form.set_all(dom, data);
                    form.mark_attempted(dom);
                    if form.validate(dom, true).is_ok() {
                        form.show_thanks(dom, &*self.cx.router, &fader);
                        posted = Some(data.clone());
                    }
                }
            }

            if posted.is_none() {
                self.listen_submit(&mut form);
                dom.scroll_into_view(form.outer());
            }
            home.submit_form = Some(form);
            posted
        };

        if let Some(data) = posted {
            info!(name = %data.name, "submitting posted company form");
            self.cx.resources.company_submit.submit(data).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn add_company(&mut self) {
        if self.cx.user.is_none() {
            debug!("add company ignored without a user");
            return;
        }
        let _saving = self.cx.saves.begin();
        if let Err(e) = self.try_add_company().await {
            self.cx.exceptions.log_exception(&e);
        }
    }

    async fn try_add_company(&mut self) -> Result<(), TransitionError> {
        if !self.is_in("edit") {
            let target = self.sibling_state("edit");
            self.leave();
            if let Err(e) = self.enter(target.clone(), false).await {
                self.leave();
                return Err(e);
            }
            let url = self.cx.router.stringify(&target);
            self.cx.page.lock().push_state(url);
        }

        let acquisition = self
            .contexts
            .current()
            .ok_or(ResourceError::Acquisition(AcquisitionError::Released))?;
        let company = self.cx.resources.company.new_empty_record(&acquisition).await?;

        let mut page = self.cx.page.lock();
        let (dom, home) = page.home_parts().ok_or(TransitionError::NoPageView)?;
        let item = home.grid.add_company(dom, &*self.cx.router, &company);
        item.set_editing(dom, true);
        let outer = item.outer();
        dom.scroll_into_view(outer);
        info!(id = %company.id, "added empty company");
        Ok(())
    }

    async fn submit_form(&mut self) {
        let fader = self.sibling_state("none");
        let handle = Arc::clone(&self.cx.page);

        let data = {
            let mut page = handle.lock();
            let Some((dom, home)) = page.home_parts() else {
                return;
            };
            let Some(form) = &home.submit_form else {
                return;
            };
            form.set_busy(dom, true);
            form.get_all(dom)
        };

        let result = self.cx.resources.company_submit.submit(data).await;

        let mut page = handle.lock();
        let Some((dom, home)) = page.home_parts() else {
            return;
        };
        let Some(form) = &home.submit_form else {
            return;
        };
        match result {
            Ok(()) => form.show_thanks(dom, &*self.cx.router, &fader),
            Err(e) => {
                self.cx.exceptions.log_exception(&e);
                form.set_exception_message(dom, SUBMIT_FAILED);
                form.set_busy(dom, false);
            }
        }
    }
}

#[async_trait]
impl Controller for HomePageController {
    fn name(&self) -> &'static str {
        "home"
    }

    fn path(&self) -> Option<&[StateSegment]> {
        self.path.as_deref()
    }

    async fn enter(&mut self, path: RouterState, upgrade: bool) -> Result<(), TransitionError> {
        let Some(state) = path.last().cloned() else {
            return Err(unknown_state(self.name(), &StateSegment::name("")));
        };
        self.path = Some(path);
        match state.as_name() {
            Some("none") => self.enter_none(upgrade),
            Some("edit") => self.enter_edit(upgrade),
            Some("submit") => self.enter_submit(upgrade).await,
            _ => Err(unknown_state(self.name(), &state)),
        }
    }

    fn leave(&mut self) {
        let editing = self.is_in("edit");
        let submitting = self.is_in("submit");
        let handle = Arc::clone(&self.cx.page);
        let mut page = handle.lock();

        if editing {
            if self.debouncer.cancel() {
                debug!("pending flush taken over by leave");
            }
            self.flusher.finish(&page);
        }

        if let Some((dom, home)) = page.home_parts() {
            self.remove_listeners(home);
            if editing {
                home.grid.set_editing(dom, false);
            }
            if let Some(form) = home.submit_form.take() {
                form.dispose(dom);
            }
        }
        if let Some(anchor) = self.edit_anchor.take() {
            anchor.dispose(&mut page.dom);
        }
        if editing {
            page.last_save = None;
        }
        if submitting {
            page.fader_state = None;
        }
        self.path = None;
    }

    async fn process_commands(&mut self) {
        while let Ok(command) = self.commands_rx.try_recv() {
            match command {
                HomeCommand::AddCompany => self.add_company().await,
                HomeCommand::SubmitForm => self.submit_form().await,
            }
        }
    }
}
