//! Page-level controller: mounts the page view and holds company contexts.

use super::{
    current_path, unknown_state, CompanyDetailPageController, Controller, DummyController,
    HomePageController,
};
use crate::collab::{Acquisition, AcquisitionManager, RemoteUpdate};
use crate::context::AppContext;
use crate::error::{AcquisitionError, HydrateError, TransitionError};
use crate::metrics;
use crate::page::PageView;
use crate::resource::{sort_by_name, Company};
use crate::router::{RouterState, StateSegment};
use crate::view::{CompanyDetailPage, EditableRecord, HomePage, Hydratable, Mountable, NotFound};
use async_trait::async_trait;
use dealport_collab::{RecordId, StoreError};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Active {
    Home,
    Detail,
    Dummy,
}

/// States `home` and `@name`.
///
/// Owns the page view and the company contexts acquired for it. Remote
/// changes to those companies are queued by the acquisition listener and
/// applied to the view in [`Controller::process_commands`].
pub struct PageController {
    cx: AppContext,
    path: Option<RouterState>,
    active: Active,
    home: HomePageController,
    detail: CompanyDetailPageController,
    dummy: DummyController,
    contexts: Arc<AcquisitionManager>,
    remote_tx: mpsc::UnboundedSender<RemoteUpdate>,
    remote_rx: mpsc::UnboundedReceiver<RemoteUpdate>,
}

impl PageController {
    pub fn new(cx: AppContext) -> Self {
        let contexts = Arc::new(AcquisitionManager::new(Arc::clone(&cx.registry)));
        let (remote_tx, remote_rx) = mpsc::unbounded_channel();
        Self {
            home: HomePageController::new(cx.clone(), Arc::clone(&contexts)),
            detail: CompanyDetailPageController::new(),
            dummy: DummyController::new(),
            cx,
            path: None,
            active: Active::Dummy,
            contexts,
            remote_tx,
            remote_rx,
        }
    }

    pub fn contexts(&self) -> &Arc<AcquisitionManager> {
        &self.contexts
    }

    pub fn home(&self) -> &HomePageController {
        &self.home
    }

    pub fn home_mut(&mut self) -> &mut HomePageController {
        &mut self.home
    }

    pub fn is_home_active(&self) -> bool {
        self.active == Active::Home && self.home.path().is_some()
    }

    /// Wait for the next remote change and apply it. Returns the record id.
    pub async fn next_remote_update(&mut self) -> Option<RecordId> {
        let update = self.remote_rx.recv().await?;
        let id = update.id.clone();
        self.on_remote_update(update);
        Some(id)
    }

    async fn acquire(&self, ids: Option<Vec<RecordId>>) -> Result<Arc<Acquisition>, AcquisitionError> {
        let acquisition = self.contexts.acquire(ids).await?;
        let tx = self.remote_tx.clone();
        acquisition.add_listener(move |update| {
            // Receiver lives as long as this controller.
            let _ = tx.send(update);
        })?;
        Ok(acquisition)
    }

    // ========================================================================
    // home
    // ========================================================================

    async fn enter_home(&mut self, upgrade: bool) -> Result<(), TransitionError> {
        self.active = Active::Home;

        if upgrade {
            {
                let mut page = self.cx.page.lock();
                let content = page.content();
                let home = HomePage::hydrate_child(&page.dom, content)?;
                page.view = Some(PageView::Home(home));
            }
            self.acquire(None).await?;
            return Ok(());
        }

        let mut companies = if self.cx.server {
            self.cx.resources.company.all().await?
        } else {
            let acquisition = self.acquire(None).await?;
            acquisition
                .all_snapshots()
                .iter()
                .map(|snapshot| Company::from_snapshot(snapshot, self.cx.user.as_ref()))
                .collect()
        };
        sort_by_name(&mut companies);

        let mut page = self.cx.page.lock();
        let page = &mut *page;
        let router = &*self.cx.router;
        let mut home = HomePage::create(&mut page.dom);
        for company in &companies {
            home.grid.add_company(&mut page.dom, router, company);
        }
        home.grid.add_placeholder(&mut page.dom, router);
        let content = page.content();
        home.mount(&mut page.dom, content);
        page.title = self.cx.site_title(home.title());
        page.view = Some(PageView::Home(home));
        debug!(companies = companies.len(), "rendered home page");
        Ok(())
    }

    // ========================================================================
    // @name
    // ========================================================================

    async fn enter_named_entity(&mut self, name: &str, upgrade: bool) -> Result<(), TransitionError> {
        // Keep the tree traversable if nothing resolves.
        self.active = Active::Dummy;

        if upgrade {
            let company_id = {
                let mut page = self.cx.page.lock();
                let content = page.content();
                if let Some(not_found) = NotFound::find_child(&page.dom, content)? {
                    page.view = Some(PageView::NotFound(not_found));
                    None
                } else if let Some(detail) = CompanyDetailPage::find_child(&page.dom, content)? {
                    let id = detail.id().clone();
                    page.view = Some(PageView::CompanyDetail(detail));
                    Some(id)
                } else {
                    return Err(HydrateError::NoMatchingView.into());
                }
            };
            if let Some(id) = company_id {
                self.active = Active::Detail;
                self.acquire(Some(vec![id])).await?;
            }
            return Ok(());
        }

        let named = self.cx.resources.named_entity.by_name(name).await?;
        let company = match named.as_ref().and_then(|n| n.company.clone()) {
            Some(id) => self.load_company(id).await?,
            None => None,
        };

        match (named, company) {
            (Some(_), Some(company)) => {
                let mut page = self.cx.page.lock();
                let page = &mut *page;
                let detail = CompanyDetailPage::create(&mut page.dom, &*self.cx.router, &company);
                let content = page.content();
                detail.mount(&mut page.dom, content);
                page.title = self.cx.site_title(detail.title());
                page.view = Some(PageView::CompanyDetail(detail));
                self.active = Active::Detail;
                info!(name, id = %company.id, "rendered company page");
            }
            (Some(named), None) => {
                if let Some(company) = &named.company {
                    error!(
                        name = %named.name,
                        company = %company,
                        "named entity references a company that does not exist"
                    );
                    metrics::record_inconsistency();
                } else {
                    info!(name = %named.name, user = ?named.user, "named entity has no company page");
                }
                self.render_not_found();
            }
            (None, _) => {
                debug!(name, "no such named entity");
                self.render_not_found();
            }
        }
        Ok(())
    }

    /// Fetch one company; `None` if its record is missing.
    async fn load_company(&self, id: RecordId) -> Result<Option<Company>, TransitionError> {
        if self.cx.server {
            let companies = self.cx.resources.company.by_ids(std::slice::from_ref(&id)).await?;
            return Ok(companies.into_iter().next());
        }

        match self.acquire(Some(vec![id])).await {
            Ok(acquisition) => Ok(acquisition
                .all_snapshots()
                .first()
                .map(|snapshot| Company::from_snapshot(snapshot, self.cx.user.as_ref()))),
            Err(AcquisitionError::Store(StoreError::NotFound(_))) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn render_not_found(&self) {
        let mut page = self.cx.page.lock();
        let page = &mut *page;
        let not_found = NotFound::create(&mut page.dom);
        let content = page.content();
        not_found.mount(&mut page.dom, content);
        page.view = Some(PageView::NotFound(not_found));
    }

    // ========================================================================
    // Remote updates
    // ========================================================================

    fn on_remote_update(&mut self, update: RemoteUpdate) {
        let Some(state) = self.state().cloned() else {
            return;
        };

        let values: Map<String, Value> = update
            .keys
            .iter()
            .map(|key| (key.clone(), update.snapshot.get(key).cloned().unwrap_or(Value::Null)))
            .collect();

        let router = Arc::clone(&self.cx.router);
        let renamed = {
            let mut page = self.cx.page.lock();
            let page = &mut *page;
            match (&state, &mut page.view) {
                (StateSegment::Name(name), Some(PageView::Home(home))) if name == "home" => {
                    let Some(item) = home.grid.item_mut(&update.id) else {
                        return;
                    };
                    info!(id = %update.id, keys = ?update.keys, "applying remote update to grid item");
                    item.set_values(&mut page.dom, &*router, &values);
                    metrics::record_remote_update("home");
                    None
                }
                (StateSegment::NamedEntity(_), Some(PageView::CompanyDetail(detail)))
                    if detail.id() == &update.id =>
                {
                    info!(id = %update.id, keys = ?update.keys, "applying remote update to company page");
                    detail.set_values(&mut page.dom, &*router, &values);
                    metrics::record_remote_update("detail");
                    values
                        .get("namedEntityId")
                        .map(|v| v.as_str().unwrap_or(update.id.as_str()).to_string())
                }
                _ => return,
            }
        };

        if let Some(name) = renamed {
            self.rename(&name);
        }
    }

    /// The shown company got a new URL name: rewrite the address bar in place.
    fn rename(&mut self, name: &str) {
        let Some(path) = &mut self.path else {
            return;
        };
        if let Some(last) = path.last_mut() {
            *last = StateSegment::named_entity(name);
        }
        let parent = path.clone();
        self.detail.rebase(&parent);

        let url = self.cx.router.stringify(&current_path(&*self));
        info!(name, url = %url, "company renamed; replacing URL");
        self.cx.page.lock().replace_state(url);
    }
}

#[async_trait]
impl Controller for PageController {
    fn name(&self) -> &'static str {
        "page"
    }

    fn path(&self) -> Option<&[StateSegment]> {
        self.path.as_deref()
    }

    async fn enter(&mut self, path: RouterState, upgrade: bool) -> Result<(), TransitionError> {
        let Some(state) = path.last().cloned() else {
            return Err(unknown_state(self.name(), &StateSegment::name("")));
        };
        self.path = Some(path);
        match &state {
            StateSegment::Name(name) if name == "home" => self.enter_home(upgrade).await,
            StateSegment::NamedEntity(entity) => self.enter_named_entity(&entity.name, upgrade).await,
            other => Err(unknown_state(self.name(), other)),
        }
    }

    fn leave(&mut self) {
        self.contexts.release();
        self.cx.page.lock().clear_view();
        while self.remote_rx.try_recv().is_ok() {}
        self.active = Active::Dummy;
        self.path = None;
    }

    fn child(&mut self) -> Option<&mut dyn Controller> {
        let child: &mut dyn Controller = match self.active {
            Active::Home => &mut self.home,
            Active::Detail => &mut self.detail,
            Active::Dummy => &mut self.dummy,
        };
        Some(child)
    }

    fn child_ref(&self) -> Option<&dyn Controller> {
        let child: &dyn Controller = match self.active {
            Active::Home => &self.home,
            Active::Detail => &self.detail,
            Active::Dummy => &self.dummy,
        };
        Some(child)
    }

    async fn process_commands(&mut self) {
        while let Ok(update) = self.remote_rx.try_recv() {
            self.on_remote_update(update);
        }
        if let Some(child) = self.child() {
            child.process_commands().await;
        }
    }
}
