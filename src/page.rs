//! The page document and its mutable page-level state.
//!
//! A [`Page`] owns the element tree plus everything the controllers hang off
//! the document: the mounted page view, the title, the "last saved" marker,
//! the fader state of the submit overlay and the browser-history entries
//! recorded by silent URL replacements. It is shared as a [`PageHandle`].

use crate::dom::{Dom, ElementId};
use crate::error::HydrateError;
use crate::metrics;
use crate::router::RouterState;
use crate::view::{CompanyDetailPage, Disposable, HomePage, Mountable, NotFound};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

const CONTEXTUAL_MENU: &str = "contextualMenu";
const CONTENT: &str = "content";

/// How the address bar was changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlChange {
    /// New history entry (navigation).
    Push(String),
    /// Current entry rewritten in place.
    Replace(String),
}

/// The view mounted in the page content area.
#[derive(Debug)]
pub enum PageView {
    Home(HomePage),
    CompanyDetail(CompanyDetailPage),
    NotFound(NotFound),
}

impl PageView {
    pub fn outer(&self) -> ElementId {
        match self {
            Self::Home(v) => v.outer(),
            Self::CompanyDetail(v) => v.outer(),
            Self::NotFound(v) => v.outer(),
        }
    }

    pub fn remove(&self, dom: &mut Dom) {
        match self {
            Self::Home(v) => v.dispose(dom),
            Self::CompanyDetail(v) => v.dispose(dom),
            Self::NotFound(v) => v.dispose(dom),
        }
    }
}

#[derive(Debug)]
pub struct Page {
    pub dom: Dom,
    contextual_menu: ElementId,
    content: ElementId,
    pub view: Option<PageView>,
    pub title: String,
    /// Wall-clock time of the last successful change flush.
    pub last_save: Option<DateTime<Utc>>,
    /// Where the submit overlay's close link leads while it is open.
    pub fader_state: Option<RouterState>,
    url: String,
    history: Vec<UrlChange>,
}

impl Page {
    /// Empty document: `body > nav.contextualMenu + main.content`.
    pub fn new() -> Self {
        let mut dom = Dom::new();
        let contextual_menu = dom.create("nav", Some(CONTEXTUAL_MENU));
        let content = dom.create("main", Some(CONTENT));
        dom.append_child(dom.root(), contextual_menu);
        dom.append_child(dom.root(), content);
        Self::with_parts(dom, contextual_menu, content)
    }

    /// Attach to a server-rendered document.
    pub fn from_dom(mut dom: Dom) -> Result<Self, HydrateError> {
        let root = dom.root();
        let contextual_menu = dom.assert_path(root, &[CONTEXTUAL_MENU])?;
        let content = dom.assert_path(root, &[CONTENT])?;
        dom.reset_created_count();
        Ok(Self::with_parts(dom, contextual_menu, content))
    }

    fn with_parts(dom: Dom, contextual_menu: ElementId, content: ElementId) -> Self {
        Self {
            dom,
            contextual_menu,
            content,
            view: None,
            title: String::new(),
            last_save: None,
            fader_state: None,
            url: "/".to_string(),
            history: Vec::new(),
        }
    }

    pub fn contextual_menu(&self) -> ElementId {
        self.contextual_menu
    }

    pub fn content(&self) -> ElementId {
        self.content
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn history(&self) -> &[UrlChange] {
        &self.history
    }

    /// Set the URL the document was loaded from. No history entry.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn push_state(&mut self, url: impl Into<String>) {
        let url = url.into();
        if url == self.url {
            return;
        }
        self.url = url.clone();
        self.history.push(UrlChange::Push(url));
    }

    /// Rewrite the current URL without a navigation.
    pub fn replace_state(&mut self, url: impl Into<String>) {
        let url = url.into();
        self.url = url.clone();
        self.history.push(UrlChange::Replace(url));
    }

    /// Remove the mounted view, if any.
    pub fn clear_view(&mut self) {
        if let Some(view) = self.view.take() {
            view.remove(&mut self.dom);
        }
    }

    pub fn home(&self) -> Option<&HomePage> {
        match &self.view {
            Some(PageView::Home(home)) => Some(home),
            _ => None,
        }
    }

    /// The document and the home view, borrowed together.
    pub fn home_parts(&mut self) -> Option<(&mut Dom, &mut HomePage)> {
        match &mut self.view {
            Some(PageView::Home(home)) => Some((&mut self.dom, home)),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&CompanyDetailPage> {
        match &self.view {
            Some(PageView::CompanyDetail(detail)) => Some(detail),
            _ => None,
        }
    }

    /// Full document markup.
    pub fn to_html(&self) -> String {
        self.dom.to_html(self.dom.root())
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to the page.
pub type PageHandle = Arc<Mutex<Page>>;

// ============================================================================
// Pending saves
// ============================================================================

/// Counts saves in flight so teardown can wait for them.
#[derive(Debug, Default)]
pub struct SaveTracker {
    pending: AtomicUsize,
    idle: Notify,
}

impl SaveTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark a save as started. The save ends when the guard is dropped.
    pub fn begin(self: &Arc<Self>) -> SaveGuard {
        let pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_pending_saves(pending);
        SaveGuard {
            tracker: Arc::clone(self),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Resolve once no save is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn end(&self) {
        let pending = self.pending.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::set_pending_saves(pending);
        if pending == 0 {
            self.idle.notify_waiters();
        }
    }
}

/// A save in flight; see [`SaveTracker::begin`].
#[derive(Debug)]
pub struct SaveGuard {
    tracker: Arc<SaveTracker>,
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.tracker.end();
    }
}
