//! Test site: one shared backend, any number of visitor sessions.

#![allow(dead_code)]

use dealport::collab::ContextRegistry;
use dealport::config::Config;
use dealport::context::AppContextBuilder;
use dealport::page::Page;
use dealport::resource::MemoryResources;
use dealport::router::{parse_state_list, RouterState};
use dealport::{AppContext, ExceptionSink, Navigator, User};
use dealport_collab::{MemoryBackend, RecordId};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::error::Error;
use std::sync::Arc;

/// Field map of a visible company.
pub fn company(name: &str, entity: &str) -> Map<String, Value> {
    let value = json!({
        "name": name,
        "namedEntityId": entity,
        "homepage": format!("https://{entity}.example"),
        "payoff": format!("{name} payoff"),
        "visible": true,
    });
    match value {
        Value::Object(fields) => fields,
        _ => unreachable!(),
    }
}

/// Collects reported exceptions as strings.
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl ExceptionSink for RecordingSink {
    fn log_exception(&self, error: &(dyn Error + 'static)) {
        self.entries.lock().push(error.to_string());
    }
}

/// A browser session on the test site.
pub struct Visitor {
    pub navigator: Navigator,
    pub resources: Arc<MemoryResources>,
    pub exceptions: Arc<RecordingSink>,
}

impl Visitor {
    pub fn cx(&self) -> &AppContext {
        self.navigator.context()
    }

    pub async fn go(&mut self, state: &str) {
        let target = parse_state_list(state);
        self.navigator
            .navigate(&target)
            .await
            .unwrap_or_else(|e| panic!("navigate to {state} failed: {e}"));
    }

    pub fn state(&self) -> RouterState {
        self.navigator.current_state()
    }

    pub fn url(&self) -> String {
        self.navigator.with_page(|page| page.url().to_string())
    }

    /// Names on the home grid, in display order.
    pub fn grid_names(&self) -> Vec<String> {
        self.navigator.with_page(|page| {
            page.home()
                .map(|home| home.grid.names().into_iter().map(str::to_string).collect())
                .unwrap_or_default()
        })
    }
}

pub struct TestSite {
    pub backend: Arc<MemoryBackend>,
}

impl TestSite {
    pub fn new() -> Self {
        Self {
            backend: MemoryBackend::new(),
        }
    }

    /// Site with `Acme`, `bolt labs` and `Cobalt` (ids `c1` to `c3`).
    pub fn seeded() -> Self {
        let site = Self::new();
        site.seed("c1", "Acme", "acme");
        site.seed("c2", "bolt labs", "bolt");
        site.seed("c3", "Cobalt", "cobalt");
        site
    }

    pub fn seed(&self, id: &str, name: &str, entity: &str) -> RecordId {
        MemoryResources::new(Arc::clone(&self.backend), None).seed_company(id, company(name, entity))
    }

    pub fn user() -> Option<User> {
        Some(User::new("u1", "Tester"))
    }

    /// Context builder for a new session plus the services behind it.
    pub fn builder(&self, user: Option<User>) -> (AppContextBuilder, Arc<MemoryResources>, Arc<RecordingSink>) {
        let resources = MemoryResources::new(Arc::clone(&self.backend), user.clone());
        let registry = Arc::new(ContextRegistry::new(Arc::new(self.backend.connect())));
        let exceptions = Arc::new(RecordingSink::default());
        let builder = AppContext::builder(resources.resources(), registry)
            .user(user)
            .exceptions(Arc::clone(&exceptions) as Arc<dyn ExceptionSink>);
        (builder, resources, exceptions)
    }

    pub fn visitor(&self, user: Option<User>) -> Visitor {
        let (builder, resources, exceptions) = self.builder(user);
        Visitor {
            navigator: Navigator::new(builder.build()),
            resources,
            exceptions,
        }
    }

    /// A session built from a customised context.
    pub fn visitor_with(
        &self,
        user: Option<User>,
        customise: impl FnOnce(AppContextBuilder) -> AppContextBuilder,
    ) -> Visitor {
        let (builder, resources, exceptions) = self.builder(user);
        Visitor {
            navigator: Navigator::new(customise(builder).build()),
            resources,
            exceptions,
        }
    }

    /// A session whose debouncer never fires on its own; flush explicitly.
    pub fn manual_flush_visitor(&self, user: Option<User>) -> Visitor {
        let config = Config::from_toml_str("[editing]\nflush_interval_ms = 3600000\nflush_immediate = false\n")
            .expect("valid test config");
        self.visitor_with(user, |builder| builder.config(Arc::new(config)))
    }

    /// Render `state` the way the server does and return the document.
    pub async fn server_render(&self, user: Option<User>, state: &str) -> Page {
        let mut visitor = self.visitor_with(user, |builder| builder.server(true));
        visitor.go(state).await;
        let dom = visitor.navigator.with_page(|page| page.dom.clone());
        Page::from_dom(dom).expect("server markup has the page layout")
    }

    /// A client session attaching to server-rendered `page`.
    pub fn hydrating(&self, user: Option<User>, page: Page) -> Visitor {
        let (builder, resources, exceptions) = self.builder(user);
        Visitor {
            navigator: Navigator::hydrating(builder.page(page).build()),
            resources,
            exceptions,
        }
    }
}
