//! Application context shared by the controller tree.
//!
//! Everything a controller needs from its surroundings is handed over at
//! construction in one [`AppContext`]; nothing is looked up globally.

use crate::collab::ContextRegistry;
use crate::config::Config;
use crate::page::{Page, PageHandle, SaveTracker};
use crate::resource::{Resources, SubmitFormData};
use crate::router::{PathRouter, Router};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use tracing::error;

/// The logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Where non-fatal failures are reported.
pub trait ExceptionSink: Send + Sync {
    fn log_exception(&self, error: &(dyn Error + 'static));
}

/// Reports exceptions as `error` events, including the source chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExceptionSink;

impl ExceptionSink for TracingExceptionSink {
    fn log_exception(&self, err: &(dyn Error + 'static)) {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        error!(error = %err, causes = ?chain, "exception");
    }
}

/// Immutable handles passed to every controller.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub router: Arc<dyn Router>,
    pub resources: Resources,
    pub registry: Arc<ContextRegistry>,
    pub page: PageHandle,
    pub saves: Arc<SaveTracker>,
    pub exceptions: Arc<dyn ExceptionSink>,
    pub user: Option<User>,
    /// Rendering on the server: read through resources, no live contexts.
    pub server: bool,
    pub csrf_token: Option<String>,
    /// The request carried a valid anti-forgery token.
    pub csrf_valid: bool,
    /// Form data posted with the request, if any.
    pub post_data: Option<SubmitFormData>,
}

impl AppContext {
    pub fn builder(resources: Resources, registry: Arc<ContextRegistry>) -> AppContextBuilder {
        AppContextBuilder {
            config: Arc::new(Config::default()),
            router: Arc::new(PathRouter),
            resources,
            registry,
            page: None,
            exceptions: Arc::new(TracingExceptionSink),
            user: None,
            server: false,
            csrf_token: None,
            csrf_valid: false,
            post_data: None,
        }
    }

    pub fn site_title(&self, view_title: &str) -> String {
        format!("{} :: {}", view_title, self.config.site.name)
    }
}

pub struct AppContextBuilder {
    config: Arc<Config>,
    router: Arc<dyn Router>,
    resources: Resources,
    registry: Arc<ContextRegistry>,
    page: Option<Page>,
    exceptions: Arc<dyn ExceptionSink>,
    user: Option<User>,
    server: bool,
    csrf_token: Option<String>,
    csrf_valid: bool,
    post_data: Option<SubmitFormData>,
}

impl AppContextBuilder {
    pub fn config(mut self, config: Arc<Config>) -> Self {
        self.config = config;
        self
    }

    pub fn router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = router;
        self
    }

    /// Start from an existing (e.g. server-rendered) page instead of an empty one.
    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn exceptions(mut self, sink: Arc<dyn ExceptionSink>) -> Self {
        self.exceptions = sink;
        self
    }

    pub fn user(mut self, user: Option<User>) -> Self {
        self.user = user;
        self
    }

    pub fn server(mut self, server: bool) -> Self {
        self.server = server;
        self
    }

    pub fn csrf(mut self, token: Option<String>, valid: bool) -> Self {
        self.csrf_token = token;
        self.csrf_valid = valid;
        self
    }

    pub fn post_data(mut self, data: Option<SubmitFormData>) -> Self {
        self.post_data = data;
        self
    }

    pub fn build(self) -> AppContext {
        AppContext {
            config: self.config,
            router: self.router,
            resources: self.resources,
            registry: self.registry,
            page: Arc::new(Mutex::new(self.page.unwrap_or_default())),
            saves: SaveTracker::new(),
            exceptions: self.exceptions,
            user: self.user,
            server: self.server,
            csrf_token: self.csrf_token,
            csrf_valid: self.csrf_valid,
            post_data: self.post_data,
        }
    }
}
