//! dealport - company directory page
//!
//! Renders a router state on the "server", then hydrates the same markup on
//! a "client" session against an in-memory collaborative store.

use dealport::collab::ContextRegistry;
use dealport::config::Config;
use dealport::page::Page;
use dealport::resource::MemoryResources;
use dealport::router::{format_state_list, parse_state_list};
use dealport::{metrics, telemetry, AppContext, Navigator, User};
use dealport_collab::MemoryBackend;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_STATE: &str = "page/home/none";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config.toml".to_string());
    let target = parse_state_list(&args.next().unwrap_or_else(|| DEFAULT_STATE.to_string()));

    let config = if Path::new(&config_path).exists() {
        Config::load(&config_path).map_err(|e| {
            eprintln!("failed to load {config_path}: {e}");
            e
        })?
    } else {
        Config::default()
    };
    let config = Arc::new(config);

    telemetry::init_tracing(&config.logging);
    metrics::init();

    info!(
        site = %config.site.name,
        state = %format_state_list(&target),
        flush_interval_ms = config.editing.flush_interval_ms,
        "Starting dealport"
    );

    let backend = MemoryBackend::new();
    let user = Some(User::new("u1", "Demo User"));
    seed(&MemoryResources::new(Arc::clone(&backend), None));

    // Server render
    let html_dom = {
        let resources = MemoryResources::new(Arc::clone(&backend), user.clone());
        let registry = Arc::new(ContextRegistry::new(Arc::new(backend.connect())));
        let cx = AppContext::builder(resources.resources(), registry)
            .config(Arc::clone(&config))
            .user(user.clone())
            .server(true)
            .build();
        let mut navigator = Navigator::new(cx);
        navigator.navigate(&target).await.map_err(|e| {
            error!(error = %e, "server render failed");
            e
        })?;
        let (html, dom) = navigator.with_page(|page| (page.to_html(), page.dom.clone()));
        println!("{html}");
        navigator.teardown().await?;
        dom
    };

    // Client hydration of the same markup
    let resources = MemoryResources::new(Arc::clone(&backend), user.clone());
    let registry = Arc::new(ContextRegistry::new(Arc::new(backend.connect())));
    let cx = AppContext::builder(resources.resources(), registry)
        .config(Arc::clone(&config))
        .user(user)
        .page(Page::from_dom(html_dom)?)
        .build();
    let mut navigator = Navigator::hydrating(cx);
    navigator.navigate(&target).await?;

    let created = navigator.with_page(|page| page.dom.created_count());
    if created > 0 {
        warn!(created, "hydration created elements");
    } else {
        info!(url = %navigator.with_page(|page| page.url().to_string()), "hydrated without rebuilding");
    }

    navigator.teardown().await?;
    println!("{}", metrics::gather_metrics());
    Ok(())
}

fn company(name: &str, entity: &str, homepage: &str, payoff: &str) -> Map<String, Value> {
    let value = json!({
        "name": name,
        "namedEntityId": entity,
        "homepage": homepage,
        "payoff": payoff,
        "visible": true,
    });
    match value {
        Value::Object(fields) => fields,
        _ => Map::new(),
    }
}

fn seed(resources: &MemoryResources) {
    resources.seed_company("c1", company("Acme", "acme", "https://acme.example", "Anvils, delivered"));
    resources.seed_company("c2", company("bolt labs", "bolt", "https://bolt.example", "Fasteners"));
    resources.seed_company("c3", company("Cobalt", "cobalt", "https://cobalt.example", "Blue pigments"));
}
