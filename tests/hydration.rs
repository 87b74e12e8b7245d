//! Integration tests for attaching a client session to server-rendered markup.

mod common;

use common::TestSite;
use dealport::page::PageView;
use dealport::router::format_state_list;

#[tokio::test]
async fn home_hydrates_without_creating_elements() {
    let site = TestSite::seeded();
    let page = site.server_render(TestSite::user(), "page/home/none").await;
    let html = page.to_html();

    let mut client = site.hydrating(TestSite::user(), page);
    client.go("page/home/none").await;

    client.navigator.with_page(|page| {
        assert_eq!(page.dom.created_count(), 0);
        assert_eq!(page.to_html(), html);
        assert_eq!(page.url(), "/");
        assert!(page.history().is_empty());
    });
    assert_eq!(client.grid_names(), vec!["Acme", "bolt labs", "Cobalt"]);
    // Contexts are acquired even though nothing was rendered.
    assert_eq!(site.backend.open_contexts(), 3);
}

#[tokio::test]
async fn company_page_hydrates_and_acquires_its_record() {
    let site = TestSite::seeded();
    let page = site.server_render(None, "page/@cobalt/none").await;

    let mut client = site.hydrating(None, page);
    client.go("page/@cobalt/none").await;

    client.navigator.with_page(|page| {
        assert_eq!(page.dom.created_count(), 0);
        assert_eq!(page.detail().map(|d| d.id().as_str()), Some("c3"));
    });
    assert_eq!(format_state_list(&client.state()), "page/@cobalt/none");
    assert_eq!(site.backend.open_contexts(), 1);
}

#[tokio::test]
async fn not_found_hydrates_without_contexts() {
    let site = TestSite::seeded();
    let page = site.server_render(None, "page/@nobody/none").await;

    let mut client = site.hydrating(None, page);
    client.go("page/@nobody/none").await;

    client.navigator.with_page(|page| {
        assert!(matches!(page.view, Some(PageView::NotFound(_))));
        assert_eq!(page.dom.created_count(), 0);
    });
    assert_eq!(site.backend.open_contexts(), 0);
}

#[tokio::test]
async fn only_the_first_navigation_is_an_upgrade() {
    let site = TestSite::seeded();
    let page = site.server_render(TestSite::user(), "page/home/none").await;

    let mut client = site.hydrating(TestSite::user(), page);
    client.go("page/home/none").await;
    client.go("page/home/edit").await;

    client.navigator.with_page(|page| {
        // The "stop editing" anchor was built, not hydrated.
        assert!(page.dom.created_count() > 0);
        assert!(page.home().is_some_and(|home| home.grid.items().iter().all(|item| item.editing())));
    });
    assert_eq!(client.url(), "/edit");
}

#[tokio::test]
async fn mismatched_markup_fails_the_upgrade() {
    let site = TestSite::seeded();
    let page = site.server_render(None, "page/@acme/none").await;

    let mut client = site.hydrating(None, page);
    let result = client
        .navigator
        .navigate(&dealport::router::parse_state_list("page/home/none"))
        .await;
    assert!(result.is_err());
    assert_eq!(format_state_list(&client.state()), "page");
}
