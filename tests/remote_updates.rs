//! Integration tests for changes made by other sessions.

mod common;

use common::TestSite;
use dealport::page::UrlChange;
use dealport::router::format_state_list;
use dealport::view::FieldEdit;
use dealport_collab::{DocumentContext, DocumentStore, Operation, RecordId};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

/// Apply `ops` to record `id` from a separate session.
async fn remote_edit(site: &TestSite, id: &str, ops: Vec<Operation>) {
    let store = site.backend.connect();
    let context = store.open(&RecordId::from(id)).await.unwrap();
    context.submit_operations(ops).await.unwrap();
    context.close();
}

#[tokio::test]
async fn remote_change_updates_the_grid() {
    let site = TestSite::seeded();
    let mut visitor = site.visitor(None);
    visitor.go("page/home/none").await;

    remote_edit(&site, "c3", vec![Operation::replace_field("name", json!("Cobalt Blue"))]).await;
    let applied = timeout(Duration::from_secs(1), visitor.navigator.apply_next_remote_update())
        .await
        .unwrap();

    assert_eq!(applied, Some(RecordId::from("c3")));
    assert_eq!(visitor.grid_names(), vec!["Acme", "bolt labs", "Cobalt Blue"]);
}

#[tokio::test]
async fn remote_change_updates_the_company_page() {
    let site = TestSite::seeded();
    let mut visitor = site.visitor(None);
    visitor.go("page/@acme/none").await;

    remote_edit(&site, "c1", vec![Operation::replace_field("payoff", json!("Heavier anvils"))]).await;
    timeout(Duration::from_secs(1), visitor.navigator.apply_next_remote_update())
        .await
        .unwrap();

    visitor.navigator.with_page(|page| {
        assert_eq!(page.detail().unwrap().header().payoff(), "Heavier anvils");
    });
    assert_eq!(visitor.url(), "/acme");
}

#[tokio::test]
async fn renamed_company_rewrites_the_url_in_place() {
    let site = TestSite::seeded();
    let mut visitor = site.visitor(None);
    visitor.go("page/@acme/none").await;

    remote_edit(&site, "c1", vec![Operation::replace_field("namedEntityId", json!("acme-corp"))]).await;
    timeout(Duration::from_secs(1), visitor.navigator.apply_next_remote_update())
        .await
        .unwrap();

    assert_eq!(visitor.url(), "/acme-corp");
    assert_eq!(format_state_list(&visitor.state()), "page/@acme-corp/none");
    visitor.navigator.with_page(|page| {
        assert_eq!(page.history().last(), Some(&UrlChange::Replace("/acme-corp".into())));
        assert_eq!(page.detail().unwrap().header().title_href(&page.dom), Some("/acme-corp"));
    });

    // Navigating within the renamed page keeps working.
    visitor.go("page/home/none").await;
    assert_eq!(visitor.url(), "/");
}

#[tokio::test]
async fn changes_to_records_not_shown_are_ignored() {
    let site = TestSite::seeded();
    let mut visitor = site.visitor(None);
    visitor.go("page/@acme/none").await;

    remote_edit(&site, "c2", vec![Operation::replace_field("name", json!("Bolt"))]).await;
    let result = timeout(Duration::from_millis(100), visitor.navigator.apply_next_remote_update()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn own_changes_are_not_echoed() {
    let site = TestSite::seeded();
    let c1 = RecordId::from("c1");
    let mut visitor = site.manual_flush_visitor(TestSite::user());
    visitor.go("page/home/edit").await;

    visitor.navigator.edit_field(&c1, FieldEdit::Name("Mine".into()));
    visitor.navigator.flush_changes().await.unwrap();

    let result = timeout(Duration::from_millis(100), visitor.navigator.apply_next_remote_update()).await;
    assert!(result.is_err());
    assert_eq!(visitor.grid_names()[0], "Mine");
}

#[tokio::test]
async fn remote_value_does_not_count_as_a_local_edit() {
    let site = TestSite::seeded();
    let c2 = RecordId::from("c2");
    let mut visitor = site.manual_flush_visitor(TestSite::user());
    visitor.go("page/home/edit").await;

    remote_edit(&site, "c2", vec![Operation::replace_field("payoff", json!("Screws too"))]).await;
    timeout(Duration::from_secs(1), visitor.navigator.apply_next_remote_update())
        .await
        .unwrap();

    let report = visitor.navigator.flush_changes().await.unwrap();
    assert!(report.submitted.is_empty());
    assert_eq!(site.backend.accepted_operations(), 1);
    assert_eq!(site.backend.record(&c2).unwrap().str_field("payoff"), Some("Screws too"));
}

#[tokio::test]
async fn queued_updates_are_applied_with_other_work() {
    let site = TestSite::seeded();
    let mut visitor = site.visitor(None);
    visitor.go("page/home/none").await;

    remote_edit(&site, "c1", vec![Operation::replace_field("name", json!("Zulu"))]).await;
    // Let the listener task forward the change.
    tokio::time::sleep(Duration::from_millis(20)).await;
    visitor.navigator.apply_pending_remote_updates().await;

    assert!(visitor.grid_names().contains(&"Zulu".to_string()));
}
