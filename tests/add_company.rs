//! Integration tests for the "add company" gesture on the home page.

mod common;

use common::TestSite;
use dealport::router::{format_state_list, state_list, RouterState};
use dealport::view::{FieldEdit, Mountable};

fn submit_state() -> RouterState {
    state_list(&["page", "home", "submit"])
}

#[tokio::test]
async fn user_from_none_switches_to_edit_and_creates_a_record() {
    let site = TestSite::seeded();
    let mut visitor = site.manual_flush_visitor(TestSite::user());
    visitor.go("page/home/none").await;

    let navigated = visitor.navigator.select_state(submit_state()).await.unwrap();

    assert!(!navigated);
    assert_eq!(format_state_list(&visitor.state()), "page/home/edit");
    assert_eq!(visitor.url(), "/edit");
    assert_eq!(site.backend.records().len(), 4);
    assert_eq!(site.backend.open_contexts(), 4);

    let new_id = visitor.navigator.with_page(|page| {
        let home = page.home().expect("home view");
        assert_eq!(home.grid.items().len(), 4);
        assert!(home.grid.items().iter().all(|item| item.editing()));
        let added = home.grid.items().last().unwrap();
        assert_eq!(page.dom.scrolled_into_view(), Some(added.outer()));
        assert!(page.to_html().contains("[ stop editing ]"));
        added.id().clone()
    });
    assert_eq!(visitor.exceptions.len(), 0);

    // The new record's context is held, so its edits reach the store.
    assert!(visitor.navigator.edit_field(&new_id, FieldEdit::Name("Delta".into())));
    let report = visitor.navigator.flush_changes().await.unwrap();
    assert_eq!(report.submitted, vec![new_id.clone()]);
    assert_eq!(site.backend.record(&new_id).unwrap().str_field("name"), Some("Delta"));
}

#[tokio::test]
async fn user_in_edit_adds_without_navigating() {
    let site = TestSite::seeded();
    let mut visitor = site.visitor(TestSite::user());
    visitor.go("page/home/edit").await;
    let history_before = visitor.navigator.with_page(|page| page.history().len());

    let navigated = visitor.navigator.select_state(submit_state()).await.unwrap();

    assert!(!navigated);
    assert_eq!(format_state_list(&visitor.state()), "page/home/edit");
    assert_eq!(site.backend.records().len(), 4);
    visitor.navigator.with_page(|page| {
        assert_eq!(page.history().len(), history_before);
        assert_eq!(page.home().unwrap().grid.items().len(), 4);
    });
}

#[tokio::test]
async fn anonymous_visitor_gets_the_submit_form() {
    let site = TestSite::seeded();
    let mut visitor = site.visitor(None);
    visitor.go("page/home/none").await;

    let navigated = visitor.navigator.select_state(submit_state()).await.unwrap();

    assert!(navigated);
    assert_eq!(format_state_list(&visitor.state()), "page/home/submit");
    assert_eq!(visitor.url(), "/submit");
    assert_eq!(site.backend.records().len(), 3);
    visitor.navigator.with_page(|page| {
        let form = page.home().unwrap().submit_form.as_ref().expect("submit form");
        assert!(form.shows_submitter(&page.dom));
        assert_eq!(form.action(&page.dom), Some("/submit"));
        assert_eq!(page.fader_state, Some(state_list(&["page", "home", "none"])));
    });
}

#[tokio::test]
async fn other_anchors_navigate_normally() {
    let site = TestSite::seeded();
    let mut visitor = site.visitor(TestSite::user());
    visitor.go("page/home/none").await;

    let navigated = visitor
        .navigator
        .select_state(state_list(&["page", "home", "edit"]))
        .await
        .unwrap();

    assert!(navigated);
    assert_eq!(format_state_list(&visitor.state()), "page/home/edit");
    assert_eq!(site.backend.records().len(), 3);
}

#[tokio::test]
async fn failed_creation_is_reported() {
    let site = TestSite::seeded();
    let mut visitor = site.visitor(TestSite::user());
    visitor.go("page/home/none").await;
    visitor.resources.set_fail_create(true);

    let navigated = visitor.navigator.select_state(submit_state()).await.unwrap();

    assert!(!navigated);
    // Edit mode was entered before the creation failed.
    assert_eq!(format_state_list(&visitor.state()), "page/home/edit");
    assert_eq!(site.backend.records().len(), 3);
    let entries = visitor.exceptions.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].contains("record creation disabled"));
    assert_eq!(visitor.cx().saves.pending(), 0);
}
