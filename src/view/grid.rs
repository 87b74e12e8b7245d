//! The company grid on the home page.

use crate::dom::{Dom, ElementId};
use crate::error::HydrateError;
use crate::event::{dispatch, EditableChange, Event, EventChannel};
use crate::resource::Company;
use crate::router::{state_list, Router};
use crate::view::{
    assert_class, CompanyGridItem, Disposable, FieldEdit, Hydratable, Mountable, StateAnchor,
};
use dealport_collab::RecordId;

/// A list of [`CompanyGridItem`]s followed by an optional "add company" tile.
#[derive(Debug)]
pub struct CompanyGrid {
    outer: ElementId,
    items: Vec<CompanyGridItem>,
    placeholder: Option<ElementId>,
    editing: bool,
    /// Fires when the user changes a field of any item.
    pub editable_change: EventChannel<EditableChange>,
}

impl CompanyGrid {
    pub fn create(dom: &mut Dom) -> Self {
        Self {
            outer: dom.create("ul", Some(Self::CLASS)),
            items: Vec::new(),
            placeholder: None,
            editing: false,
            editable_change: EventChannel::new(),
        }
    }

    /// Render `company` as a new item, before the placeholder tile if present.
    pub fn add_company(&mut self, dom: &mut Dom, router: &dyn Router, company: &Company) -> &mut CompanyGridItem {
        let item = CompanyGridItem::create(dom, router, company);
        match self.placeholder {
            Some(placeholder) => dom.insert_before(self.outer, item.outer(), placeholder),
            None => item.mount(dom, self.outer),
        }
        let index = self.items.len();
        self.items.push(item);
        &mut self.items[index]
    }

    /// Append the "add your company" tile, linking to the submit state.
    pub fn add_placeholder(&mut self, dom: &mut Dom, router: &dyn Router) {
        if self.placeholder.is_some() {
            return;
        }
        let tile = dom.create("li", Some("placeholder"));
        let anchor = StateAnchor::create(dom, router, state_list(&["page", "home", "submit"]), "+ add your company");
        anchor.mount(dom, tile);
        dom.append_child(self.outer, tile);
        self.placeholder = Some(tile);
    }

    pub fn items(&self) -> &[CompanyGridItem] {
        &self.items
    }

    pub fn item(&self, id: &RecordId) -> Option<&CompanyGridItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn item_mut(&mut self, id: &RecordId) -> Option<&mut CompanyGridItem> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    /// Displayed company names, in grid order.
    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.header().name()).collect()
    }

    pub fn editing(&self) -> bool {
        self.editing
    }

    /// Toggle edit mode on the grid and on every item.
    pub fn set_editing(&mut self, dom: &mut Dom, editing: bool) {
        self.editing = editing;
        dom.toggle_class(self.outer, "editing", editing);
        for item in &mut self.items {
            item.set_editing(dom, editing);
        }
    }

    /// Apply a user edit to item `id` and announce it on [`CompanyGrid::editable_change`].
    ///
    /// Returns false if there is no such item or it has no matching field.
    pub fn user_edit(&mut self, dom: &mut Dom, id: &RecordId, edit: FieldEdit) -> bool {
        let field = edit.field();
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        if !item.apply_edit(dom, edit) {
            return false;
        }
        let mut event = Event::new(EditableChange {
            item: id.clone(),
            field,
        });
        dispatch(&mut event, &[&self.editable_change]);
        true
    }
}

impl Mountable for CompanyGrid {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Disposable for CompanyGrid {}

impl Hydratable for CompanyGrid {
    const CLASS: &'static str = "CompanyGrid";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        let items = dom
            .select_children(outer, CompanyGridItem::CLASS)
            .into_iter()
            .map(|el| CompanyGridItem::hydrate(dom, el))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            outer,
            items,
            placeholder: dom.select_child(outer, "placeholder"),
            editing: dom.has_class(outer, "editing"),
            editable_change: EventChannel::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::PathRouter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn company(id: &str, name: &str) -> Company {
        Company {
            id: RecordId::from(id),
            name: name.into(),
            homepage: String::new(),
            payoff: String::new(),
            logo: None,
            visible: true,
            named_entity_id: None,
            editable_by_current_user: true,
        }
    }

    #[test]
    fn companies_are_inserted_before_placeholder() {
        let mut dom = Dom::new();
        let mut grid = CompanyGrid::create(&mut dom);
        grid.add_company(&mut dom, &PathRouter, &company("a", "Alpha"));
        grid.add_placeholder(&mut dom, &PathRouter);
        let added = grid.add_company(&mut dom, &PathRouter, &company("b", "Bravo")).outer();

        let children = dom.children(grid.outer()).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(children[1], added);
        assert!(dom.has_class(children[2], "placeholder"));
        assert_eq!(grid.names(), vec!["Alpha", "Bravo"]);
    }

    #[test]
    fn user_edit_emits_editable_change() {
        let mut dom = Dom::new();
        let mut grid = CompanyGrid::create(&mut dom);
        grid.add_company(&mut dom, &PathRouter, &company("a", "Alpha"));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        grid.editable_change.on(move |event| {
            assert_eq!(event.detail.field, "name");
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert!(grid.user_edit(&mut dom, &RecordId::from("a"), FieldEdit::Name("A".into())));
        assert!(!grid.user_edit(&mut dom, &RecordId::from("zzz"), FieldEdit::Name("A".into())));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_editing_reaches_every_item_and_hydrates_back() {
        let mut dom = Dom::new();
        let mut grid = CompanyGrid::create(&mut dom);
        grid.add_company(&mut dom, &PathRouter, &company("a", "Alpha"));
        grid.add_company(&mut dom, &PathRouter, &company("b", "Bravo"));
        grid.add_placeholder(&mut dom, &PathRouter);
        grid.set_editing(&mut dom, true);
        assert!(grid.items().iter().all(CompanyGridItem::editing));

        let hydrated = CompanyGrid::hydrate(&dom, grid.outer()).unwrap();
        assert!(hydrated.editing());
        assert_eq!(hydrated.names(), vec!["Alpha", "Bravo"]);
        assert!(hydrated.item(&RecordId::from("b")).is_some());
    }
}
