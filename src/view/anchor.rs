//! Links that name a router state.

use crate::dom::{Dom, ElementId};
use crate::error::HydrateError;
use crate::router::{format_state_list, parse_state_list, Router, RouterState};
use crate::view::{assert_class, required_attr, Disposable, Hydratable, Mountable};

/// An `<a>` whose `href` is the URL of a router state.
///
/// Activating it is reported as a `StateSelect` event so controllers can
/// intercept the navigation.
#[derive(Debug, Clone)]
pub struct StateAnchor {
    outer: ElementId,
    state: RouterState,
}

impl StateAnchor {
    pub fn create(dom: &mut Dom, router: &dyn Router, state: RouterState, label: &str) -> Self {
        let outer = dom.create("a", Some(Self::CLASS));
        dom.set_attr(outer, "href", router.stringify(&state));
        dom.set_attr(outer, "data-state", format_state_list(&state));
        dom.set_text(outer, label);
        Self { outer, state }
    }

    /// Attach to the child of `parent` carrying `class` (e.g. `editAnchor`), if any.
    pub fn find_by_class(dom: &Dom, parent: ElementId, class: &str) -> Result<Option<Self>, HydrateError> {
        match dom.select_child(parent, class) {
            Some(outer) => Self::hydrate(dom, outer).map(Some),
            None => Ok(None),
        }
    }

    pub fn state(&self) -> &RouterState {
        &self.state
    }

    pub fn href<'a>(&self, dom: &'a Dom) -> Option<&'a str> {
        dom.attr(self.outer, "href")
    }
}

impl Mountable for StateAnchor {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Disposable for StateAnchor {}

impl Hydratable for StateAnchor {
    const CLASS: &'static str = "StateAnchor";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        let state = required_attr(dom, outer, Self::CLASS, "data-state")?;
        Ok(Self {
            outer,
            state: parse_state_list(&state),
        })
    }
}
