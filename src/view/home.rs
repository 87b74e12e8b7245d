//! The home page view.

use crate::dom::{Dom, ElementId};
use crate::error::HydrateError;
use crate::event::{EventChannel, StateSelect};
use crate::view::{assert_class, CompanyGrid, Disposable, Hydratable, Mountable, SubmitForm};

/// Company grid plus, in the submit state, the public submission form.
#[derive(Debug)]
pub struct HomePage {
    outer: ElementId,
    pub grid: CompanyGrid,
    pub submit_form: Option<SubmitForm>,
    /// In-page navigation gestures (anchor activation) inside the page.
    pub state_select: EventChannel<StateSelect>,
}

impl HomePage {
    pub const TITLE: &'static str = "Companies";

    pub fn create(dom: &mut Dom) -> Self {
        let outer = dom.create("div", Some(Self::CLASS));
        let grid = CompanyGrid::create(dom);
        grid.mount(dom, outer);
        Self {
            outer,
            grid,
            submit_form: None,
            state_select: EventChannel::new(),
        }
    }

    pub fn title(&self) -> &'static str {
        Self::TITLE
    }
}

impl Mountable for HomePage {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Disposable for HomePage {}

impl Hydratable for HomePage {
    const CLASS: &'static str = "HomePage";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        Ok(Self {
            outer,
            grid: CompanyGrid::hydrate_child(dom, outer)?,
            submit_form: None,
            state_select: EventChannel::new(),
        })
    }
}
