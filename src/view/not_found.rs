use crate::dom::{Dom, ElementId};
use crate::error::HydrateError;
use crate::view::{assert_class, Disposable, Hydratable, Mountable};

/// Placeholder shown when a named entity cannot be resolved.
#[derive(Debug, Clone)]
pub struct NotFound {
    outer: ElementId,
}

impl NotFound {
    pub const MESSAGE: &'static str = "Route not found";

    pub fn create(dom: &mut Dom) -> Self {
        let outer = dom.create("p", Some(Self::CLASS));
        dom.set_text(outer, Self::MESSAGE);
        Self { outer }
    }
}

impl Mountable for NotFound {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Disposable for NotFound {}

impl Hydratable for NotFound {
    const CLASS: &'static str = "notFound";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        Ok(Self { outer })
    }
}
