//! Page views and their capabilities.
//!
//! Views are plain structs holding [`ElementId`] handles into the page
//! [`Dom`]. Each one can be built fresh (`create`) or attached to existing
//! markup (`hydrate`); the capability traits below describe what a view can
//! do instead of a shared base type.

pub mod anchor;
pub mod company;
pub mod detail;
pub mod editable;
pub mod grid;
pub mod home;
pub mod not_found;
pub mod submit_form;

pub use anchor::StateAnchor;
pub use company::{CompanyGridItem, CompanyHeader, FieldEdit};
pub use detail::CompanyDetailPage;
pub use editable::{
    ChangeStamp, ChangedValues, EditableBooleanText, EditableField, EditableImage,
    EditablePlainText, FieldChange, FieldValue,
};
pub use grid::CompanyGrid;
pub use home::HomePage;
pub use not_found::NotFound;
pub use submit_form::SubmitForm;

use crate::dom::{Dom, ElementId};
use crate::error::HydrateError;
use crate::router::Router;
use dealport_collab::RecordId;
use serde_json::{Map, Value};

/// A view with one outer element that can be attached to a parent.
pub trait Mountable {
    fn outer(&self) -> ElementId;

    fn mount(&self, dom: &mut Dom, parent: ElementId) {
        dom.append_child(parent, self.outer());
    }
}

/// A view that can attach to markup already present in the document.
pub trait Hydratable: Sized {
    /// Class identifying the view's outer element.
    const CLASS: &'static str;

    /// Attach to `outer`, which must carry [`Hydratable::CLASS`].
    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError>;

    /// Attach to the `> .CLASS` child of `parent`, which must exist.
    fn hydrate_child(dom: &Dom, parent: ElementId) -> Result<Self, HydrateError> {
        let outer = dom.assert_path(parent, &[Self::CLASS])?;
        Self::hydrate(dom, outer)
    }

    /// Attach to the `> .CLASS` child of `parent` if there is one.
    fn find_child(dom: &Dom, parent: ElementId) -> Result<Option<Self>, HydrateError> {
        match dom.select_child(parent, Self::CLASS) {
            Some(outer) => Self::hydrate(dom, outer).map(Some),
            None => Ok(None),
        }
    }
}

/// A view that can remove itself from the document.
pub trait Disposable: Mountable {
    fn dispose(&self, dom: &mut Dom) {
        dom.remove_node(self.outer());
    }
}

/// A rendered record whose fields can be edited by the user.
pub trait EditableRecord {
    fn record_id(&self) -> &RecordId;

    /// Fields changed by the user at or after `since`; `None` when nothing changed.
    fn values_since(&self, since: ChangeStamp) -> Option<ChangedValues>;

    /// Apply field values pushed by the store. Never marks fields as user-changed.
    fn set_values(&mut self, dom: &mut Dom, router: &dyn Router, values: &Map<String, Value>);
}

pub(crate) fn assert_class(dom: &Dom, outer: ElementId, class: &'static str) -> Result<(), HydrateError> {
    if dom.has_class(outer, class) {
        Ok(())
    } else {
        Err(HydrateError::WrongComponent { expected: class })
    }
}

pub(crate) fn required_attr(
    dom: &Dom,
    outer: ElementId,
    class: &'static str,
    attribute: &'static str,
) -> Result<String, HydrateError> {
    dom.attr(outer, attribute)
        .map(str::to_string)
        .ok_or(HydrateError::MissingAttribute { class, attribute })
}
