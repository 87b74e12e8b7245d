//! Company header and grid tile.

use crate::dom::{Dom, ElementId};
use crate::error::HydrateError;
use crate::resource::{Company, LogoFile};
use crate::router::{Router, StateSegment};
use crate::view::{
    assert_class, required_attr, ChangeStamp, ChangedValues, Disposable, EditableBooleanText,
    EditableImage, EditablePlainText, EditableRecord, Hydratable, Mountable,
};
use dealport_collab::RecordId;
use serde_json::{Map, Value};

/// A user edit on one field of a company view.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Name(String),
    Homepage(String),
    Payoff(String),
    Visible(bool),
    Logo(LogoFile),
}

impl FieldEdit {
    /// Record field the edit targets.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Homepage(_) => "homepage",
            Self::Payoff(_) => "payoff",
            Self::Visible(_) => "visible",
            Self::Logo(_) => "logoFile",
        }
    }
}

// ============================================================================
// CompanyHeader
// ============================================================================

/// Name, homepage, payoff and logo of a company.
#[derive(Debug, Clone)]
pub struct CompanyHeader {
    outer: ElementId,
    title_link: ElementId,
    name: EditablePlainText,
    homepage: EditablePlainText,
    payoff: EditablePlainText,
    logo: EditableImage,
}

impl CompanyHeader {
    pub fn create(dom: &mut Dom, router: &dyn Router, company: &Company) -> Self {
        let outer = dom.create("header", Some(Self::CLASS));

        let title_link = dom.create("a", Some("titleLink"));
        let name = EditablePlainText::create(dom, "h2", false, &company.name);
        dom.add_class(name.outer(), "name");
        name.mount(dom, title_link);

        let homepage = EditablePlainText::create(dom, "div", false, &company.homepage);
        dom.add_class(homepage.outer(), "homepage");
        let payoff = EditablePlainText::create(dom, "p", true, &company.payoff);
        dom.add_class(payoff.outer(), "payoff");
        let logo = EditableImage::create(dom, company.logo.as_deref());
        dom.add_class(logo.outer(), "logo");

        dom.append_child(outer, title_link);
        homepage.mount(dom, outer);
        payoff.mount(dom, outer);
        logo.mount(dom, outer);

        let this = Self {
            outer,
            title_link,
            name,
            homepage,
            payoff,
            logo,
        };
        this.set_link(dom, router, company.named_entity_id.as_deref().unwrap_or(company.id.as_str()));
        this
    }

    fn set_link(&self, dom: &mut Dom, router: &dyn Router, entity: &str) {
        let state = [StateSegment::name("page"), StateSegment::named_entity(entity)];
        dom.set_attr(self.title_link, "href", router.stringify(&state));
    }

    pub fn name(&self) -> &str {
        self.name.value()
    }

    pub fn homepage(&self) -> &str {
        self.homepage.value()
    }

    pub fn payoff(&self) -> &str {
        self.payoff.value()
    }

    pub fn logo(&self) -> &EditableImage {
        &self.logo
    }

    pub fn title_href<'a>(&self, dom: &'a Dom) -> Option<&'a str> {
        dom.attr(self.title_link, "href")
    }

    pub fn set_editing(&mut self, dom: &mut Dom, editing: bool) {
        self.name.set_editing(dom, editing);
        self.homepage.set_editing(dom, editing);
        self.payoff.set_editing(dom, editing);
        self.logo.set_editing(dom, editing);
    }

    /// Apply a user edit. Returns false for edits this view has no field for.
    pub fn apply_edit(&mut self, dom: &mut Dom, edit: FieldEdit) -> bool {
        match edit {
            FieldEdit::Name(v) => self.name.user_input(dom, &v),
            FieldEdit::Homepage(v) => self.homepage.user_input(dom, &v),
            FieldEdit::Payoff(v) => self.payoff.user_input(dom, &v),
            FieldEdit::Logo(file) => self.logo.user_select_file(dom, file),
            FieldEdit::Visible(_) => return false,
        };
        true
    }

    pub fn values_since(&self, since: ChangeStamp) -> Option<ChangedValues> {
        let mut values = ChangedValues::new();
        self.name.field().collect_since("name", since, &mut values);
        self.homepage.field().collect_since("homepage", since, &mut values);
        self.payoff.field().collect_since("payoff", since, &mut values);
        if let Some(file) = self.logo.file_since(since) {
            values.insert_file("logoFile", file.clone());
        }
        values.non_empty()
    }

    /// Apply store values; `router` is needed when the named entity changed.
    pub fn set_values(&mut self, dom: &mut Dom, router: &dyn Router, id: &RecordId, values: &Map<String, Value>) {
        if let Some(v) = values.get("name").and_then(Value::as_str) {
            self.name.set_value(dom, v);
        }
        if let Some(v) = values.get("homepage").and_then(Value::as_str) {
            self.homepage.set_value(dom, v);
        }
        if let Some(v) = values.get("payoff").and_then(Value::as_str) {
            self.payoff.set_value(dom, v);
        }
        if let Some(v) = values.get("logo") {
            self.logo.set_src(dom, v.as_str());
        }
        if let Some(v) = values.get("namedEntityId") {
            self.set_link(dom, router, v.as_str().unwrap_or(id.as_str()));
        }
    }
}

impl Mountable for CompanyHeader {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Hydratable for CompanyHeader {
    const CLASS: &'static str = "CompanyHeader";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        let title_link = dom.assert_path(outer, &["titleLink"])?;
        Ok(Self {
            outer,
            title_link,
            name: EditablePlainText::hydrate(dom, dom.assert_path(title_link, &["name"])?)?,
            homepage: EditablePlainText::hydrate(dom, dom.assert_path(outer, &["homepage"])?)?,
            payoff: EditablePlainText::hydrate(dom, dom.assert_path(outer, &["payoff"])?)?,
            logo: EditableImage::hydrate(dom, dom.assert_path(outer, &["logo"])?)?,
        })
    }
}

// ============================================================================
// CompanyGridItem
// ============================================================================

/// One company tile in the home page grid.
#[derive(Debug, Clone)]
pub struct CompanyGridItem {
    outer: ElementId,
    id: RecordId,
    header: CompanyHeader,
    visible: EditableBooleanText,
    editing: bool,
}

impl CompanyGridItem {
    pub fn create(dom: &mut Dom, router: &dyn Router, company: &Company) -> Self {
        let outer = dom.create("li", Some(Self::CLASS));
        dom.set_attr(outer, "data-id", company.id.as_str());

        let header = CompanyHeader::create(dom, router, company);
        let buttons = dom.create("div", Some("bottomButtons"));
        let visible = EditableBooleanText::create(dom, company.visible, "✗ hidden", "✓ visible");
        dom.add_class(visible.outer(), "visible");

        header.mount(dom, outer);
        dom.append_child(outer, buttons);
        visible.mount(dom, buttons);

        if company.editable_by_current_user {
            dom.add_class(outer, "canEdit");
        } else {
            dom.set_attr(visible.outer(), "style", "display: none");
        }

        Self {
            outer,
            id: company.id.clone(),
            header,
            visible,
            editing: false,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn header(&self) -> &CompanyHeader {
        &self.header
    }

    pub fn visible(&self) -> bool {
        self.visible.value()
    }

    pub fn can_edit(&self, dom: &Dom) -> bool {
        dom.has_class(self.outer, "canEdit")
    }

    pub fn editing(&self) -> bool {
        self.editing
    }

    pub fn set_editing(&mut self, dom: &mut Dom, editing: bool) {
        self.editing = editing;
        dom.toggle_class(self.outer, "editing", editing);
        self.header.set_editing(dom, editing);
        self.visible.set_editing(dom, editing);
    }

    pub fn apply_edit(&mut self, dom: &mut Dom, edit: FieldEdit) -> bool {
        match edit {
            FieldEdit::Visible(v) => {
                self.visible.user_set(dom, v);
                true
            }
            other => self.header.apply_edit(dom, other),
        }
    }
}

impl EditableRecord for CompanyGridItem {
    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn values_since(&self, since: ChangeStamp) -> Option<ChangedValues> {
        let mut values = self.header.values_since(since).unwrap_or_default();
        self.visible.field().collect_since("visible", since, &mut values);
        values.non_empty()
    }

    fn set_values(&mut self, dom: &mut Dom, router: &dyn Router, values: &Map<String, Value>) {
        if let Some(v) = values.get("visible").and_then(Value::as_bool) {
            self.visible.set_value(dom, v);
        }
        self.header.set_values(dom, router, &self.id, values);
    }
}

impl Mountable for CompanyGridItem {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Disposable for CompanyGridItem {}

impl Hydratable for CompanyGridItem {
    const CLASS: &'static str = "CompanyGridItem";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        let id = required_attr(dom, outer, Self::CLASS, "data-id")?;
        Ok(Self {
            outer,
            id: RecordId::new(id),
            header: CompanyHeader::hydrate_child(dom, outer)?,
            visible: EditableBooleanText::hydrate(dom, dom.assert_path(outer, &["bottomButtons", "visible"])?)?,
            editing: dom.has_class(outer, "editing"),
        })
    }
}
