//! Company detail page.

use crate::dom::{Dom, ElementId};
use crate::error::HydrateError;
use crate::resource::Company;
use crate::router::Router;
use crate::view::{
    assert_class, required_attr, ChangeStamp, ChangedValues, CompanyHeader, Disposable,
    EditableRecord, Hydratable, Mountable,
};
use dealport_collab::RecordId;
use serde_json::{Map, Value};

#[derive(Debug)]
pub struct CompanyDetailPage {
    outer: ElementId,
    id: RecordId,
    header: CompanyHeader,
}

impl CompanyDetailPage {
    pub fn create(dom: &mut Dom, router: &dyn Router, company: &Company) -> Self {
        let outer = dom.create("div", Some(Self::CLASS));
        dom.set_attr(outer, "data-id", company.id.as_str());
        let header = CompanyHeader::create(dom, router, company);
        header.mount(dom, outer);
        Self {
            outer,
            id: company.id.clone(),
            header,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn header(&self) -> &CompanyHeader {
        &self.header
    }

    pub fn title(&self) -> &str {
        self.header.name()
    }
}

impl EditableRecord for CompanyDetailPage {
    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn values_since(&self, since: ChangeStamp) -> Option<ChangedValues> {
        self.header.values_since(since)
    }

    fn set_values(&mut self, dom: &mut Dom, router: &dyn Router, values: &Map<String, Value>) {
        self.header.set_values(dom, router, &self.id, values);
    }
}

impl Mountable for CompanyDetailPage {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Disposable for CompanyDetailPage {}

impl Hydratable for CompanyDetailPage {
    const CLASS: &'static str = "CompanyDetailPage";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        let id = required_attr(dom, outer, Self::CLASS, "data-id")?;
        Ok(Self {
            outer,
            id: RecordId::new(id),
            header: CompanyHeader::hydrate_child(dom, outer)?,
        })
    }
}
