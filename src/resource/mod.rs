//! Resource services consumed by the controllers.
//!
//! Each service is an async trait so the page can run against the in-memory
//! implementations in [`memory`] or against a remote backend.

pub mod memory;

pub use memory::MemoryResources;

use crate::collab::Acquisition;
use crate::context::User;
use crate::error::ResourceError;
use async_trait::async_trait;
use dealport_collab::{RecordId, RecordSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A company as rendered by the views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    pub id: RecordId,
    pub name: String,
    pub homepage: String,
    pub payoff: String,
    pub logo: Option<String>,
    pub visible: bool,
    /// Name used in the company's URL; the record id is used when unset.
    pub named_entity_id: Option<String>,
    pub editable_by_current_user: bool,
}

impl Company {
    pub fn from_snapshot(snapshot: &RecordSnapshot, user: Option<&User>) -> Self {
        let text = |key| snapshot.str_field(key).unwrap_or_default().to_string();
        Self {
            id: snapshot.id.clone(),
            name: text("name"),
            homepage: text("homepage"),
            payoff: text("payoff"),
            logo: snapshot.str_field("logo").map(str::to_string),
            visible: snapshot.bool_field("visible").unwrap_or(false),
            named_entity_id: snapshot.str_field("namedEntityId").map(str::to_string),
            editable_by_current_user: user.is_some(),
        }
    }

    /// Field set of a freshly created record.
    pub fn empty_fields() -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".into(), Value::String(String::new()));
        fields.insert("homepage".into(), Value::String(String::new()));
        fields.insert("payoff".into(), Value::String(String::new()));
        fields.insert("visible".into(), Value::Bool(false));
        fields
    }
}

/// Sort by name, ignoring case. Stable, so equal names keep their order.
pub fn sort_by_name(companies: &mut [Company]) {
    companies.sort_by_cached_key(|c| c.name.to_lowercase());
}

/// Resolution of a human-readable URL name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub name: String,
    pub company: Option<RecordId>,
    pub user: Option<String>,
}

/// Data posted by the public submission form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitFormData {
    pub name: String,
    pub homepage: String,
    pub email: String,
    pub submitter_name: String,
}

/// An image file picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait CompanyResource: Send + Sync {
    /// Every company, unordered.
    async fn all(&self) -> Result<Vec<Company>, ResourceError>;

    /// The companies among `ids` that exist, in `ids` order.
    async fn by_ids(&self, ids: &[RecordId]) -> Result<Vec<Company>, ResourceError>;

    /// Create an empty company record and add its context to `acquisition`.
    async fn new_empty_record(&self, acquisition: &Acquisition) -> Result<Company, ResourceError>;
}

#[async_trait]
pub trait NamedEntityResource: Send + Sync {
    async fn by_name(&self, name: &str) -> Result<Option<NamedEntity>, ResourceError>;
}

#[async_trait]
pub trait CompanySubmitResource: Send + Sync {
    async fn submit(&self, data: SubmitFormData) -> Result<(), ResourceError>;
}

#[async_trait]
pub trait UploadedImageResource: Send + Sync {
    /// Store `file` as the logo of company `id`, returning its URL.
    async fn update_company_logo(&self, id: &RecordId, file: LogoFile) -> Result<String, ResourceError>;
}

/// The service handles available to controllers.
#[derive(Clone)]
pub struct Resources {
    pub company: Arc<dyn CompanyResource>,
    pub named_entity: Arc<dyn NamedEntityResource>,
    pub company_submit: Arc<dyn CompanySubmitResource>,
    pub uploaded_image: Arc<dyn UploadedImageResource>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(id: &str, name: &str) -> Company {
        Company {
            id: RecordId::from(id),
            name: name.into(),
            homepage: String::new(),
            payoff: String::new(),
            logo: None,
            visible: true,
            named_entity_id: None,
            editable_by_current_user: false,
        }
    }

    #[test]
    fn sort_ignores_case() {
        let mut companies = vec![named("1", "Bravo"), named("2", "alpha"), named("3", "Charlie")];
        sort_by_name(&mut companies);
        let names: Vec<_> = companies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Bravo", "Charlie"]);
    }

    #[test]
    fn sort_is_stable() {
        let mut companies = vec![named("1", "acme"), named("2", "ACME"), named("3", "Acme")];
        sort_by_name(&mut companies);
        let ids: Vec<_> = companies.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn from_snapshot_fills_defaults() {
        let fields = json!({"name": "Acme", "namedEntityId": "acme"});
        let snapshot = RecordSnapshot::new(RecordId::from("c1"), fields.as_object().unwrap().clone());
        let user = User::new("u1", "Jane");
        let company = Company::from_snapshot(&snapshot, Some(&user));
        assert_eq!(company.name, "Acme");
        assert_eq!(company.homepage, "");
        assert!(!company.visible);
        assert_eq!(company.named_entity_id.as_deref(), Some("acme"));
        assert!(company.editable_by_current_user);
        assert!(!Company::from_snapshot(&snapshot, None).editable_by_current_user);
    }
}
