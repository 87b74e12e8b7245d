//! In-memory resource services over a [`MemoryBackend`].

use super::{
    Company, CompanyResource, CompanySubmitResource, LogoFile, NamedEntity, NamedEntityResource,
    Resources, SubmitFormData, UploadedImageResource,
};
use crate::collab::Acquisition;
use crate::context::User;
use crate::error::ResourceError;
use async_trait::async_trait;
use dashmap::DashMap;
use dealport_collab::{MemoryBackend, RecordId, RecordSnapshot};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Resource services for one visitor, backed by a shared [`MemoryBackend`].
pub struct MemoryResources {
    backend: Arc<MemoryBackend>,
    user: Option<User>,
    names: DashMap<String, NamedEntity>,
    submissions: Mutex<Vec<SubmitFormData>>,
    logos: Mutex<Vec<(RecordId, LogoFile)>>,
    fail_submissions: AtomicBool,
    fail_uploads: AtomicBool,
    fail_create: AtomicBool,
}

impl MemoryResources {
    pub fn new(backend: Arc<MemoryBackend>, user: Option<User>) -> Arc<Self> {
        let names = DashMap::new();
        for snapshot in backend.records() {
            if let Some(name) = snapshot.str_field("namedEntityId") {
                names.insert(name.to_string(), company_name(name, &snapshot.id));
            }
        }
        Arc::new(Self {
            backend,
            user,
            names,
            submissions: Mutex::new(Vec::new()),
            logos: Mutex::new(Vec::new()),
            fail_submissions: AtomicBool::new(false),
            fail_uploads: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
        })
    }

    /// Service handles backed by this instance.
    pub fn resources(self: &Arc<Self>) -> Resources {
        Resources {
            company: Arc::clone(self) as _,
            named_entity: Arc::clone(self) as _,
            company_submit: Arc::clone(self) as _,
            uploaded_image: Arc::clone(self) as _,
        }
    }

    pub fn backend(&self) -> &Arc<MemoryBackend> {
        &self.backend
    }

    /// Insert a company record, registering its `namedEntityId` if set.
    pub fn seed_company(&self, id: impl Into<RecordId>, fields: Map<String, Value>) -> RecordId {
        let id = id.into();
        let snapshot = RecordSnapshot::new(id.clone(), fields);
        if let Some(name) = snapshot.str_field("namedEntityId") {
            self.names.insert(name.to_string(), company_name(name, &id));
        }
        self.backend.insert(snapshot);
        id
    }

    /// Register a name without touching records (may dangle).
    pub fn register_name(&self, entity: NamedEntity) {
        self.names.insert(entity.name.clone(), entity);
    }

    pub fn submissions(&self) -> Vec<SubmitFormData> {
        self.submissions.lock().clone()
    }

    pub fn uploaded_logos(&self) -> Vec<(RecordId, LogoFile)> {
        self.logos.lock().clone()
    }

    pub fn set_fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    fn company(&self, snapshot: &RecordSnapshot) -> Company {
        Company::from_snapshot(snapshot, self.user.as_ref())
    }
}

fn company_name(name: &str, id: &RecordId) -> NamedEntity {
    NamedEntity {
        name: name.to_string(),
        company: Some(id.clone()),
        user: None,
    }
}

#[async_trait]
impl CompanyResource for MemoryResources {
    async fn all(&self) -> Result<Vec<Company>, ResourceError> {
        Ok(self.backend.records().iter().map(|s| self.company(s)).collect())
    }

    async fn by_ids(&self, ids: &[RecordId]) -> Result<Vec<Company>, ResourceError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.backend.record(id))
            .map(|s| self.company(&s))
            .collect())
    }

    async fn new_empty_record(&self, acquisition: &Acquisition) -> Result<Company, ResourceError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ResourceError::Rejected("record creation disabled".to_string()));
        }
        let context = acquisition.registry().store().create(Company::empty_fields()).await?;
        let snapshot = context.snapshot();
        acquisition.adopt(context)?;
        tracing::info!(id = %snapshot.id, "created empty company record");
        Ok(self.company(&snapshot))
    }
}

#[async_trait]
impl NamedEntityResource for MemoryResources {
    async fn by_name(&self, name: &str) -> Result<Option<NamedEntity>, ResourceError> {
        Ok(self.names.get(name).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl CompanySubmitResource for MemoryResources {
    async fn submit(&self, data: SubmitFormData) -> Result<(), ResourceError> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(ResourceError::Rejected("submission service unavailable".to_string()));
        }
        tracing::info!(name = %data.name, homepage = %data.homepage, "company submitted");
        self.submissions.lock().push(data);
        Ok(())
    }
}

#[async_trait]
impl UploadedImageResource for MemoryResources {
    async fn update_company_logo(&self, id: &RecordId, file: LogoFile) -> Result<String, ResourceError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(ResourceError::Rejected("upload service unavailable".to_string()));
        }
        if self.backend.record(id).is_none() {
            return Err(ResourceError::NotFound(id.to_string()));
        }
        let url = format!("/uploads/{}/{}", id, file.file_name);
        self.logos.lock().push((id.clone(), file));
        Ok(url)
    }
}
