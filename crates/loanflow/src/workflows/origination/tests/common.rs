use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::workflows::origination::documents::{
    DocumentError, DocumentStore, UploadRequest,
};
use crate::workflows::origination::domain::{
    ApplicationDraft, ApplicationId, BorrowerType, Document, DocumentId, DocumentStatus,
    DownPaymentSource, LoanApplication, LoanSpecifics, LoanType, PropertyType, UserId,
};
use crate::workflows::origination::drafts::{DraftStore, DraftStoreError};
use crate::workflows::origination::metrics::compute_metrics;
use crate::workflows::origination::repository::{
    ApplicationRepository, DocumentRepository, NotificationGateway, NotifyError, ObjectStore,
    RepositoryError, SessionAuthenticator, StorageError, SubmissionNotice,
};
use crate::workflows::origination::service::{OriginationError, OriginationService};

pub(super) fn borrower() -> UserId {
    UserId("user-1".to_string())
}

pub(super) fn other_borrower() -> UserId {
    UserId("user-2".to_string())
}

pub(super) fn quick_start_draft() -> ApplicationDraft {
    ApplicationDraft {
        loan_type: Some(LoanType::PermanentAcquisition),
        loan_amount: Some("3000000".to_string()),
        property_city: Some("Des Moines".to_string()),
        property_state: Some("IA".to_string()),
        ..ApplicationDraft::default()
    }
}

pub(super) fn permanent_specifics() -> LoanSpecifics {
    LoanSpecifics {
        property_value: Some("4000000".to_string()),
        interest_rate: Some("5.5".to_string()),
        rate_type: Some("fixed".to_string()),
        loan_term: Some("10".to_string()),
        amortization: Some("30".to_string()),
        prepayment_penalty: Some("stepdown".to_string()),
        recourse: Some("non-recourse".to_string()),
        annual_gross_income: Some("720000".to_string()),
        annual_operating_expenses: Some("270000".to_string()),
        ..LoanSpecifics::default()
    }
}

pub(super) fn full_draft() -> ApplicationDraft {
    ApplicationDraft {
        property_name: Some("Riverfront Lofts".to_string()),
        property_address: Some("401 Court Ave".to_string()),
        property_type: Some(PropertyType::Multifamily),
        square_footage: Some("42000".to_string()),
        units: Some("48".to_string()),
        year_built: Some("1998".to_string()),
        occupancy: Some("92.5".to_string()),
        entity_name: Some("Riverfront Holdings LLC".to_string()),
        borrower_type: Some(BorrowerType::Llc),
        contact_email: Some("owner@riverfront.example".to_string()),
        contact_phone: Some("515-555-0188".to_string()),
        loan_specifics: Some(permanent_specifics()),
        net_worth: Some("8500000".to_string()),
        liquid_assets: Some("1200000".to_string()),
        down_payment_source: Some(DownPaymentSource::Cash),
        annual_noi: Some("450000".to_string()),
        ..quick_start_draft()
    }
}

#[derive(Default)]
pub(super) struct MemoryApplications {
    records: Mutex<HashMap<ApplicationId, LoanApplication>>,
}

impl ApplicationRepository for MemoryApplications {
    fn insert(&self, record: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_for_user(&self, user: &UserId) -> Result<Vec<LoanApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<LoanApplication> = guard
            .values()
            .filter(|record| record.user_id == *user)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    fn replace(&self, record: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.insert(record.id.clone(), record) {
            Some(previous) => Ok(previous),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default)]
pub(super) struct MemoryDocuments {
    records: Mutex<HashMap<DocumentId, Document>>,
}

impl DocumentRepository for MemoryDocuments {
    fn insert(&self, record: Document) -> Result<Document, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_for_application(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<Document>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<Document> = guard
            .values()
            .filter(|record| record.application_id == *application)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn delete_for_application(&self, application: &ApplicationId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.retain(|_, record| record.application_id != *application);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryObjects {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_deletes: AtomicBool,
    pub fail_puts: AtomicBool,
}

impl MemoryObjects {
    pub(super) fn contains(&self, path: &str) -> bool {
        self.blobs
            .lock()
            .expect("object mutex poisoned")
            .contains_key(path)
    }

    pub(super) fn len(&self) -> usize {
        self.blobs.lock().expect("object mutex poisoned").len()
    }
}

impl ObjectStore for MemoryObjects {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_puts.load(Ordering::Relaxed) {
            return Err(StorageError::Backend("storage write refused".to_string()));
        }
        self.blobs
            .lock()
            .expect("object mutex poisoned")
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .lock()
            .expect("object mutex poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::Missing(path.to_string()))
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        if self.fail_deletes.load(Ordering::Relaxed) {
            return Err(StorageError::Backend("storage delete refused".to_string()));
        }
        self.blobs
            .lock()
            .expect("object mutex poisoned")
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::Missing(path.to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifications {
    notices: Mutex<Vec<SubmissionNotice>>,
    pub fail: AtomicBool,
}

impl RecordingNotifications {
    pub(super) fn notices(&self) -> Vec<SubmissionNotice> {
        self.notices.lock().expect("notice mutex poisoned").clone()
    }
}

impl NotificationGateway for RecordingNotifications {
    fn send(&self, notice: SubmissionNotice) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(NotifyError::Transport("email provider down".to_string()));
        }
        self.notices
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) type TestService =
    OriginationService<MemoryApplications, MemoryDocuments, MemoryObjects, RecordingNotifications>;

pub(super) struct Harness {
    pub service: Arc<TestService>,
    pub documents: Arc<MemoryDocuments>,
    pub objects: Arc<MemoryObjects>,
    pub notifications: Arc<RecordingNotifications>,
}

pub(super) fn harness() -> Harness {
    let applications = Arc::new(MemoryApplications::default());
    let documents = Arc::new(MemoryDocuments::default());
    let objects = Arc::new(MemoryObjects::default());
    let notifications = Arc::new(RecordingNotifications::default());
    let service = Arc::new(OriginationService::new(
        applications,
        documents.clone(),
        objects.clone(),
        notifications.clone(),
    ));
    Harness {
        service,
        documents,
        objects,
        notifications,
    }
}

/// Drives the client-side coordinator and slot tracker straight against the
/// service, standing in for the HTTP transport.
pub(super) struct ServiceStore {
    pub service: Arc<TestService>,
    pub user: UserId,
}

fn draft_store_error(err: OriginationError) -> DraftStoreError {
    match err {
        OriginationError::Repository(_)
        | OriginationError::Storage(_)
        | OriginationError::Notification(_) => DraftStoreError::Unavailable(err.to_string()),
        other => DraftStoreError::Rejected(other.to_string()),
    }
}

impl DraftStore for ServiceStore {
    fn create(&self, draft: &ApplicationDraft) -> Result<LoanApplication, DraftStoreError> {
        let payload = serde_json::to_value(draft)
            .map_err(|err| DraftStoreError::Rejected(err.to_string()))?;
        self.service
            .create(&self.user, payload)
            .map_err(draft_store_error)
    }

    fn update(
        &self,
        id: &ApplicationId,
        draft: &ApplicationDraft,
    ) -> Result<LoanApplication, DraftStoreError> {
        let payload = serde_json::to_value(draft)
            .map_err(|err| DraftStoreError::Rejected(err.to_string()))?;
        self.service
            .update(&self.user, id, payload)
            .map_err(draft_store_error)
    }
}

impl DocumentStore for ServiceStore {
    fn upload(
        &self,
        application: &ApplicationId,
        request: UploadRequest,
    ) -> Result<Document, DocumentError> {
        self.service
            .upload_document(&self.user, application, request)
            .map_err(|err| match err {
                OriginationError::Repository(_) | OriginationError::Storage(_) => {
                    DocumentError::Unavailable(err.to_string())
                }
                other => DocumentError::Rejected(other.to_string()),
            })
    }

    fn remove(
        &self,
        application: &ApplicationId,
        document: &DocumentId,
    ) -> Result<(), DocumentError> {
        self.service
            .delete_document(&self.user, application, document)
            .map_err(|err| DocumentError::Unavailable(err.to_string()))
    }
}

/// Minimal store for coordinator tests: records every payload it was asked to
/// persist and fails on demand.
#[derive(Default)]
pub(super) struct FakeDraftStore {
    pub saves: Mutex<Vec<ApplicationDraft>>,
    pub fail: AtomicBool,
    counter: AtomicU64,
}

impl FakeDraftStore {
    pub(super) fn save_count(&self) -> usize {
        self.saves.lock().expect("saves mutex poisoned").len()
    }

    pub(super) fn last_save(&self) -> Option<ApplicationDraft> {
        self.saves
            .lock()
            .expect("saves mutex poisoned")
            .last()
            .cloned()
    }
}

impl DraftStore for FakeDraftStore {
    fn create(&self, draft: &ApplicationDraft) -> Result<LoanApplication, DraftStoreError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(DraftStoreError::Unavailable("store offline".to_string()));
        }
        self.saves
            .lock()
            .expect("saves mutex poisoned")
            .push(draft.clone());
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(LoanApplication::from_draft(
            ApplicationId(format!("fake-{id:03}")),
            borrower(),
            draft.clone(),
            compute_metrics(draft),
            Utc::now(),
        ))
    }

    fn update(
        &self,
        id: &ApplicationId,
        draft: &ApplicationDraft,
    ) -> Result<LoanApplication, DraftStoreError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(DraftStoreError::Unavailable("store offline".to_string()));
        }
        self.saves
            .lock()
            .expect("saves mutex poisoned")
            .push(draft.clone());
        Ok(LoanApplication::from_draft(
            id.clone(),
            borrower(),
            draft.clone(),
            compute_metrics(draft),
            Utc::now(),
        ))
    }
}

/// Minimal document store for slot-tracker tests.
#[derive(Default)]
pub(super) struct FakeDocumentStore {
    pub uploads: Mutex<Vec<UploadRequest>>,
    pub fail_uploads: AtomicBool,
    counter: AtomicU64,
}

impl FakeDocumentStore {
    pub(super) fn upload_count(&self) -> usize {
        self.uploads.lock().expect("uploads mutex poisoned").len()
    }
}

impl DocumentStore for FakeDocumentStore {
    fn upload(
        &self,
        application: &ApplicationId,
        request: UploadRequest,
    ) -> Result<Document, DocumentError> {
        if self.fail_uploads.load(Ordering::Relaxed) {
            return Err(DocumentError::Unavailable(
                "upload transport down".to_string(),
            ));
        }
        let has_file = request.file.is_some();
        let name = request
            .name
            .clone()
            .or_else(|| request.file.as_ref().map(|file| file.filename.clone()))
            .unwrap_or_else(|| "unnamed".to_string());
        self.uploads
            .lock()
            .expect("uploads mutex poisoned")
            .push(request.clone());
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        Ok(Document {
            id: DocumentId(format!("fake-doc-{id:03}")),
            application_id: application.clone(),
            user_id: borrower(),
            name,
            doc_type: request.doc_type,
            file_type: None,
            file_size: None,
            status: if has_file {
                DocumentStatus::Uploaded
            } else {
                DocumentStatus::Pending
            },
            storage_path: has_file.then(|| format!("{}/fake", application.0)),
            uploaded_at: has_file.then_some(now),
            created_at: now,
        })
    }

    fn remove(
        &self,
        _application: &ApplicationId,
        _document: &DocumentId,
    ) -> Result<(), DocumentError> {
        Ok(())
    }
}

/// Single-token identity stand-in for router tests.
pub(super) struct StaticSessions;

impl SessionAuthenticator for StaticSessions {
    fn authenticate(&self, token: &str) -> Option<UserId> {
        match token {
            "token-1" => Some(borrower()),
            "token-2" => Some(other_borrower()),
            _ => None,
        }
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}
