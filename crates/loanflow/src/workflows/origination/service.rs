use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use super::documents::{FilePayload, UploadRequest, MAX_UPLOAD_BYTES};
use super::domain::{
    ApplicationDraft, ApplicationId, ApplicationStatus, Document, DocumentId, DocumentStatus,
    LoanApplication, UserId,
};
use super::metrics::compute_metrics;
use super::repository::{
    ApplicationRepository, DocumentRepository, NotificationAttachment, NotificationGateway,
    NotifyError, ObjectStore, RepositoryError, StorageError, SubmissionNotice,
};

/// Fields only the server may set; their presence in any payload is rejected
/// with the offending field name before anything is persisted.
const PROTECTED_FIELDS: &[&str] = &["id", "userId", "createdAt", "updatedAt"];

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("loan-{id:06}"))
}

fn next_document_id() -> DocumentId {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DocumentId(format!("doc-{id:06}"))
}

/// Error raised by the origination service.
#[derive(Debug, thiserror::Error)]
pub enum OriginationError {
    #[error("field `{0}` cannot be set by the client")]
    ProtectedField(&'static str),
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),
    #[error("new applications must start in draft status")]
    NotADraft,
    #[error("status cannot move from {from} back to {to}")]
    StatusRegression {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("application not found")]
    ApplicationNotFound,
    #[error("document not found")]
    DocumentNotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("a document name or file is required")]
    MissingDocumentSource,
    #[error("file of {size} bytes exceeds the {limit} byte upload limit", limit = MAX_UPLOAD_BYTES)]
    FileTooLarge { size: usize },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("submission saved but notification dispatch failed: {0}")]
    Notification(#[from] NotifyError),
}

/// Service composing the application store, document store, blob storage, and
/// the outbound submission notification. Metrics are recomputed here on every
/// write; nothing client-sent survives for the calculated fields.
pub struct OriginationService<R, D, O, N> {
    applications: Arc<R>,
    documents: Arc<D>,
    objects: Arc<O>,
    notifications: Arc<N>,
}

impl<R, D, O, N> OriginationService<R, D, O, N>
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    pub fn new(
        applications: Arc<R>,
        documents: Arc<D>,
        objects: Arc<O>,
        notifications: Arc<N>,
    ) -> Self {
        Self {
            applications,
            documents,
            objects,
            notifications,
        }
    }

    fn parse_draft(payload: Value) -> Result<ApplicationDraft, OriginationError> {
        if let Value::Object(map) = &payload {
            for field in PROTECTED_FIELDS.iter().copied() {
                if map.contains_key(field) {
                    return Err(OriginationError::ProtectedField(field));
                }
            }
        }
        serde_json::from_value(payload)
            .map_err(|err| OriginationError::InvalidPayload(err.to_string()))
    }

    /// Create a draft for the authenticated borrower. `userId` comes from the
    /// session, never from the payload.
    pub fn create(
        &self,
        user: &UserId,
        payload: Value,
    ) -> Result<LoanApplication, OriginationError> {
        let draft = Self::parse_draft(payload)?.sanitized();
        if draft
            .status
            .map_or(false, |status| status != ApplicationStatus::Draft)
        {
            return Err(OriginationError::NotADraft);
        }

        let metrics = compute_metrics(&draft);
        let record = LoanApplication::from_draft(
            next_application_id(),
            user.clone(),
            draft,
            metrics,
            Utc::now(),
        );
        let stored = self.applications.insert(record)?;
        info!(application = %stored.id.0, "loan application draft created");
        Ok(stored)
    }

    /// Fetch one application: 404 when absent, 403 when owned by someone
    /// else.
    pub fn get(&self, user: &UserId, id: &ApplicationId) -> Result<LoanApplication, OriginationError> {
        let record = self
            .applications
            .fetch(id)?
            .ok_or(OriginationError::ApplicationNotFound)?;
        if record.user_id != *user {
            return Err(OriginationError::Forbidden);
        }
        Ok(record)
    }

    pub fn list(&self, user: &UserId) -> Result<Vec<LoanApplication>, OriginationError> {
        Ok(self.applications.list_for_user(user)?)
    }

    /// Partial update: sanitize, merge over the stored row, recompute metrics,
    /// persist. The draft-to-submitted transition additionally dispatches the
    /// submission notification at most once per application; the decision
    /// reads the row the update atomically replaced.
    pub fn update(
        &self,
        user: &UserId,
        id: &ApplicationId,
        payload: Value,
    ) -> Result<LoanApplication, OriginationError> {
        let stored = self.get(user, id)?;
        let patch = Self::parse_draft(payload)?.sanitized();

        if let Some(next) = patch.status {
            if next.rank() < stored.status.rank() {
                return Err(OriginationError::StatusRegression {
                    from: stored.status,
                    to: next,
                });
            }
        }

        let merged = stored.draft().merged(patch);
        let metrics = compute_metrics(&merged);
        let updated = stored.with_draft(merged, metrics, Utc::now());
        let previous = self.applications.replace(updated.clone())?;

        if previous.status != ApplicationStatus::Submitted
            && updated.status == ApplicationStatus::Submitted
        {
            self.dispatch_submission(&updated)?;
        }

        Ok(updated)
    }

    /// Delete an application and everything hanging off it. Blobs go first;
    /// a storage failure aborts the cascade so rows and blobs never diverge.
    pub fn delete(&self, user: &UserId, id: &ApplicationId) -> Result<(), OriginationError> {
        let application = self.get(user, id)?;
        for document in self.documents.list_for_application(&application.id)? {
            if let Some(path) = document.storage_path.as_deref() {
                self.objects.delete(path)?;
            }
        }
        self.documents.delete_for_application(&application.id)?;
        self.applications.delete(&application.id)?;
        info!(application = %application.id.0, "loan application deleted");
        Ok(())
    }

    /// Upload a document or register an "upload later" placeholder. Bytes go
    /// to the object store before the metadata row is written.
    pub fn upload_document(
        &self,
        user: &UserId,
        application_id: &ApplicationId,
        request: UploadRequest,
    ) -> Result<Document, OriginationError> {
        let application = self.get(user, application_id)?;
        let UploadRequest {
            doc_type,
            name,
            file,
        } = request;

        let name = match (name, &file) {
            (Some(name), _) if !name.trim().is_empty() => name,
            (_, Some(payload)) => payload.filename.clone(),
            _ => return Err(OriginationError::MissingDocumentSource),
        };

        if let Some(payload) = &file {
            if payload.bytes.len() > MAX_UPLOAD_BYTES {
                return Err(OriginationError::FileTooLarge {
                    size: payload.bytes.len(),
                });
            }
        }

        let id = next_document_id();
        let now = Utc::now();

        let mut storage_path = None;
        if let Some(payload) = &file {
            let path = format!("{}/{}-{}", application.id.0, id.0, payload.filename);
            self.objects.put(&path, &payload.bytes)?;
            storage_path = Some(path);
        }

        let record = Document {
            id,
            application_id: application.id.clone(),
            user_id: user.clone(),
            name,
            doc_type,
            file_type: file.as_ref().and_then(file_type_of),
            file_size: file.as_ref().map(|payload| format_file_size(payload.bytes.len())),
            status: if file.is_some() {
                DocumentStatus::Uploaded
            } else {
                DocumentStatus::Pending
            },
            storage_path,
            uploaded_at: file.is_some().then_some(now),
            created_at: now,
        };

        let stored = self.documents.insert(record)?;
        info!(
            application = %application.id.0,
            document = %stored.id.0,
            status = stored.status.label(),
            "document recorded"
        );
        Ok(stored)
    }

    pub fn list_documents(
        &self,
        user: &UserId,
        application_id: &ApplicationId,
    ) -> Result<Vec<Document>, OriginationError> {
        let application = self.get(user, application_id)?;
        Ok(self.documents.list_for_application(&application.id)?)
    }

    /// Delete one document: blob strictly before row, so a storage failure
    /// leaves the metadata row (and the retry path) intact.
    pub fn delete_document(
        &self,
        user: &UserId,
        application_id: &ApplicationId,
        document_id: &DocumentId,
    ) -> Result<(), OriginationError> {
        let application = self.get(user, application_id)?;
        let document = self
            .documents
            .fetch(document_id)?
            .ok_or(OriginationError::DocumentNotFound)?;
        if document.application_id != application.id {
            return Err(OriginationError::DocumentNotFound);
        }
        if document.user_id != *user {
            return Err(OriginationError::Forbidden);
        }

        if let Some(path) = document.storage_path.as_deref() {
            self.objects.delete(path)?;
        }
        self.documents.delete(&document.id)?;
        Ok(())
    }

    fn dispatch_submission(&self, application: &LoanApplication) -> Result<(), OriginationError> {
        let documents = self.documents.list_for_application(&application.id)?;

        let mut attachments = Vec::new();
        for document in documents
            .iter()
            .filter(|document| document.status == DocumentStatus::Uploaded)
        {
            let path = match document.storage_path.as_deref() {
                Some(path) => path,
                None => continue,
            };
            let bytes = self.objects.get(path).map_err(|source| {
                let err = NotifyError::Attachment {
                    name: document.name.clone(),
                    source,
                };
                error!(application = %application.id.0, error = %err, "submission notification failed");
                err
            })?;
            attachments.push(NotificationAttachment {
                file_name: document.name.clone(),
                file_type: document.file_type.clone(),
                bytes,
            });
        }

        let attachment_count = attachments.len();
        self.notifications
            .send(SubmissionNotice {
                application: application.clone(),
                attachments,
            })
            .map_err(|err| {
                error!(application = %application.id.0, error = %err, "submission notification failed");
                err
            })?;

        info!(
            application = %application.id.0,
            attachments = attachment_count,
            "submission notification dispatched"
        );
        Ok(())
    }
}

fn file_type_of(payload: &FilePayload) -> Option<String> {
    if let Some(content_type) = payload.content_type.as_deref() {
        if let Some((_, subtype)) = content_type.split_once('/') {
            return Some(subtype.to_string());
        }
    }
    payload
        .filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
}

fn format_file_size(bytes: usize) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}
