use serde::Serialize;

use super::domain::{ApplicationId, Document, DocumentId, LoanApplication, UserId};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for loan application rows so the service module can be
/// exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: LoanApplication) -> Result<LoanApplication, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError>;
    /// All applications owned by the user, newest `updatedAt` first.
    fn list_for_user(&self, user: &UserId) -> Result<Vec<LoanApplication>, RepositoryError>;
    /// Swap in the new row and hand back the one it replaced, so callers can
    /// base one-shot transition decisions on the atomically removed value.
    fn replace(&self, record: LoanApplication) -> Result<LoanApplication, RepositoryError>;
    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError>;
}

/// Storage abstraction for document metadata rows.
pub trait DocumentRepository: Send + Sync {
    fn insert(&self, record: Document) -> Result<Document, RepositoryError>;
    fn fetch(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError>;
    /// All documents of one application, newest `createdAt` first.
    fn list_for_application(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<Document>, RepositoryError>;
    fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError>;
    fn delete_for_application(&self, application: &ApplicationId) -> Result<(), RepositoryError>;
}

/// Error enumeration for the binary object store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage failure: {0}")]
    Backend(String),
    #[error("object not found at `{0}`")]
    Missing(String),
}

/// Blob-store seam for uploaded file bytes.
pub trait ObjectStore: Send + Sync {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// One file attached to the submission notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationAttachment {
    pub file_name: String,
    pub file_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Payload dispatched exactly once when an application leaves draft status.
/// Carries the stored row (including the freshly computed metrics) and every
/// uploaded document's bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionNotice {
    pub application: LoanApplication,
    pub attachments: Vec<NotificationAttachment>,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("unable to read attachment `{name}`: {source}")]
    Attachment {
        name: String,
        #[source]
        source: StorageError,
    },
}

/// Outbound-notification seam (e.g. a transactional e-mail adapter).
pub trait NotificationGateway: Send + Sync {
    fn send(&self, notice: SubmissionNotice) -> Result<(), NotifyError>;
}

/// Identity-provider seam: resolves a bearer token to the owning borrower.
pub trait SessionAuthenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Option<UserId>;
}

/// Sanitized application summary for list views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummaryView {
    pub id: ApplicationId,
    pub status: &'static str,
    pub current_step: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dscr: Option<String>,
}

impl LoanApplication {
    pub fn summary_view(&self) -> ApplicationSummaryView {
        ApplicationSummaryView {
            id: self.id.clone(),
            status: self.status.label(),
            current_step: self.current_step.label(),
            property_name: self.property_name.clone(),
            loan_amount: self.loan_amount.clone(),
            ltv: self.ltv.clone(),
            dscr: self.dscr.clone(),
        }
    }
}
