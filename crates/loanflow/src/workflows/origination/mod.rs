//! The commercial loan application wizard: a seven-step intake flow with
//! incremental draft persistence, conditional field validation, derived
//! underwriting metrics, document attachments, and a one-shot submission
//! notification.

pub mod documents;
pub mod domain;
pub mod drafts;
pub mod metrics;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use documents::{
    DocumentError, DocumentSlots, DocumentStore, FilePayload, SlotState, UploadRequest,
    MAX_UPLOAD_BYTES,
};
pub use domain::{
    ApplicationDraft, ApplicationId, ApplicationStatus, BorrowerType, Document, DocumentId,
    DocumentStatus, DownPaymentSource, LoanApplication, LoanSpecifics, LoanType, PropertyType,
    TenantSummary, UserId, WizardStep,
};
pub use drafts::{
    AutoSaveTimer, DraftCoordinator, DraftStore, DraftStoreError, WizardSession,
    AUTO_SAVE_DEBOUNCE,
};
pub use metrics::{compute_metrics, monthly_payment, LoanMetrics};
pub use repository::{
    ApplicationRepository, ApplicationSummaryView, DocumentRepository, NotificationAttachment,
    NotificationGateway, NotifyError, ObjectStore, RepositoryError, SessionAuthenticator,
    StorageError, SubmissionNotice,
};
pub use router::{origination_router, CallerIdentity};
pub use service::{OriginationError, OriginationService};
pub use validation::{
    all_step_validations, is_income_producing, requirements, step_validation, FieldRequirement,
    RequirementCondition, StepValidation,
};
pub use wizard::{StepStatus, WizardError, WizardState};
