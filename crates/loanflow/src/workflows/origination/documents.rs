use std::collections::BTreeMap;
use std::sync::Arc;

use super::domain::{ApplicationId, Document, DocumentId, DocumentStatus};

/// Uploads larger than this are refused before any network call.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Raw file handed to an upload: original filename, optional MIME type, bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Upload-or-placeholder request for one document slot. Either an explicit
/// name or a file must be present; the filename doubles as the fallback name.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub doc_type: String,
    pub name: Option<String>,
    pub file: Option<FilePayload>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DocumentError {
    #[error("save the application draft before uploading documents")]
    DraftNotSaved,
    #[error("file of {size} bytes exceeds the {limit} byte limit", limit = MAX_UPLOAD_BYTES)]
    FileTooLarge { size: usize },
    #[error("document store rejected the request: {0}")]
    Rejected(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// API seam for document upload and removal, independent of the draft-save
/// path.
pub trait DocumentStore: Send + Sync {
    fn upload(
        &self,
        application: &ApplicationId,
        request: UploadRequest,
    ) -> Result<Document, DocumentError>;
    fn remove(
        &self,
        application: &ApplicationId,
        document: &DocumentId,
    ) -> Result<(), DocumentError>;
}

/// Client-local state of one document-type slot. `Failed` exists only here;
/// it is never persisted, and keeps the placeholder around for a retry.
#[derive(Debug, Clone)]
pub enum SlotState {
    Uploading { name: String },
    Uploaded(Document),
    Pending(Document),
    Failed { name: String, reason: String },
}

impl SlotState {
    /// Server-backed document, when one exists.
    pub fn document(&self) -> Option<&Document> {
        match self {
            SlotState::Uploaded(document) | SlotState::Pending(document) => Some(document),
            SlotState::Uploading { .. } | SlotState::Failed { .. } => None,
        }
    }
}

/// Per-document-type upload tracker with optimistic slot transitions.
#[derive(Debug)]
pub struct DocumentSlots<S> {
    store: Arc<S>,
    application: Option<ApplicationId>,
    slots: BTreeMap<String, SlotState>,
}

impl<S: DocumentStore> DocumentSlots<S> {
    pub fn new(store: Arc<S>) -> Self {
        DocumentSlots {
            store,
            application: None,
            slots: BTreeMap::new(),
        }
    }

    pub fn for_application(store: Arc<S>, application: ApplicationId) -> Self {
        DocumentSlots {
            store,
            application: Some(application),
            slots: BTreeMap::new(),
        }
    }

    /// Bind the tracker to an application once the first draft save exists.
    pub fn attach(&mut self, application: ApplicationId) {
        self.application = Some(application);
    }

    pub fn slot(&self, doc_type: &str) -> Option<&SlotState> {
        self.slots.get(doc_type)
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &SlotState)> {
        self.slots
            .iter()
            .map(|(doc_type, state)| (doc_type.as_str(), state))
    }

    /// Upload (or replace) the file for one document type. The slot is put
    /// into `Uploading` optimistically; a failure keeps it as `Failed` so the
    /// borrower can retry, and a success settles it to the stored document.
    pub fn upload(
        &mut self,
        doc_type: &str,
        name: Option<String>,
        file: FilePayload,
    ) -> Result<Document, DocumentError> {
        let application = self
            .application
            .clone()
            .ok_or(DocumentError::DraftNotSaved)?;
        if file.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(DocumentError::FileTooLarge {
                size: file.bytes.len(),
            });
        }

        let display_name = name.clone().unwrap_or_else(|| file.filename.clone());
        self.slots.insert(
            doc_type.to_string(),
            SlotState::Uploading {
                name: display_name.clone(),
            },
        );

        let request = UploadRequest {
            doc_type: doc_type.to_string(),
            name,
            file: Some(file),
        };
        match self.store.upload(&application, request) {
            Ok(document) => {
                let state = match document.status {
                    DocumentStatus::Uploaded => SlotState::Uploaded(document.clone()),
                    _ => SlotState::Pending(document.clone()),
                };
                self.slots.insert(doc_type.to_string(), state);
                Ok(document)
            }
            Err(err) => {
                self.slots.insert(
                    doc_type.to_string(),
                    SlotState::Failed {
                        name: display_name,
                        reason: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    /// Register an "upload later" placeholder without bytes.
    pub fn placeholder(
        &mut self,
        doc_type: &str,
        name: String,
    ) -> Result<Document, DocumentError> {
        let application = self
            .application
            .clone()
            .ok_or(DocumentError::DraftNotSaved)?;
        let request = UploadRequest {
            doc_type: doc_type.to_string(),
            name: Some(name),
            file: None,
        };
        let document = self.store.upload(&application, request)?;
        self.slots
            .insert(doc_type.to_string(), SlotState::Pending(document.clone()));
        Ok(document)
    }

    /// Remove the slot's document. Deletion happens only for documents that
    /// already have a server id; a failed or in-flight placeholder is simply
    /// cleared locally.
    pub fn remove(&mut self, doc_type: &str) -> Result<(), DocumentError> {
        let Some(state) = self.slots.get(doc_type) else {
            return Ok(());
        };
        match state {
            SlotState::Uploaded(document) | SlotState::Pending(document) => {
                let application = self
                    .application
                    .clone()
                    .ok_or(DocumentError::DraftNotSaved)?;
                let id = document.id.clone();
                self.store.remove(&application, &id)?;
                self.slots.remove(doc_type);
                Ok(())
            }
            SlotState::Failed { .. } => {
                self.slots.remove(doc_type);
                Ok(())
            }
            SlotState::Uploading { .. } => Ok(()),
        }
    }
}
