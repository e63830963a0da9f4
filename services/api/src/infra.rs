use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use loanflow::config::{EmailConfig, StorageConfig};
use loanflow::workflows::origination::{
    ApplicationId, ApplicationRepository, Document, DocumentId, DocumentRepository,
    LoanApplication, NotificationGateway, NotifyError, ObjectStore, RepositoryError,
    SessionAuthenticator, StorageError, SubmissionNotice, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, LoanApplication>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentRepository {
    records: Arc<Mutex<HashMap<DocumentId, Document>>>,
}

impl DocumentRepository for InMemoryDocumentRepository {
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

/// Blob store rooted in the configured private directory, one subdirectory
/// per bucket. Plays the part of the external object-storage service.
#[derive(Debug, Clone)]
pub(crate) struct DiskObjectStore {
    root: PathBuf,
}

impl DiskObjectStore {
    pub(crate) fn new(config: &StorageConfig) -> Self {
        let root = PathBuf::from(&config.private_dir).join(&config.bucket_id);
        DiskObjectStore { root }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl ObjectStore for DiskObjectStore {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| StorageError::Backend(err.to_string()))?;
        }
        fs::write(&target, bytes).map_err(|err| StorageError::Backend(err.to_string()))
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(path);
        match fs::read(&target) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::Missing(path.to_string()))
            }
            Err(err) => Err(StorageError::Backend(err.to_string())),
        }
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path);
        match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::Missing(path.to_string()))
            }
            Err(err) => Err(StorageError::Backend(err.to_string())),
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryObjectStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
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
        self.blobs
            .lock()
            .expect("object mutex poisoned")
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::Missing(path.to_string()))
    }
}

/// Transactional-email stand-in: records every dispatch and logs a summary
/// with the configured sender and recipient.
#[derive(Clone)]
pub(crate) struct EmailNotificationGateway {
    email: EmailConfig,
    sent: Arc<Mutex<Vec<SubmissionNotice>>>,
}

impl EmailNotificationGateway {
    pub(crate) fn new(email: EmailConfig) -> Self {
        EmailNotificationGateway {
            email,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn sent(&self) -> Vec<SubmissionNotice> {
        self.sent.lock().expect("notice mutex poisoned").clone()
    }
}

impl NotificationGateway for EmailNotificationGateway {
    fn send(&self, notice: SubmissionNotice) -> Result<(), NotifyError> {
        if self.email.api_key.is_none() {
            info!("no outbound e-mail API key configured; recording dispatch locally");
        }
        info!(
            application = %notice.application.id.0,
            from = %self.email.sender,
            to = %self.email.recipient,
            attachments = notice.attachments.len(),
            "submission e-mail dispatched"
        );
        self.sent
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

/// Identity-provider stand-in mapping bearer tokens to borrowers. Token
/// pairs come from the `SESSION_TOKENS` environment variable as
/// `token:user[,token:user...]`.
#[derive(Default, Clone)]
pub(crate) struct StaticTokenSessions {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenSessions {
    pub(crate) fn from_env() -> Self {
        let raw = std::env::var("SESSION_TOKENS").unwrap_or_default();
        let tokens = raw
            .split(',')
            .filter_map(|pair| {
                let (token, user) = pair.split_once(':')?;
                let token = token.trim();
                let user = user.trim();
                if token.is_empty() || user.is_empty() {
                    return None;
                }
                Some((token.to_string(), UserId(user.to_string())))
            })
            .collect();
        StaticTokenSessions { tokens }
    }

    #[cfg(test)]
    pub(crate) fn with_token(token: &str, user: &str) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(token.to_string(), UserId(user.to_string()));
        StaticTokenSessions { tokens }
    }
}

impl SessionAuthenticator for StaticTokenSessions {
    fn authenticate(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).cloned()
    }
}
