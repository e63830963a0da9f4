use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};

use super::documents::{FilePayload, UploadRequest, MAX_UPLOAD_BYTES};
use super::domain::{ApplicationId, Document, DocumentId, LoanApplication, UserId};
use super::repository::{
    ApplicationRepository, DocumentRepository, NotificationGateway, ObjectStore, RepositoryError,
    SessionAuthenticator,
};
use super::service::{OriginationError, OriginationService};

/// Borrower resolved by the session middleware; present on every request that
/// reaches a handler.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub UserId);

/// Router builder exposing the application and document endpoints. Every
/// route sits behind the session middleware; unauthenticated calls are
/// rejected before any business logic runs.
pub fn origination_router<R, D, O, N>(
    service: Arc<OriginationService<R, D, O, N>>,
    sessions: Arc<dyn SessionAuthenticator>,
) -> Router
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    Router::new()
        .route(
            "/api/applications",
            post(create_application::<R, D, O, N>).get(list_applications::<R, D, O, N>),
        )
        .route(
            "/api/applications/:application_id",
            get(get_application::<R, D, O, N>)
                .patch(update_application::<R, D, O, N>)
                .delete(delete_application::<R, D, O, N>),
        )
        .route(
            "/api/applications/:application_id/documents",
            post(upload_document::<R, D, O, N>).get(list_documents::<R, D, O, N>),
        )
        .route(
            "/api/applications/:application_id/documents/:document_id",
            delete(delete_document::<R, D, O, N>),
        )
        .layer(middleware::from_fn_with_state(sessions, require_session))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .with_state(service)
}

pub(crate) async fn require_session(
    State(sessions): State<Arc<dyn SessionAuthenticator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| sessions.authenticate(token));

    match user {
        Some(user) => {
            request.extensions_mut().insert(CallerIdentity(user));
            next.run(request).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "authentication required" })),
        )
            .into_response(),
    }
}

async fn create_application<R, D, O, N>(
    State(service): State<Arc<OriginationService<R, D, O, N>>>,
    Extension(CallerIdentity(user)): Extension<CallerIdentity>,
    Json(payload): Json<Value>,
) -> Result<Json<LoanApplication>, OriginationError>
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    service.create(&user, payload).map(Json)
}

async fn list_applications<R, D, O, N>(
    State(service): State<Arc<OriginationService<R, D, O, N>>>,
    Extension(CallerIdentity(user)): Extension<CallerIdentity>,
) -> Result<Json<Vec<LoanApplication>>, OriginationError>
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    service.list(&user).map(Json)
}

async fn get_application<R, D, O, N>(
    State(service): State<Arc<OriginationService<R, D, O, N>>>,
    Extension(CallerIdentity(user)): Extension<CallerIdentity>,
    Path(application_id): Path<String>,
) -> Result<Json<LoanApplication>, OriginationError>
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    service
        .get(&user, &ApplicationId(application_id))
        .map(Json)
}

async fn update_application<R, D, O, N>(
    State(service): State<Arc<OriginationService<R, D, O, N>>>,
    Extension(CallerIdentity(user)): Extension<CallerIdentity>,
    Path(application_id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<LoanApplication>, OriginationError>
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    service
        .update(&user, &ApplicationId(application_id), payload)
        .map(Json)
}

async fn delete_application<R, D, O, N>(
    State(service): State<Arc<OriginationService<R, D, O, N>>>,
    Extension(CallerIdentity(user)): Extension<CallerIdentity>,
    Path(application_id): Path<String>,
) -> Result<Json<Value>, OriginationError>
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    service.delete(&user, &ApplicationId(application_id))?;
    Ok(Json(json!({ "message": "application deleted" })))
}

async fn upload_document<R, D, O, N>(
    State(service): State<Arc<OriginationService<R, D, O, N>>>,
    Extension(CallerIdentity(user)): Extension<CallerIdentity>,
    Path(application_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Document>, OriginationError>
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    let mut doc_type = None;
    let mut name = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| OriginationError::InvalidPayload(err.to_string()))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("type") => {
                doc_type = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| OriginationError::InvalidPayload(err.to_string()))?,
                );
            }
            Some("name") => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| OriginationError::InvalidPayload(err.to_string()))?,
                );
            }
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| OriginationError::InvalidPayload(err.to_string()))?
                    .to_vec();
                file = Some(FilePayload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let doc_type = doc_type.ok_or_else(|| {
        OriginationError::InvalidPayload("multipart field `type` is required".to_string())
    })?;

    service
        .upload_document(
            &user,
            &ApplicationId(application_id),
            UploadRequest {
                doc_type,
                name,
                file,
            },
        )
        .map(Json)
}

async fn list_documents<R, D, O, N>(
    State(service): State<Arc<OriginationService<R, D, O, N>>>,
    Extension(CallerIdentity(user)): Extension<CallerIdentity>,
    Path(application_id): Path<String>,
) -> Result<Json<Vec<Document>>, OriginationError>
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    service
        .list_documents(&user, &ApplicationId(application_id))
        .map(Json)
}

async fn delete_document<R, D, O, N>(
    State(service): State<Arc<OriginationService<R, D, O, N>>>,
    Extension(CallerIdentity(user)): Extension<CallerIdentity>,
    Path((application_id, document_id)): Path<(String, String)>,
) -> Result<Json<Value>, OriginationError>
where
    R: ApplicationRepository + 'static,
    D: DocumentRepository + 'static,
    O: ObjectStore + 'static,
    N: NotificationGateway + 'static,
{
    service.delete_document(
        &user,
        &ApplicationId(application_id),
        &DocumentId(document_id),
    )?;
    Ok(Json(json!({ "message": "document deleted" })))
}

impl IntoResponse for OriginationError {
    fn into_response(self) -> Response {
        let status = match &self {
            OriginationError::ProtectedField(_)
            | OriginationError::InvalidPayload(_)
            | OriginationError::NotADraft
            | OriginationError::StatusRegression { .. }
            | OriginationError::MissingDocumentSource => StatusCode::BAD_REQUEST,
            OriginationError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            OriginationError::ApplicationNotFound | OriginationError::DocumentNotFound => {
                StatusCode::NOT_FOUND
            }
            OriginationError::Forbidden => StatusCode::FORBIDDEN,
            OriginationError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            OriginationError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            OriginationError::Repository(_) | OriginationError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            OriginationError::Notification(_) => StatusCode::BAD_GATEWAY,
        };

        let body = match &self {
            OriginationError::ProtectedField(field) => {
                json!({ "error": self.to_string(), "field": field })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
