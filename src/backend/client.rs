//! Request-scoped backend client.

use super::{BackendError, SharedBackend};
use crate::{
    error::ApiError,
    middleware::SessionContext,
    models::{
        CurrentUser, EntryFilter, KbEntry, KbEntryPatch, KbNote, NewKbEntry, NewKbNote,
    },
};
use actix_web::{HttpMessage, HttpRequest, web};
use uuid::Uuid;

/// Backend handle bound to the caller's session
///
/// Every data call forwards the caller's access token so that the backend's
/// row policies see the same identity the session middleware resolved.
pub struct RequestClient {
    backend: SharedBackend,
    session: SessionContext,
}

impl RequestClient {
    pub fn new(backend: SharedBackend, session: SessionContext) -> Self {
        Self { backend, session }
    }

    /// Build a client from app data and the session attached by the middleware
    pub fn from_request(req: &HttpRequest) -> Result<Self, ApiError> {
        let backend = req
            .app_data::<web::Data<SharedBackend>>()
            .map(|data| data.get_ref().clone())
            .ok_or_else(|| ApiError::Configuration("backend is not configured".to_string()))?;
        let session = req
            .extensions()
            .get::<SessionContext>()
            .cloned()
            .unwrap_or_default();
        Ok(Self::new(backend, session))
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.session.user.as_ref()
    }

    /// The signed-in caller, or `401 UNAUTHENTICATED`
    pub fn require_user(&self) -> Result<&CurrentUser, ApiError> {
        self.user().ok_or_else(ApiError::unauthenticated)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.access_token.as_deref()
    }

    pub async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<KbEntry>, BackendError> {
        self.backend.list_entries(self.access_token(), filter).await
    }

    pub async fn get_entry(&self, id: Uuid) -> Result<Option<KbEntry>, BackendError> {
        self.backend.get_entry(self.access_token(), id).await
    }

    pub async fn insert_entry(&self, entry: &NewKbEntry) -> Result<KbEntry, BackendError> {
        self.backend.insert_entry(self.access_token(), entry).await
    }

    pub async fn update_entry(
        &self,
        id: Uuid,
        patch: &KbEntryPatch,
    ) -> Result<Option<KbEntry>, BackendError> {
        self.backend.update_entry(self.access_token(), id, patch).await
    }

    pub async fn delete_entry(&self, id: Uuid) -> Result<bool, BackendError> {
        self.backend.delete_entry(self.access_token(), id).await
    }

    pub async fn list_notes(&self, entry_id: Uuid) -> Result<Vec<KbNote>, BackendError> {
        self.backend.list_notes(self.access_token(), entry_id).await
    }

    pub async fn insert_note(&self, note: &NewKbNote) -> Result<KbNote, BackendError> {
        self.backend.insert_note(self.access_token(), note).await
    }

    pub async fn delete_note(&self, id: Uuid) -> Result<bool, BackendError> {
        self.backend.delete_note(self.access_token(), id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::MemoryBackend, models::Role};
    use actix_web::test::TestRequest;
    use std::sync::Arc;

    #[test]
    fn test_missing_backend_is_configuration_error() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(
            RequestClient::from_request(&req),
            Err(ApiError::Configuration(_))
        ));
    }

    #[test]
    fn test_anonymous_without_session() {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let req = TestRequest::default()
            .app_data(web::Data::new(backend))
            .to_http_request();
        let client = RequestClient::from_request(&req).unwrap();
        assert!(client.user().is_none());
        assert!(matches!(client.require_user(), Err(ApiError::Unauthorized { .. })));
    }

    #[test]
    fn test_session_from_extensions() {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let req = TestRequest::default()
            .app_data(web::Data::new(backend))
            .to_http_request();
        let user = CurrentUser {
            id: Uuid::new_v4(),
            email: None,
            role: Role::Admin,
        };
        req.extensions_mut().insert(SessionContext {
            user: Some(user.clone()),
            access_token: Some("token".to_string()),
        });

        let client = RequestClient::from_request(&req).unwrap();
        assert_eq!(client.require_user().unwrap(), &user);
        assert_eq!(client.access_token(), Some("token"));
    }
}
