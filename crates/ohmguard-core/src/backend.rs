// ── REST backend seam ──
//
// Everything the session needs from the REST API, in domain types.
// `ApiClient` is the production implementation; tests substitute a fake.

use async_trait::async_trait;
use ohmguard_api::ApiClient;
use ohmguard_api::models::{EventQuery, EventUpdateRequest};
use secrecy::SecretString;

use crate::convert::alerts_from_page;
use crate::error::CoreError;
use crate::model::{Alert, AlertPatch, AlertQuery, User};

#[async_trait]
pub trait AlertBackend: Send + Sync {
    /// Exchange credentials for tokens (kept by the backend).
    async fn login(&self, email: &str, password: &SecretString) -> Result<(), CoreError>;

    /// Forget stored tokens.
    async fn logout(&self) -> Result<(), CoreError>;

    /// Whether tokens are available for a silent resume.
    async fn has_credentials(&self) -> bool;

    /// Current bearer token, for authenticating the live stream.
    async fn access_token(&self) -> Option<SecretString>;

    async fn current_user(&self) -> Result<User, CoreError>;

    async fn list_alerts(&self, query: &AlertQuery) -> Result<Vec<Alert>, CoreError>;

    async fn get_alert(&self, id: &str) -> Result<Alert, CoreError>;

    /// PATCH and return the server's resulting entity.
    async fn update_alert(&self, id: &str, patch: &AlertPatch) -> Result<Alert, CoreError>;
}

#[async_trait]
impl AlertBackend for ApiClient {
    async fn login(&self, email: &str, password: &SecretString) -> Result<(), CoreError> {
        Ok(ApiClient::login(self, email, password).await?)
    }

    async fn logout(&self) -> Result<(), CoreError> {
        Ok(ApiClient::logout(self).await?)
    }

    async fn has_credentials(&self) -> bool {
        self.has_tokens().await
    }

    async fn access_token(&self) -> Option<SecretString> {
        ApiClient::access_token(self).await
    }

    async fn current_user(&self) -> Result<User, CoreError> {
        Ok(self.me().await?.into())
    }

    async fn list_alerts(&self, query: &AlertQuery) -> Result<Vec<Alert>, CoreError> {
        let page = self.list_events(&EventQuery::from(query)).await?;
        Ok(alerts_from_page(page))
    }

    async fn get_alert(&self, id: &str) -> Result<Alert, CoreError> {
        let event = self.get_event(id).await.map_err(|e| not_found_as(e, id))?;
        Alert::try_from(event)
    }

    async fn update_alert(&self, id: &str, patch: &AlertPatch) -> Result<Alert, CoreError> {
        let event = self
            .update_event(id, &EventUpdateRequest::from(patch))
            .await
            .map_err(|e| not_found_as(e, id))?;
        Alert::try_from(event)
    }
}

fn not_found_as(err: ohmguard_api::Error, id: &str) -> CoreError {
    if err.is_not_found() {
        CoreError::AlertNotFound { id: id.to_owned() }
    } else {
        err.into()
    }
}
